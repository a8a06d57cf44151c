//! Deterministic media backend for tests and fuzzing.
//!
//! Every resource lives in state shared with the engine handle, so a test
//! can keep a clone of the engine, hand the original to a coordinator, and
//! later inspect what was opened, released, seeked or finished.

use super::{MediaEngine, MediaErrorCode, MediaEvent, MediaResource, PlayRejection};
use crate::model::{DEFAULT_SPEED, VideoFile};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayPolicy {
    #[default]
    Allow,
    /// Refuses unmuted playback the way browser autoplay policies do.
    RequireMuted,
    /// Refuses every attempt with an autoplay rejection.
    Block,
    Fail,
}

#[derive(Debug)]
struct Track {
    name: String,
    position: Duration,
    duration: Option<Duration>,
    paused: bool,
    rate: f32,
    muted: bool,
    pending: VecDeque<MediaEvent>,
    released: bool,
}

#[derive(Debug, Default)]
struct ScriptState {
    tracks: Vec<Track>,
    released: Vec<String>,
    policy: PlayPolicy,
    default_duration: Option<Duration>,
    durations: HashMap<String, Option<Duration>>,
    failing: HashMap<String, MediaErrorCode>,
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedMediaEngine {
    state: Rc<RefCell<ScriptState>>,
}

impl ScriptedMediaEngine {
    /// Every file reports a one minute duration unless overridden.
    pub fn new() -> Self {
        let engine = Self::default();
        engine.state.borrow_mut().default_duration = Some(Duration::from_secs(60));
        engine
    }

    pub fn set_play_policy(&self, policy: PlayPolicy) {
        self.state.borrow_mut().policy = policy;
    }

    pub fn set_duration(&self, name: &str, duration: Option<Duration>) {
        self.state
            .borrow_mut()
            .durations
            .insert(name.to_string(), duration);
    }

    pub fn fail_file(&self, name: &str, code: MediaErrorCode) {
        self.state
            .borrow_mut()
            .failing
            .insert(name.to_string(), code);
    }

    /// Queues an end-of-media notification on the live resource for `name`.
    pub fn finish(&self, name: &str) -> bool {
        let mut state = self.state.borrow_mut();
        let Some(track) = state
            .tracks
            .iter_mut()
            .rev()
            .find(|track| !track.released && track.name == name)
        else {
            return false;
        };
        if let Some(duration) = track.duration {
            track.position = duration;
        }
        track.paused = true;
        track.pending.push_back(MediaEvent::Ended);
        true
    }

    /// Moves every playing resource forward by `elapsed` scaled by its rate.
    pub fn advance(&self, elapsed: Duration) {
        let mut state = self.state.borrow_mut();
        for track in state
            .tracks
            .iter_mut()
            .filter(|track| !track.released && !track.paused)
        {
            let next = track.position.saturating_add(elapsed.mul_f32(track.rate));
            track.position = track.duration.map_or(next, |duration| next.min(duration));
        }
    }

    /// Names in the order resources were opened.
    pub fn opened(&self) -> Vec<String> {
        self.state
            .borrow()
            .tracks
            .iter()
            .map(|track| track.name.clone())
            .collect()
    }

    /// Names in the order resources were released.
    pub fn released(&self) -> Vec<String> {
        self.state.borrow().released.clone()
    }

    pub fn live(&self) -> Vec<String> {
        self.state
            .borrow()
            .tracks
            .iter()
            .filter(|track| !track.released)
            .map(|track| track.name.clone())
            .collect()
    }

    pub fn playing(&self) -> Vec<String> {
        self.state
            .borrow()
            .tracks
            .iter()
            .filter(|track| !track.released && !track.paused)
            .map(|track| track.name.clone())
            .collect()
    }
}

impl MediaEngine for ScriptedMediaEngine {
    fn open(&mut self, file: &VideoFile) -> Box<dyn MediaResource> {
        let mut state = self.state.borrow_mut();
        let duration = state
            .durations
            .get(&file.name)
            .copied()
            .unwrap_or(state.default_duration);
        let mut pending = VecDeque::new();
        match state.failing.get(&file.name) {
            Some(code) => pending.push_back(MediaEvent::Error(*code)),
            None => {
                pending.push_back(MediaEvent::MetadataReady);
                pending.push_back(MediaEvent::CanPlayThrough);
            }
        }
        state.tracks.push(Track {
            name: file.name.clone(),
            position: Duration::ZERO,
            duration,
            paused: true,
            rate: DEFAULT_SPEED,
            muted: false,
            pending,
            released: false,
        });
        let slot = state.tracks.len() - 1;
        Box::new(ScriptedResource {
            state: Rc::clone(&self.state),
            slot,
        })
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

struct ScriptedResource {
    state: Rc<RefCell<ScriptState>>,
    slot: usize,
}

impl ScriptedResource {
    fn with_track<T>(&self, read: impl FnOnce(&Track) -> T) -> T {
        read(&self.state.borrow().tracks[self.slot])
    }

    fn with_track_mut<T>(&self, write: impl FnOnce(&mut Track) -> T) -> T {
        write(&mut self.state.borrow_mut().tracks[self.slot])
    }
}

impl MediaResource for ScriptedResource {
    fn play(&mut self) -> Result<(), PlayRejection> {
        let policy = self.state.borrow().policy;
        self.with_track_mut(|track| {
            if track.released {
                return Err(PlayRejection::Failed(String::from("resource released")));
            }
            match policy {
                PlayPolicy::Allow => {}
                PlayPolicy::RequireMuted if track.muted => {}
                PlayPolicy::RequireMuted | PlayPolicy::Block => {
                    return Err(PlayRejection::NotAllowed);
                }
                PlayPolicy::Fail => {
                    return Err(PlayRejection::Failed(String::from("scripted failure")));
                }
            }
            track.paused = false;
            Ok(())
        })
    }

    fn pause(&mut self) {
        self.with_track_mut(|track| track.paused = true);
    }

    fn is_paused(&self) -> bool {
        self.with_track(|track| track.paused)
    }

    fn seek(&mut self, position: Duration) {
        self.with_track_mut(|track| {
            track.position = track
                .duration
                .map_or(position, |duration| position.min(duration));
        });
    }

    fn position(&self) -> Duration {
        self.with_track(|track| track.position)
    }

    fn duration(&self) -> Option<Duration> {
        self.with_track(|track| track.duration)
    }

    fn dimensions(&self) -> Option<(u32, u32)> {
        Some((1920, 1080))
    }

    fn set_rate(&mut self, rate: f32) {
        self.with_track_mut(|track| track.rate = rate);
    }

    fn set_muted(&mut self, muted: bool) {
        self.with_track_mut(|track| track.muted = muted);
    }

    fn is_muted(&self) -> bool {
        self.with_track(|track| track.muted)
    }

    fn poll_event(&mut self) -> Option<MediaEvent> {
        self.with_track_mut(|track| track.pending.pop_front())
    }

    fn release(&mut self) {
        let mut state = self.state.borrow_mut();
        let track = &mut state.tracks[self.slot];
        if track.released {
            return;
        }
        track.released = true;
        track.paused = true;
        track.pending.clear();
        let name = track.name.clone();
        state.released.push(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clip(name: &str) -> VideoFile {
        VideoFile::in_memory(name, "video/mp4", vec![0_u8; 2_048])
    }

    #[test]
    fn shared_state_tracks_lifecycle() {
        let mut engine = ScriptedMediaEngine::new();
        let script = engine.clone();

        let mut first = engine.open(&clip("a.mp4"));
        let _second = engine.open(&clip("b.mp4"));
        first.release();
        first.release();

        assert_eq!(script.opened(), vec!["a.mp4", "b.mp4"]);
        assert_eq!(script.released(), vec!["a.mp4"]);
        assert_eq!(script.live(), vec!["b.mp4"]);
    }

    #[test]
    fn require_muted_policy_only_accepts_muted_play() {
        let mut engine = ScriptedMediaEngine::new();
        engine.set_play_policy(PlayPolicy::RequireMuted);
        let mut resource = engine.open(&clip("a.mp4"));

        assert_eq!(resource.play(), Err(PlayRejection::NotAllowed));
        resource.set_muted(true);
        assert_eq!(resource.play(), Ok(()));
    }

    #[test]
    fn advance_respects_rate_and_duration() {
        let mut engine = ScriptedMediaEngine::new();
        engine.set_duration("a.mp4", Some(Duration::from_secs(5)));
        let mut resource = engine.open(&clip("a.mp4"));
        resource.set_rate(2.0);
        resource.play().expect("play");

        engine.advance(Duration::from_secs(2));
        assert_eq!(resource.position(), Duration::from_secs(4));
        engine.advance(Duration::from_secs(2));
        assert_eq!(resource.position(), Duration::from_secs(5));
    }
}
