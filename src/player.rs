//! One video slot: a playlist, a cursor into it, and at most one bound media
//! resource.
//!
//! Players never reach into the coordinator. Everything the wall needs to
//! hear about (notices, problem batches, blocking errors, playlist changes)
//! goes out through the [`CoordinatorLink`] handed over at construction.

use crate::coordinator::CoordinatorLink;
use crate::error::{Result, WallError};
use crate::format::{format_speed, playback_error_text};
use crate::library;
use crate::media::{MediaEngine, MediaErrorCode, MediaEvent, MediaResource, PlayRejection};
use crate::model::{DEFAULT_SPEED, FileProblem, PlayerId, VideoFile, clamp_speed};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use std::fmt;
use std::time::Duration;

pub const NOTICE_BRIEF: Duration = Duration::from_millis(1_000);
pub const NOTICE_ACTIVE: Duration = Duration::from_millis(1_500);
pub const NOTICE_DEFAULT: Duration = Duration::from_millis(2_000);
pub const NOTICE_LONG: Duration = Duration::from_millis(3_000);
pub const NOTICE_ERROR: Duration = Duration::from_millis(5_000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    Playing,
    /// Autoplay refused the audible attempt; the muted retry went through.
    PlayingMuted,
    Paused,
    /// Both the audible and the muted attempt were refused.
    Blocked,
    Failed,
    NothingLoaded,
}

impl PlayOutcome {
    pub fn is_playing(self) -> bool {
        matches!(self, Self::Playing | Self::PlayingMuted)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IntakeReport {
    pub accepted: usize,
    pub total: usize,
    pub problems: Vec<FileProblem>,
    pub unsupported: usize,
    pub auto_loaded: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoInfo {
    pub player: PlayerId,
    pub name: String,
    pub size_bytes: u64,
    pub mime_type: String,
    pub healthy: bool,
    pub position: Duration,
    pub duration: Option<Duration>,
    pub dimensions: Option<(u32, u32)>,
    pub speed: f32,
    pub playing: bool,
}

pub struct Player {
    id: PlayerId,
    playlist: Vec<VideoFile>,
    current_index: usize,
    shuffled: bool,
    shuffle_order: Vec<usize>,
    shuffle_stale: bool,
    speed: f32,
    muted: bool,
    fullscreen: bool,
    has_loaded: bool,
    awaiting_ready: bool,
    media: Option<Box<dyn MediaResource>>,
    last_error: Option<MediaErrorCode>,
    link: CoordinatorLink,
    rng: SmallRng,
}

impl fmt::Debug for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Player")
            .field("id", &self.id)
            .field("playlist", &self.playlist.len())
            .field("current_index", &self.current_index)
            .field("shuffled", &self.shuffled)
            .field("speed", &self.speed)
            .field("media", &self.media.is_some())
            .finish_non_exhaustive()
    }
}

impl Player {
    pub fn new(id: PlayerId, link: CoordinatorLink) -> Self {
        Self {
            id,
            playlist: Vec::new(),
            current_index: 0,
            shuffled: false,
            shuffle_order: Vec::new(),
            shuffle_stale: true,
            speed: DEFAULT_SPEED,
            muted: false,
            fullscreen: false,
            has_loaded: false,
            awaiting_ready: false,
            media: None,
            last_error: None,
            link,
            rng: SmallRng::from_os_rng(),
        }
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn playlist(&self) -> &[VideoFile] {
        &self.playlist
    }

    /// Cursor into the playlist; `None` while the playlist is empty.
    pub fn current_index(&self) -> Option<usize> {
        (!self.playlist.is_empty()).then_some(self.current_index)
    }

    pub fn current_file(&self) -> Option<&VideoFile> {
        self.playlist.get(self.current_index)
    }

    pub fn is_shuffled(&self) -> bool {
        self.shuffled
    }

    /// The traversal order used while shuffled.
    pub fn shuffle_order(&self) -> Option<&[usize]> {
        self.shuffled.then_some(self.shuffle_order.as_slice())
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Whether output is silent right now, including an autoplay fallback.
    pub fn is_output_muted(&self) -> bool {
        self.media
            .as_ref()
            .map_or(self.muted, |media| media.is_muted())
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    pub fn has_loaded(&self) -> bool {
        self.has_loaded
    }

    pub fn is_loaded(&self) -> bool {
        self.media.is_some()
    }

    pub fn is_playing(&self) -> bool {
        self.media.as_ref().is_some_and(|media| !media.is_paused())
    }

    pub fn position(&self) -> Duration {
        self.media
            .as_ref()
            .map_or(Duration::ZERO, |media| media.position())
    }

    pub fn duration(&self) -> Option<Duration> {
        self.media.as_ref().and_then(|media| media.duration())
    }

    pub fn last_error(&self) -> Option<MediaErrorCode> {
        self.last_error
    }

    pub fn announce_active(&self) {
        self.notice(format!("Player {} Active", self.id), NOTICE_ACTIVE);
    }

    /// Validates a batch, appends the healthy files and auto-loads the first
    /// of them if this player has never loaded anything.
    ///
    /// Every rejected file lands in one problem report. A non-empty batch
    /// that yields nothing playable fails with [`WallError::NoValidFiles`].
    pub fn validate_and_add_files(
        &mut self,
        candidates: Vec<VideoFile>,
        engine: &mut dyn MediaEngine,
    ) -> Result<IntakeReport> {
        let total = candidates.len();
        let intake = library::validate(candidates);
        if !intake.problems.is_empty() {
            tracing::warn!(
                player = %self.id,
                rejected = intake.problems.len(),
                "rejected files during intake"
            );
            self.link.problems(intake.problems.clone());
        }

        if intake.accepted.is_empty() {
            if total == 0 {
                return Ok(IntakeReport::default());
            }
            let err = WallError::NoValidFiles {
                player: self.id,
                problems: intake.problems,
            };
            self.link.error(err.to_string());
            return Err(err);
        }

        let first_new = self.playlist.len();
        let accepted = intake.accepted.len();
        self.playlist.extend(intake.accepted);
        self.shuffle_stale = true;

        let auto_loaded =
            (!self.has_loaded || self.media.is_none()) && self.load_video(first_new, engine);
        tracing::info!(player = %self.id, accepted, total = self.playlist.len(), "files added");
        self.notice(
            format!("{accepted} video(s) added! Total: {}", self.playlist.len()),
            NOTICE_DEFAULT,
        );
        self.link.playlist_changed();

        Ok(IntakeReport {
            accepted,
            total,
            problems: intake.problems,
            unsupported: intake.unsupported,
            auto_loaded,
        })
    }

    /// Binds the playlist entry at `index`, releasing whatever was bound
    /// before. Speed and mute carry over to the new resource.
    pub fn load_video(&mut self, index: usize, engine: &mut dyn MediaEngine) -> bool {
        if index >= self.playlist.len() {
            return false;
        }
        self.release_media();

        let file = &self.playlist[index];
        let mut media = engine.open(file);
        media.set_rate(self.speed);
        media.set_muted(self.muted);
        tracing::debug!(player = %self.id, file = %file.name, engine = engine.name(), "binding video");
        let text = format!("Loading: {}", file.name);

        self.media = Some(media);
        self.current_index = index;
        self.has_loaded = true;
        self.awaiting_ready = true;
        self.last_error = None;
        self.notice(text, NOTICE_DEFAULT);
        self.link.playlist_changed();
        true
    }

    /// Loads a playlist entry picked by the user. Empty files are refused.
    pub fn select(&mut self, index: usize, engine: &mut dyn MediaEngine) -> bool {
        let Some(file) = self.playlist.get(index) else {
            return false;
        };
        if !file.is_healthy() {
            let text = format!("Cannot play {} - file is corrupted or empty", file.name);
            self.notice(text, NOTICE_LONG);
            return false;
        }
        self.load_video(index, engine)
    }

    /// Starts playback, retrying muted when autoplay refuses the audible
    /// attempt. Refusals are surfaced as notices. The muted fallback lasts
    /// for this attempt only; the player's own mute setting is untouched.
    pub fn play(&mut self) -> PlayOutcome {
        let Some(media) = self.media.as_mut() else {
            return PlayOutcome::NothingLoaded;
        };
        if !media.is_paused() {
            return PlayOutcome::Playing;
        }

        media.set_muted(self.muted);
        let outcome = match media.play() {
            Ok(()) => PlayOutcome::Playing,
            Err(PlayRejection::NotAllowed) => {
                media.set_muted(true);
                match media.play() {
                    Ok(()) => PlayOutcome::PlayingMuted,
                    Err(_) => {
                        media.set_muted(self.muted);
                        PlayOutcome::Blocked
                    }
                }
            }
            Err(PlayRejection::Failed(reason)) => {
                tracing::warn!(player = %self.id, %reason, "play failed");
                PlayOutcome::Failed
            }
        };

        match outcome {
            PlayOutcome::PlayingMuted => self.notice("Click to allow autoplay", NOTICE_LONG),
            PlayOutcome::Blocked => self.notice("Manual interaction required", NOTICE_LONG),
            PlayOutcome::Failed => self.notice("Play failed - check file", NOTICE_LONG),
            _ => {}
        }
        outcome
    }

    /// Pauses if playing. Returns whether anything changed.
    pub fn pause(&mut self) -> bool {
        let Some(media) = self.media.as_mut() else {
            return false;
        };
        if media.is_paused() {
            return false;
        }
        media.pause();
        self.notice(format!("Player {} Paused", self.id), NOTICE_BRIEF);
        true
    }

    pub fn toggle_play_pause(&mut self) -> PlayOutcome {
        if self.media.is_none() {
            self.notice(format!("No video loaded in Player {}", self.id), NOTICE_DEFAULT);
            return PlayOutcome::NothingLoaded;
        }
        if self.is_playing() {
            self.pause();
            return PlayOutcome::Paused;
        }

        let outcome = self.play();
        if outcome == PlayOutcome::Playing {
            self.notice(format!("Player {} Playing", self.id), NOTICE_BRIEF);
        }
        outcome
    }

    /// Moves the position by `delta` seconds. With an unknown duration the
    /// position only moves backwards.
    pub fn skip_seconds(&mut self, delta: f64) -> bool {
        if !delta.is_finite() {
            return false;
        }
        let Some(media) = self.media.as_mut() else {
            return false;
        };
        let current = media.position().as_secs_f64();
        let target = match media.duration() {
            Some(duration) => (current + delta).clamp(0.0, duration.as_secs_f64()),
            None => (current + delta).clamp(0.0, current),
        };
        media.seek(Duration::from_secs_f64(target));

        let sign = if delta >= 0.0 { "+" } else { "-" };
        self.notice(format!("{sign}{}s", delta.abs()), NOTICE_BRIEF);
        true
    }

    pub fn restart(&mut self) -> bool {
        let Some(media) = self.media.as_mut() else {
            return false;
        };
        media.seek(Duration::ZERO);
        self.notice("Restarted", NOTICE_BRIEF);
        true
    }

    /// Applies `rate` to this player and its bound resource.
    pub fn set_speed(&mut self, rate: f32) -> f32 {
        self.speed = clamp_speed(rate);
        if let Some(media) = self.media.as_mut() {
            media.set_rate(self.speed);
        }
        self.notice(format!("{} Speed", format_speed(self.speed)), NOTICE_BRIEF);
        self.speed
    }

    pub fn adjust_speed(&mut self, delta: f32) -> f32 {
        self.set_speed(self.speed + delta)
    }

    pub fn toggle_mute(&mut self) -> bool {
        self.muted = !self.muted;
        if let Some(media) = self.media.as_mut() {
            media.set_muted(self.muted);
        }
        self.notice(if self.muted { "Muted" } else { "Unmuted" }, NOTICE_BRIEF);
        self.muted
    }

    pub fn toggle_fullscreen(&mut self) -> bool {
        self.fullscreen = !self.fullscreen;
        self.fullscreen
    }

    pub fn next(&mut self, engine: &mut dyn MediaEngine) -> bool {
        self.step(true, engine)
    }

    pub fn previous(&mut self, engine: &mut dyn MediaEngine) -> bool {
        self.step(false, engine)
    }

    fn step(&mut self, forward: bool, engine: &mut dyn MediaEngine) -> bool {
        let len = self.playlist.len();
        if len == 0 {
            return false;
        }
        let current = self.current_index.min(len - 1);
        let target = if self.shuffled {
            self.ensure_shuffle_order();
            let slot = self
                .shuffle_order
                .iter()
                .position(|&index| index == current)
                .unwrap_or(0);
            let slot = if forward {
                (slot + 1) % len
            } else {
                (slot + len - 1) % len
            };
            self.shuffle_order[slot]
        } else if forward {
            (current + 1) % len
        } else {
            (current + len - 1) % len
        };

        if !self.load_video(target, engine) {
            return false;
        }
        if let Some(media) = self.media.as_mut() {
            if let Err(err) = media.play() {
                tracing::warn!(player = %self.id, ?err, "auto-play after track change failed");
            }
        }
        true
    }

    pub fn toggle_shuffle(&mut self) -> bool {
        self.shuffled = !self.shuffled;
        if self.shuffled {
            self.regenerate_shuffle();
        }
        let text = if self.shuffled {
            "Shuffle ON"
        } else {
            "Shuffle OFF"
        };
        self.notice(text, NOTICE_DEFAULT);
        self.shuffled
    }

    fn ensure_shuffle_order(&mut self) {
        if self.shuffle_stale || self.shuffle_order.len() != self.playlist.len() {
            self.regenerate_shuffle();
        }
    }

    fn regenerate_shuffle(&mut self) {
        self.shuffle_order = (0..self.playlist.len()).collect();
        self.shuffle_order.shuffle(&mut self.rng);
        self.shuffle_stale = false;
    }

    /// Seeks to `position` (bounded by this player's duration) and adopts
    /// `rate`. Players without a known duration are left alone.
    pub fn sync_to(&mut self, position: Duration, rate: f32) -> bool {
        let Some(media) = self.media.as_mut() else {
            return false;
        };
        let Some(duration) = media.duration() else {
            return false;
        };
        media.seek(position.min(duration));
        self.speed = clamp_speed(rate);
        media.set_rate(self.speed);
        true
    }

    /// Drains pending media notifications.
    pub fn tick(&mut self, engine: &mut dyn MediaEngine) {
        while let Some(event) = self.media.as_mut().and_then(|media| media.poll_event()) {
            match event {
                MediaEvent::MetadataReady => {
                    tracing::trace!(player = %self.id, duration = ?self.duration(), "metadata ready");
                }
                MediaEvent::CanPlayThrough => {
                    if self.awaiting_ready {
                        self.awaiting_ready = false;
                        self.notice(format!("Ready: Player {}", self.id), NOTICE_ACTIVE);
                    }
                }
                MediaEvent::Ended => {
                    tracing::debug!(player = %self.id, "video ended");
                    self.next(engine);
                    return;
                }
                MediaEvent::Error(code) => {
                    self.fail_media(code);
                    return;
                }
            }
        }
    }

    fn fail_media(&mut self, code: MediaErrorCode) {
        let name = self.current_file().map(|file| file.name.clone());
        tracing::error!(player = %self.id, file = ?name, %code, "media error");
        self.release_media();
        self.last_error = Some(code);
        self.link
            .error(playback_error_text(self.id, name.as_deref(), code));
        self.notice(format!("Error: {code}"), NOTICE_ERROR);
    }

    /// Empties the playlist and unbinds any media.
    pub fn clear(&mut self) {
        self.release_media();
        self.playlist.clear();
        self.current_index = 0;
        self.shuffle_order.clear();
        self.shuffle_stale = true;
        self.has_loaded = false;
        self.last_error = None;
        self.link.playlist_changed();
    }

    pub fn destroy(mut self) {
        self.release_media();
        tracing::debug!(player = %self.id, "player destroyed");
    }

    pub fn video_info(&self) -> Option<VideoInfo> {
        let file = self.current_file()?;
        let media = self.media.as_ref()?;
        Some(VideoInfo {
            player: self.id,
            name: file.name.clone(),
            size_bytes: file.size_bytes,
            mime_type: file.mime_type.clone(),
            healthy: file.is_healthy(),
            position: media.position(),
            duration: media.duration(),
            dimensions: media.dimensions(),
            speed: self.speed,
            playing: !media.is_paused(),
        })
    }

    fn release_media(&mut self) {
        if let Some(mut media) = self.media.take() {
            media.release();
        }
        self.awaiting_ready = false;
    }

    fn notice(&self, text: impl Into<String>, duration: Duration) {
        self.link.notice(text, duration);
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        self.release_media();
    }
}
