//! The decode/render capability consumed by players.
//!
//! A [`MediaEngine`] binds a [`VideoFile`] to a fresh [`MediaResource`]. The
//! resource exposes transport primitives and reports asynchronous progress
//! through [`MediaResource::poll_event`], which players drain on every tick.

mod scripted;

pub use scripted::{PlayPolicy, ScriptedMediaEngine};

use crate::library;
use crate::model::{DEFAULT_SPEED, FileSource, VideoFile};
use anyhow::{Context, Result};
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source};
use std::collections::VecDeque;
use std::fmt;
use std::fs::File;
use std::io::Cursor;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaErrorCode {
    Aborted,
    Network,
    Decode,
    Unsupported,
    Unknown(u16),
}

impl MediaErrorCode {
    pub fn from_code(code: u16) -> Self {
        match code {
            1 => Self::Aborted,
            2 => Self::Network,
            3 => Self::Decode,
            4 => Self::Unsupported,
            other => Self::Unknown(other),
        }
    }
}

impl fmt::Display for MediaErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Aborted => f.write_str("Video loading aborted"),
            Self::Network => f.write_str("Network error - check file source"),
            Self::Decode => f.write_str("Video decode error - file may be corrupted"),
            Self::Unsupported => f.write_str("Video format not supported"),
            Self::Unknown(code) => write!(f, "Error code: {code}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaEvent {
    MetadataReady,
    CanPlayThrough,
    Ended,
    Error(MediaErrorCode),
}

/// Why the platform refused to start playback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayRejection {
    /// Autoplay policy; a muted retry may still succeed.
    NotAllowed,
    Failed(String),
}

pub trait MediaEngine {
    /// Binds a new resource to `file`. Open failures are reported through
    /// the resource's event queue, never here.
    fn open(&mut self, file: &VideoFile) -> Box<dyn MediaResource>;
    fn name(&self) -> &'static str;
}

pub trait MediaResource {
    fn play(&mut self) -> Result<(), PlayRejection>;
    fn pause(&mut self);
    fn is_paused(&self) -> bool;
    fn seek(&mut self, position: Duration);
    fn position(&self) -> Duration;
    fn duration(&self) -> Option<Duration>;
    fn dimensions(&self) -> Option<(u32, u32)>;
    fn set_rate(&mut self, rate: f32);
    fn set_muted(&mut self, muted: bool);
    fn is_muted(&self) -> bool;
    fn poll_event(&mut self) -> Option<MediaEvent>;
    fn release(&mut self);
}

/// Plays the soundtrack of each video through one shared output stream.
pub struct RodioMediaEngine {
    stream: OutputStream,
}

impl RodioMediaEngine {
    pub fn new() -> Result<Self> {
        let mut stream = OutputStreamBuilder::from_default_device()
            .context("failed to open default system output stream")?
            .with_error_callback(|err| tracing::warn!(error = %err, "audio stream error"))
            .open_stream_or_fallback()
            .context("failed to start default output stream")?;
        stream.log_on_drop(false);
        Ok(Self { stream })
    }
}

impl MediaEngine for RodioMediaEngine {
    fn open(&mut self, file: &VideoFile) -> Box<dyn MediaResource> {
        Box::new(RodioResource::open(&self.stream, file))
    }

    fn name(&self) -> &'static str {
        "soundtrack (rodio)"
    }
}

struct RodioResource {
    sink: Option<Sink>,
    duration: Option<Duration>,
    muted: bool,
    events: VecDeque<MediaEvent>,
    ended_reported: bool,
}

impl RodioResource {
    fn open(stream: &OutputStream, file: &VideoFile) -> Self {
        let mut resource = Self {
            sink: None,
            duration: None,
            muted: false,
            events: VecDeque::new(),
            ended_reported: false,
        };

        let decoded: Result<Box<dyn Source + Send>, MediaErrorCode> = match &file.source {
            FileSource::Disk(path) => match File::open(path) {
                Ok(handle) => Decoder::try_from(handle)
                    .map(|d| Box::new(d) as Box<dyn Source + Send>)
                    .map_err(|_| MediaErrorCode::Unsupported),
                Err(_) => Err(MediaErrorCode::Network),
            },
            FileSource::Memory(bytes) => Decoder::new(Cursor::new(bytes.clone()))
                .map(|d| Box::new(d) as Box<dyn Source + Send>)
                .map_err(|_| MediaErrorCode::Unsupported),
        };

        match decoded {
            Ok(source) => {
                resource.duration = source
                    .total_duration()
                    .filter(|duration| !duration.is_zero())
                    .or_else(|| library::probe_duration(file));
                let sink = Sink::connect_new(stream.mixer());
                sink.pause();
                sink.append(source);
                resource.sink = Some(sink);
                resource.events.push_back(MediaEvent::MetadataReady);
                resource.events.push_back(MediaEvent::CanPlayThrough);
            }
            Err(code) => {
                tracing::debug!(file = %file.name, %code, "soundtrack decoder refused file");
                resource.events.push_back(MediaEvent::Error(code));
            }
        }
        resource
    }
}

impl MediaResource for RodioResource {
    fn play(&mut self) -> Result<(), PlayRejection> {
        let Some(sink) = &self.sink else {
            return Err(PlayRejection::Failed(String::from("no decodable media")));
        };
        if sink.empty() {
            return Err(PlayRejection::Failed(String::from("playback already finished")));
        }
        sink.play();
        Ok(())
    }

    fn pause(&mut self) {
        if let Some(sink) = &self.sink {
            sink.pause();
        }
    }

    fn is_paused(&self) -> bool {
        self.sink.as_ref().is_none_or(|sink| sink.is_paused() || sink.empty())
    }

    fn seek(&mut self, position: Duration) {
        let Some(sink) = &self.sink else {
            return;
        };
        if let Err(err) = sink.try_seek(position) {
            tracing::debug!(error = ?err, "soundtrack seek rejected");
        }
    }

    fn position(&self) -> Duration {
        self.sink
            .as_ref()
            .map_or(Duration::ZERO, |sink| sink.get_pos())
    }

    fn duration(&self) -> Option<Duration> {
        self.duration
    }

    fn dimensions(&self) -> Option<(u32, u32)> {
        None
    }

    fn set_rate(&mut self, rate: f32) {
        if let Some(sink) = &self.sink {
            sink.set_speed(rate);
        }
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        if let Some(sink) = &self.sink {
            sink.set_volume(if muted { 0.0 } else { 1.0 });
        }
    }

    fn is_muted(&self) -> bool {
        self.muted
    }

    fn poll_event(&mut self) -> Option<MediaEvent> {
        if let Some(event) = self.events.pop_front() {
            return Some(event);
        }
        let sink = self.sink.as_ref()?;
        if !self.ended_reported && !sink.is_paused() && sink.empty() {
            self.ended_reported = true;
            return Some(MediaEvent::Ended);
        }
        None
    }

    fn release(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
        self.events.clear();
    }
}

/// Silent playback driven by the wall clock. Durations come from probing
/// the container; unknown durations never finish.
#[derive(Debug, Default)]
pub struct ClockMediaEngine;

impl ClockMediaEngine {
    pub fn new() -> Self {
        Self
    }
}

impl MediaEngine for ClockMediaEngine {
    fn open(&mut self, file: &VideoFile) -> Box<dyn MediaResource> {
        let mut resource = ClockResource {
            paused: true,
            started_at: None,
            position_offset: Duration::ZERO,
            duration: None,
            rate: DEFAULT_SPEED,
            muted: false,
            events: VecDeque::new(),
            ended_reported: false,
            released: false,
        };
        if file.source.read_prefix(1).is_err() {
            resource
                .events
                .push_back(MediaEvent::Error(MediaErrorCode::Network));
        } else {
            resource.duration = library::probe_duration(file);
            resource.events.push_back(MediaEvent::MetadataReady);
            resource.events.push_back(MediaEvent::CanPlayThrough);
        }
        Box::new(resource)
    }

    fn name(&self) -> &'static str {
        "silent clock"
    }
}

struct ClockResource {
    paused: bool,
    started_at: Option<Instant>,
    position_offset: Duration,
    duration: Option<Duration>,
    rate: f32,
    muted: bool,
    events: VecDeque<MediaEvent>,
    ended_reported: bool,
    released: bool,
}

impl ClockResource {
    fn current_position(&self) -> Duration {
        let mut position = self.position_offset;
        if !self.paused
            && let Some(started_at) = self.started_at
        {
            position = position.saturating_add(started_at.elapsed().mul_f32(self.rate));
        }
        if let Some(duration) = self.duration {
            return position.min(duration);
        }
        position
    }

    fn is_finished(&self) -> bool {
        let Some(duration) = self.duration else {
            return false;
        };
        !self.released && !self.paused && self.current_position() >= duration
    }
}

impl MediaResource for ClockResource {
    fn play(&mut self) -> Result<(), PlayRejection> {
        if self.released {
            return Err(PlayRejection::Failed(String::from("resource released")));
        }
        if self.paused {
            self.started_at = Some(Instant::now());
            self.paused = false;
        }
        Ok(())
    }

    fn pause(&mut self) {
        self.position_offset = self.current_position();
        self.started_at = None;
        self.paused = true;
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn seek(&mut self, position: Duration) {
        self.position_offset = self
            .duration
            .map_or(position, |duration| position.min(duration));
        self.started_at = if self.paused {
            None
        } else {
            Some(Instant::now())
        };
    }

    fn position(&self) -> Duration {
        self.current_position()
    }

    fn duration(&self) -> Option<Duration> {
        self.duration
    }

    fn dimensions(&self) -> Option<(u32, u32)> {
        None
    }

    fn set_rate(&mut self, rate: f32) {
        self.position_offset = self.current_position();
        if !self.paused {
            self.started_at = Some(Instant::now());
        }
        self.rate = rate;
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn is_muted(&self) -> bool {
        self.muted
    }

    fn poll_event(&mut self) -> Option<MediaEvent> {
        if let Some(event) = self.events.pop_front() {
            return Some(event);
        }
        if !self.ended_reported && self.is_finished() {
            self.ended_reported = true;
            self.pause();
            return Some(MediaEvent::Ended);
        }
        None
    }

    fn release(&mut self) {
        self.released = true;
        self.paused = true;
        self.started_at = None;
        self.events.clear();
    }
}
