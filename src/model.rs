use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const MAX_PLAYERS: usize = 9;
pub const MIN_SPEED: f32 = 0.25;
pub const MAX_SPEED: f32 = 10.0;
pub const DEFAULT_SPEED: f32 = 1.0;
pub const SPEED_PRESETS: &[f32] = &[
    0.25, 0.5, 0.75, 1.0, 1.25, 1.5, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 10.0,
];

pub fn clamp_speed(rate: f32) -> f32 {
    if rate.is_nan() {
        return DEFAULT_SPEED;
    }
    rate.clamp(MIN_SPEED, MAX_SPEED)
}

/// Identity of a player. Assigned by the coordinator, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u32);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where the bytes of a picked file live.
#[derive(Clone)]
pub enum FileSource {
    Disk(PathBuf),
    Memory(Arc<[u8]>),
}

impl fmt::Debug for FileSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disk(path) => f.debug_tuple("Disk").field(path).finish(),
            Self::Memory(bytes) => write!(f, "Memory({} bytes)", bytes.len()),
        }
    }
}

impl FileSource {
    pub fn read_prefix(&self, len: usize) -> io::Result<Vec<u8>> {
        match self {
            Self::Disk(path) => {
                let file = File::open(path)?;
                let mut buf = Vec::with_capacity(len);
                file.take(len as u64).read_to_end(&mut buf)?;
                Ok(buf)
            }
            Self::Memory(bytes) => Ok(bytes[..len.min(bytes.len())].to_vec()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Disk(path) => Some(path.as_path()),
            Self::Memory(_) => None,
        }
    }
}

/// A candidate or accepted video file. Only metadata is ever exported.
#[derive(Debug, Clone)]
pub struct VideoFile {
    pub name: String,
    pub size_bytes: u64,
    pub mime_type: String,
    pub source: FileSource,
}

impl VideoFile {
    pub fn new(
        name: impl Into<String>,
        size_bytes: u64,
        mime_type: impl Into<String>,
        source: FileSource,
    ) -> Self {
        Self {
            name: name.into(),
            size_bytes,
            mime_type: mime_type.into(),
            source,
        }
    }

    pub fn in_memory(
        name: impl Into<String>,
        mime_type: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
    ) -> Self {
        let bytes = bytes.into();
        Self::new(
            name,
            bytes.len() as u64,
            mime_type,
            FileSource::Memory(bytes),
        )
    }

    /// Dedup key used by the master playlist.
    pub fn key(&self) -> (&str, u64) {
        (self.name.as_str(), self.size_bytes)
    }

    pub fn extension(&self) -> Option<&str> {
        Path::new(&self.name)
            .extension()
            .and_then(|ext| ext.to_str())
    }

    pub fn is_healthy(&self) -> bool {
        self.size_bytes > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProblemReason {
    Empty,
    TooSmall,
    Unreadable,
}

impl ProblemReason {
    pub fn describe(self) -> &'static str {
        match self {
            Self::Empty => "File is empty (0 bytes) - likely corrupted",
            Self::TooSmall => "File too small (< 1KB) - likely corrupted",
            Self::Unreadable => "Cannot read file - may be corrupted or inaccessible",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileProblem {
    pub name: String,
    pub reason: ProblemReason,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterEntry {
    pub name: String,
    pub size_bytes: u64,
    pub mime_type: String,
    pub player: PlayerId,
}

/// Heuristic load signal for the stats bar. Not measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PerformanceEstimate {
    pub total_players: usize,
    pub active_videos: usize,
    pub queued_files: usize,
    pub memory_mb: u64,
    pub load_percent: u8,
}

impl PerformanceEstimate {
    pub fn estimate(total_players: usize, active_videos: usize, queued_files: usize) -> Self {
        let memory_mb = (queued_files as u64) * 2 + (active_videos as u64) * 50;
        let load = active_videos.saturating_mul(10) + total_players.saturating_mul(2);
        Self {
            total_players,
            active_videos,
            queued_files,
            memory_mb,
            load_percent: load.min(100) as u8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    #[serde(default = "default_skip_seconds")]
    pub skip_seconds: u16,
    #[serde(default = "default_speed_step")]
    pub speed_step: f32,
    #[serde(default = "default_notice_ms")]
    pub default_notice_ms: u64,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    #[serde(default)]
    pub export_dir: Option<PathBuf>,
    #[serde(default)]
    pub silent: bool,
}

fn default_skip_seconds() -> u16 {
    10
}

fn default_speed_step() -> f32 {
    0.25
}

fn default_notice_ms() -> u64 {
    2_000
}

fn default_log_filter() -> String {
    String::from("info")
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            skip_seconds: default_skip_seconds(),
            speed_step: default_speed_step(),
            default_notice_ms: default_notice_ms(),
            log_filter: default_log_filter(),
            export_dir: None,
            silent: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speed_clamp_covers_bounds_and_nan() {
        assert_eq!(clamp_speed(0.0), MIN_SPEED);
        assert_eq!(clamp_speed(42.0), MAX_SPEED);
        assert_eq!(clamp_speed(2.5), 2.5);
        assert_eq!(clamp_speed(f32::NAN), DEFAULT_SPEED);
    }

    #[test]
    fn performance_estimate_caps_load() {
        let estimate = PerformanceEstimate::estimate(9, 9, 40);
        assert_eq!(estimate.memory_mb, 40 * 2 + 9 * 50);
        assert_eq!(estimate.load_percent, 100);

        let idle = PerformanceEstimate::estimate(2, 0, 3);
        assert_eq!(idle.memory_mb, 6);
        assert_eq!(idle.load_percent, 4);
    }

    #[test]
    fn memory_source_reads_bounded_prefix() {
        let source = FileSource::Memory(Arc::from(vec![7_u8; 10]));
        assert_eq!(source.read_prefix(4).expect("read").len(), 4);
        assert_eq!(source.read_prefix(64).expect("read").len(), 10);
    }

    #[test]
    fn missing_disk_source_is_unreadable() {
        let source = FileSource::Disk(PathBuf::from("definitely/not/here.mp4"));
        assert!(source.read_prefix(1024).is_err());
    }

    #[test]
    fn settings_fill_defaults_for_missing_fields() {
        let settings: Settings = serde_json::from_str(r#"{"skip_seconds": 5}"#).expect("parse");
        assert_eq!(settings.skip_seconds, 5);
        assert_eq!(settings.speed_step, 0.25);
        assert_eq!(settings.log_filter, "info");
    }
}
