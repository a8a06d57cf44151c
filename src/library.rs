use crate::model::{FileProblem, FileSource, ProblemReason, VideoFile};
use std::ffi::OsStr;
use std::fs::File;
use std::io::{self, Cursor};
use std::path::{Path, PathBuf};
use std::time::Duration;
use symphonia::core::codecs::CodecParameters;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSource, MediaSourceStream, MediaSourceStreamOptions};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::get_probe;
use walkdir::WalkDir;

pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv"];
const VIDEO_MIME_TYPES: &[&str] = &[
    "video/mp4",
    "video/mov",
    "video/avi",
    "video/x-msvideo",
    "video/quicktime",
    "video/x-matroska",
];

/// Anything smaller than this is treated as a truncated copy.
pub const MIN_HEALTHY_BYTES: u64 = 1024;
const HEAD_PROBE_BYTES: usize = 1024;

/// Result of validating one batch of candidates.
#[derive(Debug, Default)]
pub struct Intake {
    pub accepted: Vec<VideoFile>,
    pub problems: Vec<FileProblem>,
    pub unsupported: usize,
}

pub fn is_video_file(file: &VideoFile) -> bool {
    if VIDEO_MIME_TYPES.contains(&file.mime_type.as_str()) {
        return true;
    }
    let ext = file.extension().unwrap_or_default();
    VIDEO_EXTENSIONS
        .iter()
        .any(|supported| ext.eq_ignore_ascii_case(supported))
}

pub fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(OsStr::to_str)
        .unwrap_or_default()
        .to_ascii_lowercase();
    match ext.as_str() {
        "mp4" => "video/mp4",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "mkv" => "video/x-matroska",
        _ => "application/octet-stream",
    }
}

/// Classifies a supported file. Unsupported types never reach this point.
pub fn classify(file: &VideoFile) -> Result<(), ProblemReason> {
    if file.size_bytes == 0 {
        return Err(ProblemReason::Empty);
    }
    if file.size_bytes < MIN_HEALTHY_BYTES {
        return Err(ProblemReason::TooSmall);
    }
    file.source
        .read_prefix(HEAD_PROBE_BYTES)
        .map(|_| ())
        .map_err(|_| ProblemReason::Unreadable)
}

/// Splits candidates into accepted files and problems, in input order.
/// Unsupported types are dropped silently and only counted.
pub fn validate(candidates: Vec<VideoFile>) -> Intake {
    let mut intake = Intake::default();
    for file in candidates {
        if !is_video_file(&file) {
            intake.unsupported += 1;
            continue;
        }
        match classify(&file) {
            Ok(()) => intake.accepted.push(file),
            Err(reason) => intake.problems.push(FileProblem {
                name: file.name,
                reason,
            }),
        }
    }
    intake
}

pub fn file_from_path(path: &Path) -> io::Result<VideoFile> {
    let metadata = std::fs::metadata(path)?;
    let cleaned = crate::config::strip_windows_verbatim_prefix(path);
    let name = cleaned
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| cleaned.display().to_string());
    Ok(VideoFile::new(
        name,
        metadata.len(),
        mime_for_path(&cleaned),
        FileSource::Disk(cleaned),
    ))
}

/// Expands files and folders into picked files. Folders are walked
/// recursively and only contribute supported extensions; explicit files are
/// passed through so validation can report on them.
pub fn pick_paths(paths: &[PathBuf]) -> Vec<VideoFile> {
    let mut picked = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(path)
                .follow_links(true)
                .into_iter()
                .filter_map(Result::ok)
                .filter(|entry| entry.file_type().is_file() && has_video_extension(entry.path()))
                .map(|entry| entry.into_path())
                .collect();
            found.sort();
            picked.extend(found.iter().filter_map(|path| file_from_path(path).ok()));
        } else if let Ok(file) = file_from_path(path) {
            picked.push(file);
        } else {
            tracing::warn!(path = %path.display(), "skipping path that cannot be stat'ed");
        }
    }
    picked
}

fn has_video_extension(path: &Path) -> bool {
    let ext = path.extension().and_then(OsStr::to_str).unwrap_or_default();
    VIDEO_EXTENSIONS
        .iter()
        .any(|supported| ext.eq_ignore_ascii_case(supported))
}

/// Longest track duration reported by the container, if any.
pub fn probe_duration(file: &VideoFile) -> Option<Duration> {
    let media: Box<dyn MediaSource> = match &file.source {
        FileSource::Disk(path) => Box::new(File::open(path).ok()?),
        FileSource::Memory(bytes) => Box::new(Cursor::new(bytes.clone())),
    };
    let source = MediaSourceStream::new(media, MediaSourceStreamOptions::default());

    let mut hint = Hint::new();
    if let Some(extension) = file.extension() {
        hint.with_extension(extension);
    }

    let probed = get_probe()
        .format(
            &hint,
            source,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .ok()?;

    probed
        .format
        .tracks()
        .iter()
        .filter_map(|track| codec_duration(&track.codec_params))
        .max()
        .filter(|duration| !duration.is_zero())
}

fn codec_duration(codec_params: &CodecParameters) -> Option<Duration> {
    if let (Some(time_base), Some(frame_count)) = (codec_params.time_base, codec_params.n_frames) {
        let time = time_base.calc_time(frame_count);
        return Some(Duration::from_secs(time.seconds) + Duration::from_secs_f64(time.frac));
    }

    codec_params
        .n_frames
        .zip(codec_params.sample_rate)
        .filter(|(_, sample_rate)| *sample_rate > 0)
        .map(|(frame_count, sample_rate)| {
            Duration::from_secs_f64(frame_count as f64 / f64::from(sample_rate))
        })
}
