use crate::media::MediaErrorCode;
use crate::model::{FileProblem, PlayerId};
use crate::player::VideoInfo;
use std::fmt::Write as _;
use std::time::Duration;

const SIZE_UNITS: &[&str] = &["Bytes", "KB", "MB", "GB", "TB"];

/// `mm:ss`, or `hh:mm:ss` past the hour. Unknown durations render as `00:00`.
pub fn format_time(value: Option<Duration>) -> String {
    let Some(value) = value else {
        return String::from("00:00");
    };
    let total = value.as_secs();
    let hours = total / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;
    if hours > 0 {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}

pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return String::from("0 Bytes");
    }

    let mut unit = 0;
    let mut value = bytes as f64;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    format!("{} {}", trim_decimal(value, 2), SIZE_UNITS[unit])
}

pub fn format_speed(rate: f32) -> String {
    format!("{}x", trim_decimal(f64::from(rate), 2))
}

fn trim_decimal(value: f64, places: usize) -> String {
    let fixed = format!("{value:.places$}");
    if !fixed.contains('.') {
        return fixed;
    }
    fixed
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

pub fn problem_report_text(player: PlayerId, problems: &[FileProblem]) -> String {
    let mut message = format!("PROBLEMATIC FILES FOUND in Player {player}:\n\n");
    for problem in problems {
        let _ = write!(
            message,
            "x {}\n   Issue: {}\n\n",
            problem.name,
            problem.reason.describe()
        );
    }
    message.push_str("SOLUTIONS:\n");
    message.push_str("1. Re-copy the file from original source\n");
    message.push_str("2. Check your drive for errors\n");
    message.push_str("3. Try a different file format\n");
    message.push_str("4. Scan the drive with your disk utility");
    message
}

pub fn playback_error_text(player: PlayerId, file_name: Option<&str>, code: MediaErrorCode) -> String {
    format!(
        "VIDEO PLAYBACK ERROR - Player {player}\n\n\
         File: {}\n\
         Error: {code}\n\n\
         SOLUTIONS:\n\
         1. File may be corrupted - try re-copying from source\n\
         2. Check if the file shows zero bytes on disk\n\
         3. Try converting to a different format\n\
         4. Scan your drive for errors\n\
         5. Try playing it in another media player first",
        file_name.unwrap_or("Unknown")
    )
}

/// One-line summary of the bound video, for the info key.
pub fn describe_video(info: &VideoInfo) -> String {
    let resolution = info
        .dimensions
        .map_or_else(|| String::from("unknown size"), |(w, h)| format!("{w}x{h}"));
    format!(
        "Player {}: {} | {} | {} / {} | {} | {}{}",
        info.player,
        info.name,
        resolution,
        format_time(Some(info.position)),
        format_time(info.duration),
        format_speed(info.speed),
        format_file_size(info.size_bytes),
        if info.healthy { "" } else { " | corrupted" }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProblemReason;

    #[test]
    fn time_switches_to_hours() {
        assert_eq!(format_time(None), "00:00");
        assert_eq!(format_time(Some(Duration::from_secs(65))), "01:05");
        assert_eq!(format_time(Some(Duration::from_secs(3_725))), "01:02:05");
    }

    #[test]
    fn file_size_trims_trailing_zeros() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(512), "512 Bytes");
        assert_eq!(format_file_size(1_024), "1 KB");
        assert_eq!(format_file_size(1_536), "1.5 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024), "5 MB");
    }

    #[test]
    fn speed_labels() {
        assert_eq!(format_speed(1.0), "1x");
        assert_eq!(format_speed(0.25), "0.25x");
        assert_eq!(format_speed(1.5), "1.5x");
    }

    #[test]
    fn video_summary_line() {
        let info = VideoInfo {
            player: PlayerId(2),
            name: String::from("a.mp4"),
            size_bytes: 1_536,
            mime_type: String::from("video/mp4"),
            healthy: true,
            position: Duration::from_secs(62),
            duration: Some(Duration::from_secs(180)),
            dimensions: Some((1920, 1080)),
            speed: 1.5,
            playing: true,
        };
        assert_eq!(
            describe_video(&info),
            "Player 2: a.mp4 | 1920x1080 | 01:02 / 03:00 | 1.5x | 1.5 KB"
        );
    }

    #[test]
    fn problem_report_lists_each_file_once() {
        let text = problem_report_text(
            PlayerId(2),
            &[
                FileProblem {
                    name: String::from("x.mp4"),
                    reason: ProblemReason::Empty,
                },
                FileProblem {
                    name: String::from("y.mov"),
                    reason: ProblemReason::Unreadable,
                },
            ],
        );
        assert!(text.starts_with("PROBLEMATIC FILES FOUND in Player 2"));
        assert_eq!(text.matches("x.mp4").count(), 1);
        assert!(text.contains(ProblemReason::Unreadable.describe()));
    }
}
