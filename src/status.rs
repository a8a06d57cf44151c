//! Where players and the coordinator surface feedback to the user.
//!
//! Short-lived notices are scoped to one player panel (or the whole wall when
//! no player is named). Blocking reports queue up and stay until dismissed.

use crate::format::problem_report_text;
use crate::model::{FileProblem, PlayerId};
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

pub trait StatusSink {
    /// Transient notice. A newer notice for the same scope replaces the old one.
    fn notify(&mut self, player: Option<PlayerId>, text: &str, duration: Duration);
    /// One batched report per intake, listing every rejected file.
    fn report_problems(&mut self, player: PlayerId, problems: &[FileProblem]);
    /// Blocking report the user has to acknowledge.
    fn report_error(&mut self, message: &str);
    /// Drops anything scoped to a player that no longer exists.
    fn forget(&mut self, _player: PlayerId) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub text: String,
    pub expires_at: Instant,
}

#[derive(Debug, Default)]
pub struct StatusBoard {
    notices: HashMap<Option<PlayerId>, Notice>,
    alerts: VecDeque<String>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notice(&self, player: Option<PlayerId>, now: Instant) -> Option<&str> {
        self.notices
            .get(&player)
            .filter(|notice| notice.expires_at > now)
            .map(|notice| notice.text.as_str())
    }

    /// Drops expired notices. Returns true when something disappeared.
    pub fn expire(&mut self, now: Instant) -> bool {
        let before = self.notices.len();
        self.notices.retain(|_, notice| notice.expires_at > now);
        before != self.notices.len()
    }

    pub fn current_alert(&self) -> Option<&str> {
        self.alerts.front().map(String::as_str)
    }

    pub fn dismiss_alert(&mut self) -> Option<String> {
        self.alerts.pop_front()
    }

    pub fn pending_alerts(&self) -> usize {
        self.alerts.len()
    }
}

impl StatusSink for StatusBoard {
    fn notify(&mut self, player: Option<PlayerId>, text: &str, duration: Duration) {
        self.notices.insert(
            player,
            Notice {
                text: text.to_string(),
                expires_at: Instant::now() + duration,
            },
        );
    }

    fn report_problems(&mut self, player: PlayerId, problems: &[FileProblem]) {
        if problems.is_empty() {
            return;
        }
        self.alerts.push_back(problem_report_text(player, problems));
    }

    fn report_error(&mut self, message: &str) {
        tracing::warn!(%message, "blocking report");
        self.alerts.push_back(message.to_string());
    }

    fn forget(&mut self, player: PlayerId) {
        self.notices.remove(&Some(player));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProblemReason;

    #[test]
    fn newer_notice_replaces_older_for_same_player() {
        let mut board = StatusBoard::new();
        board.notify(Some(PlayerId(1)), "Loading: a.mp4", Duration::from_secs(2));
        board.notify(Some(PlayerId(1)), "Ready: Player 1", Duration::from_secs(2));
        board.notify(Some(PlayerId(2)), "Player 2 Active", Duration::from_secs(2));

        let now = Instant::now();
        assert_eq!(board.notice(Some(PlayerId(1)), now), Some("Ready: Player 1"));
        assert_eq!(board.notice(Some(PlayerId(2)), now), Some("Player 2 Active"));
        assert_eq!(board.notice(None, now), None);
    }

    #[test]
    fn notices_expire() {
        let mut board = StatusBoard::new();
        board.notify(None, "Restarted", Duration::from_millis(10));
        let later = Instant::now() + Duration::from_secs(1);

        assert_eq!(board.notice(None, later), None);
        assert!(board.expire(later));
        assert!(!board.expire(later));
    }

    #[test]
    fn problems_become_one_alert_per_batch() {
        let mut board = StatusBoard::new();
        board.report_problems(
            PlayerId(3),
            &[
                FileProblem {
                    name: String::from("a.mp4"),
                    reason: ProblemReason::Empty,
                },
                FileProblem {
                    name: String::from("b.mp4"),
                    reason: ProblemReason::TooSmall,
                },
            ],
        );
        board.report_problems(PlayerId(3), &[]);
        board.report_error("Cannot remove the last player!");

        assert_eq!(board.pending_alerts(), 2);
        let first = board.dismiss_alert().expect("problem report");
        assert!(first.contains("a.mp4") && first.contains("b.mp4"));
        assert_eq!(board.current_alert(), Some("Cannot remove the last player!"));
    }
}
