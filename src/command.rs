//! User intents, decoupled from whichever surface produced them.

use crate::coordinator::PlayerCoordinator;
use crate::error::{Result, WallError};
use crate::export::ImportSummary;
use crate::library;
use crate::model::PlayerId;
use crate::player::{IntakeReport, PlayOutcome, VideoInfo};
use crate::status::StatusSink;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Active,
    Player(PlayerId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerAction {
    TogglePlay,
    Skip(f64),
    Restart,
    SetSpeed(f32),
    AdjustSpeed(f32),
    ToggleMute,
    ToggleFullscreen,
    Next,
    Previous,
    ToggleShuffle,
    /// Zero-based playlist position.
    Select(usize),
    Info,
    Remove,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// One-based slot, as printed on the panels.
    Activate(usize),
    Player { target: Target, action: PlayerAction },
    AddPlayer,
    AddFiles { target: Target, paths: Vec<PathBuf> },
    PlayAll,
    PauseAll,
    ToggleAll,
    SkipAll(f64),
    AdjustAllSpeeds(f32),
    ApplyGlobalSpeed(f32),
    SyncAll,
    ShuffleAll,
    ClearAll { confirmed: bool },
    Export { dir: PathBuf },
    Import { path: PathBuf },
}

impl Command {
    pub fn active(action: PlayerAction) -> Self {
        Self::Player {
            target: Target::Active,
            action,
        }
    }
}

#[derive(Debug)]
pub enum CommandOutcome {
    Done,
    Ignored,
    Player(PlayerId),
    Play(PlayOutcome),
    Count(usize),
    Speed(f32),
    Added(IntakeReport),
    Info(Option<VideoInfo>),
    Exported(PathBuf),
    Imported(ImportSummary),
}

impl<S: StatusSink> PlayerCoordinator<S> {
    pub fn execute(&mut self, command: Command) -> Result<CommandOutcome> {
        tracing::debug!(?command, "execute");
        match command {
            Command::Activate(slot) => Ok(self
                .activate_slot(slot)
                .map_or(CommandOutcome::Ignored, CommandOutcome::Player)),
            Command::Player { target, action } => self.execute_on(target, action),
            Command::AddPlayer => self.add_player().map(CommandOutcome::Player),
            Command::AddFiles { target, paths } => {
                let files = library::pick_paths(&paths);
                let report = match target {
                    Target::Active => self.add_files_to_active(files)?,
                    Target::Player(id) => self.add_files(id, files)?,
                };
                Ok(CommandOutcome::Added(report))
            }
            Command::PlayAll => Ok(CommandOutcome::Count(self.play_all())),
            Command::PauseAll => Ok(CommandOutcome::Count(self.pause_all())),
            Command::ToggleAll => {
                self.toggle_all();
                Ok(CommandOutcome::Done)
            }
            Command::SkipAll(delta) => Ok(CommandOutcome::Count(self.skip_all(delta))),
            Command::AdjustAllSpeeds(delta) => {
                self.adjust_all_speeds(delta);
                Ok(CommandOutcome::Done)
            }
            Command::ApplyGlobalSpeed(rate) => Ok(CommandOutcome::Speed(self.apply_global_speed(rate))),
            Command::SyncAll => self.sync_all().map(CommandOutcome::Count),
            Command::ShuffleAll => Ok(CommandOutcome::Count(self.shuffle_all())),
            Command::ClearAll { confirmed } => {
                if self.clear_all(|_| confirmed) {
                    Ok(CommandOutcome::Done)
                } else {
                    Err(WallError::ConfirmationRequired("Clearing all playlists"))
                }
            }
            Command::Export { dir } => self.export_to(&dir).map(CommandOutcome::Exported),
            Command::Import { path } => self.import_from(&path).map(CommandOutcome::Imported),
        }
    }

    fn execute_on(&mut self, target: Target, action: PlayerAction) -> Result<CommandOutcome> {
        let id = match target {
            Target::Player(id) => id,
            Target::Active => self.active_id().ok_or(WallError::NoActivePlayer)?,
        };
        if action == PlayerAction::Remove {
            return self.remove_player(id).map(|()| CommandOutcome::Done);
        }

        self.with_player(id, |player, engine| match action {
            PlayerAction::TogglePlay => CommandOutcome::Play(player.toggle_play_pause()),
            PlayerAction::Skip(delta) => {
                player.skip_seconds(delta);
                CommandOutcome::Done
            }
            PlayerAction::Restart => {
                player.restart();
                CommandOutcome::Done
            }
            PlayerAction::SetSpeed(rate) => CommandOutcome::Speed(player.set_speed(rate)),
            PlayerAction::AdjustSpeed(delta) => CommandOutcome::Speed(player.adjust_speed(delta)),
            PlayerAction::ToggleMute => {
                player.toggle_mute();
                CommandOutcome::Done
            }
            PlayerAction::ToggleFullscreen => {
                player.toggle_fullscreen();
                CommandOutcome::Done
            }
            PlayerAction::Next => {
                player.next(engine);
                CommandOutcome::Done
            }
            PlayerAction::Previous => {
                player.previous(engine);
                CommandOutcome::Done
            }
            PlayerAction::ToggleShuffle => {
                player.toggle_shuffle();
                CommandOutcome::Done
            }
            PlayerAction::Select(index) => {
                if player.select(index, engine) {
                    CommandOutcome::Done
                } else {
                    CommandOutcome::Ignored
                }
            }
            PlayerAction::Info => CommandOutcome::Info(player.video_info()),
            PlayerAction::Remove => CommandOutcome::Ignored,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::ScriptedMediaEngine;
    use crate::model::VideoFile;
    use crate::status::StatusBoard;
    use std::fs;
    use tempfile::tempdir;

    fn wall() -> (PlayerCoordinator<StatusBoard>, ScriptedMediaEngine) {
        let engine = ScriptedMediaEngine::new();
        let script = engine.clone();
        (
            PlayerCoordinator::new(Box::new(engine), StatusBoard::new()),
            script,
        )
    }

    #[test]
    fn add_files_walks_paths_into_the_active_player() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("a.mp4"), vec![0_u8; 4_096]).expect("write");
        fs::write(dir.path().join("b.txt"), b"notes").expect("write");
        let (mut wall, script) = wall();

        let outcome = wall
            .execute(Command::AddFiles {
                target: Target::Active,
                paths: vec![dir.path().to_path_buf()],
            })
            .expect("add");

        assert!(matches!(outcome, CommandOutcome::Added(ref report) if report.accepted == 1));
        assert_eq!(script.opened(), vec!["a.mp4"]);
    }

    #[test]
    fn active_actions_follow_the_active_player() {
        let (mut wall, _) = wall();
        wall.add_files(
            PlayerId(1),
            vec![VideoFile::in_memory("a.mp4", "video/mp4", vec![0_u8; 2_048])],
        )
        .expect("intake");
        let second = wall.execute(Command::AddPlayer).expect("add player");
        assert!(matches!(second, CommandOutcome::Player(PlayerId(2))));

        wall.execute(Command::Activate(1)).expect("activate");
        let outcome = wall
            .execute(Command::active(PlayerAction::TogglePlay))
            .expect("toggle");
        assert!(matches!(outcome, CommandOutcome::Play(PlayOutcome::Playing)));
        assert!(wall.player(PlayerId(1)).expect("one").is_playing());
    }

    #[test]
    fn remove_through_command_respects_floor() {
        let (mut wall, _) = wall();
        let err = wall
            .execute(Command::active(PlayerAction::Remove))
            .expect_err("floor");
        assert!(matches!(err, WallError::LastPlayer));
    }

    #[test]
    fn unconfirmed_clear_is_refused() {
        let (mut wall, _) = wall();
        let err = wall
            .execute(Command::ClearAll { confirmed: false })
            .expect_err("needs confirmation");
        assert!(matches!(err, WallError::ConfirmationRequired(_)));
    }

    #[test]
    fn export_then_import_reports_contents() {
        let dir = tempdir().expect("tempdir");
        let (mut wall, _) = wall();
        wall.add_files(
            PlayerId(1),
            vec![VideoFile::in_memory("a.mp4", "video/mp4", vec![0_u8; 2_048])],
        )
        .expect("intake");

        let CommandOutcome::Exported(path) = wall
            .execute(Command::Export {
                dir: dir.path().to_path_buf(),
            })
            .expect("export")
        else {
            panic!("expected export outcome");
        };
        let CommandOutcome::Imported(summary) = wall
            .execute(Command::Import { path })
            .expect("import")
        else {
            panic!("expected import outcome");
        };
        assert_eq!((summary.players, summary.files), (1, 1));
    }
}
