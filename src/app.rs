use crate::command::{Command, CommandOutcome, PlayerAction, Target};
use crate::config;
use crate::format::describe_video;
use crate::coordinator::PlayerCoordinator;
use crate::media::{ClockMediaEngine, MediaEngine, RodioMediaEngine};
use crate::model::{SPEED_PRESETS, Settings};
use crate::player::NOTICE_LONG;
use crate::status::{StatusBoard, StatusSink};
use crate::ui::ViewState;
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io::stdout;
use std::path::PathBuf;
use std::time::{Duration, Instant};

pub type Wall = PlayerCoordinator<StatusBoard>;

const HELP_TEXT: &str = "Commands: add <path> | speed <rate> | global <rate> | presets | export [dir] | import <file> | player | help";

#[derive(Debug, Clone, Default)]
pub struct AppStartupOptions {
    pub silent: bool,
    pub players: usize,
    pub paths: Vec<PathBuf>,
}

/// What a key press asks the loop to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Quit,
    Command(Command),
    EnterCommandMode,
    ConfirmClear,
}

pub fn run() -> Result<()> {
    run_with_startup(AppStartupOptions::default())
}

pub fn run_with_startup(options: AppStartupOptions) -> Result<()> {
    let settings = config::load_settings()?;
    if let Err(err) = config::init_logging(&settings) {
        eprintln!("logging disabled: {err:#}");
    }

    let mut wall = build_wall(&settings, &options);

    enable_raw_mode()?;
    let mut out = stdout();
    execute!(out, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(out);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let mut view = ViewState::default();
    let mut dirty = true;
    let mut last_draw = Instant::now();

    let result: Result<()> = loop {
        wall.tick();
        if wall.sink_mut().expire(Instant::now()) {
            dirty = true;
        }

        if dirty || last_draw.elapsed() > Duration::from_millis(250) {
            terminal.draw(|frame| crate::ui::draw(frame, &wall, &view))?;
            dirty = false;
            last_draw = Instant::now();
        }

        if !event::poll(Duration::from_millis(33))? {
            continue;
        }

        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        dirty = true;

        if wall.sink().current_alert().is_some() {
            if matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
                wall.sink_mut().dismiss_alert();
            }
            continue;
        }

        if view.confirm_clear {
            view.confirm_clear = false;
            let confirmed = matches!(key.code, KeyCode::Char('y') | KeyCode::Char('Y'));
            if confirmed {
                dispatch(&mut wall, Command::ClearAll { confirmed });
            } else {
                wall.sink_mut()
                    .notify(None, "Clear cancelled", Duration::from_millis(1_000));
            }
            continue;
        }

        if view.command_mode {
            match key.code {
                KeyCode::Esc => {
                    view.command_mode = false;
                    view.command_buffer.clear();
                }
                KeyCode::Enter => {
                    run_command(&mut wall, &settings, &view.command_buffer);
                    view.command_mode = false;
                    view.command_buffer.clear();
                }
                KeyCode::Backspace => {
                    view.command_buffer.pop();
                }
                KeyCode::Char(ch) => view.command_buffer.push(ch),
                _ => {}
            }
            continue;
        }

        match input_for_key(key, &settings) {
            Some(Input::Quit) => break Ok(()),
            Some(Input::Command(command)) => dispatch(&mut wall, command),
            Some(Input::EnterCommandMode) => view.command_mode = true,
            Some(Input::ConfirmClear) => view.confirm_clear = true,
            None => {}
        }
    };

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    drop(wall);
    tracing::info!("session ended");
    result
}

fn build_wall(settings: &Settings, options: &AppStartupOptions) -> Wall {
    let engine: Box<dyn MediaEngine> = if options.silent || settings.silent {
        Box::new(ClockMediaEngine::new())
    } else {
        match RodioMediaEngine::new() {
            Ok(engine) => Box::new(engine),
            Err(err) => {
                let reason = format!("{err:#}");
                tracing::warn!(%reason, "audio output unavailable, using silent clock");
                Box::new(ClockMediaEngine::new())
            }
        }
    };
    tracing::info!(engine = engine.name(), "session started");

    let mut wall = PlayerCoordinator::new(engine, StatusBoard::new());
    for _ in 1..options.players {
        if wall.add_player().is_err() {
            break;
        }
    }
    if !options.paths.is_empty() {
        let _ = wall.activate_slot(1);
        dispatch(
            &mut wall,
            Command::AddFiles {
                target: Target::Active,
                paths: options.paths.clone(),
            },
        );
    }
    wall
}

/// Failures are already on the status board; the log keeps the detail.
fn dispatch(wall: &mut Wall, command: Command) {
    match wall.execute(command) {
        Ok(CommandOutcome::Info(Some(info))) => notify(wall, &describe_video(&info)),
        Ok(_) => {}
        Err(err) => tracing::debug!(%err, "command failed"),
    }
}

pub fn input_for_key(key: KeyEvent, settings: &Settings) -> Option<Input> {
    let skip = f64::from(settings.skip_seconds);
    let step = settings.speed_step;
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    if ctrl {
        return match key.code {
            KeyCode::Char('c') | KeyCode::Char('q') => Some(Input::Quit),
            KeyCode::Char('a') => Some(Input::Command(Command::ToggleAll)),
            KeyCode::Char('n') => Some(Input::Command(Command::AddPlayer)),
            KeyCode::Right => Some(Input::Command(Command::SkipAll(skip))),
            KeyCode::Left => Some(Input::Command(Command::SkipAll(-skip))),
            KeyCode::Up => Some(Input::Command(Command::AdjustAllSpeeds(step))),
            KeyCode::Down => Some(Input::Command(Command::AdjustAllSpeeds(-step))),
            _ => None,
        };
    }

    let action = match key.code {
        KeyCode::Char(digit @ '1'..='9') => {
            let slot = digit.to_digit(10).map_or(1, |value| value as usize);
            return Some(Input::Command(Command::Activate(slot)));
        }
        KeyCode::Char(':') => return Some(Input::EnterCommandMode),
        KeyCode::Char('C') => return Some(Input::ConfirmClear),
        KeyCode::Char('P') => return Some(Input::Command(Command::PlayAll)),
        KeyCode::Char('Z') => return Some(Input::Command(Command::PauseAll)),
        KeyCode::Char('S') => return Some(Input::Command(Command::SyncAll)),
        KeyCode::Char('X') => return Some(Input::Command(Command::ShuffleAll)),
        KeyCode::Char(' ') => PlayerAction::TogglePlay,
        KeyCode::Right => PlayerAction::Skip(skip),
        KeyCode::Left => PlayerAction::Skip(-skip),
        KeyCode::Up => PlayerAction::AdjustSpeed(step),
        KeyCode::Down => PlayerAction::AdjustSpeed(-step),
        KeyCode::Char('r') => PlayerAction::Restart,
        KeyCode::Char('f') => PlayerAction::ToggleFullscreen,
        KeyCode::Char('m') => PlayerAction::ToggleMute,
        KeyCode::Char('n') => PlayerAction::Next,
        KeyCode::Char('p') => PlayerAction::Previous,
        KeyCode::Char('s') => PlayerAction::ToggleShuffle,
        KeyCode::Char('i') => PlayerAction::Info,
        KeyCode::Delete => PlayerAction::Remove,
        _ => return None,
    };
    Some(Input::Command(Command::active(action)))
}

fn run_command(wall: &mut Wall, settings: &Settings, raw: &str) {
    let input = raw.trim();
    if input.is_empty() {
        notify(wall, "No command");
        return;
    }

    let mut command_split = input.splitn(2, char::is_whitespace);
    let command = command_split.next().unwrap_or_default();
    let rest = command_split.next().unwrap_or("").trim();

    match command {
        "help" => notify(wall, HELP_TEXT),
        "add" => {
            if rest.is_empty() {
                notify(wall, "Usage: add <path>");
            } else {
                dispatch(
                    wall,
                    Command::AddFiles {
                        target: Target::Active,
                        paths: vec![config::normalize_path(&PathBuf::from(rest))],
                    },
                );
            }
        }
        "speed" | "global" => {
            let Ok(rate) = rest.trim_end_matches('x').parse::<f32>() else {
                notify(wall, "Usage: speed <rate> | global <rate>");
                return;
            };
            let command = if command == "speed" {
                Command::active(PlayerAction::SetSpeed(rate))
            } else {
                Command::ApplyGlobalSpeed(rate)
            };
            dispatch(wall, command);
        }
        "presets" => {
            let presets: Vec<String> = SPEED_PRESETS
                .iter()
                .map(|rate| crate::format::format_speed(*rate))
                .collect();
            notify(wall, &format!("Speed presets: {}", presets.join(" ")));
        }
        "export" => {
            let dir = if rest.is_empty() {
                config::default_export_dir(settings)
            } else {
                PathBuf::from(rest)
            };
            dispatch(wall, Command::Export { dir });
        }
        "import" => {
            if rest.is_empty() {
                notify(wall, "Usage: import <file>");
            } else {
                dispatch(
                    wall,
                    Command::Import {
                        path: PathBuf::from(rest),
                    },
                );
            }
        }
        "player" => dispatch(wall, Command::AddPlayer),
        _ => notify(wall, "Unknown command. Use :help"),
    }
}

fn notify(wall: &mut Wall, text: &str) {
    wall.sink_mut().notify(None, text, NOTICE_LONG);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::ScriptedMediaEngine;
    use crate::model::PlayerId;
    use std::fs;
    use tempfile::tempdir;

    fn wall() -> Wall {
        PlayerCoordinator::new(Box::new(ScriptedMediaEngine::new()), StatusBoard::new())
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::CONTROL)
    }

    #[test]
    fn digits_activate_slots_and_ctrl_keys_go_wall_wide() {
        let settings = Settings::default();
        assert_eq!(
            input_for_key(press(KeyCode::Char('3')), &settings),
            Some(Input::Command(Command::Activate(3)))
        );
        assert_eq!(
            input_for_key(ctrl(KeyCode::Right), &settings),
            Some(Input::Command(Command::SkipAll(10.0)))
        );
        assert_eq!(
            input_for_key(ctrl(KeyCode::Down), &settings),
            Some(Input::Command(Command::AdjustAllSpeeds(-0.25)))
        );
        assert_eq!(input_for_key(ctrl(KeyCode::Char('c')), &settings), Some(Input::Quit));
    }

    #[test]
    fn plain_keys_target_the_active_player() {
        let settings = Settings {
            skip_seconds: 5,
            ..Settings::default()
        };
        assert_eq!(
            input_for_key(press(KeyCode::Left), &settings),
            Some(Input::Command(Command::active(PlayerAction::Skip(-5.0))))
        );
        assert_eq!(
            input_for_key(press(KeyCode::Delete), &settings),
            Some(Input::Command(Command::active(PlayerAction::Remove)))
        );
        assert_eq!(input_for_key(press(KeyCode::Char('C')), &settings), Some(Input::ConfirmClear));
        assert_eq!(input_for_key(press(KeyCode::Char('z')), &settings), None);
    }

    #[test]
    fn add_command_loads_into_active_player() {
        let dir = tempdir().expect("tempdir");
        let clip = dir.path().join("clip.mp4");
        fs::write(&clip, vec![0_u8; 4_096]).expect("write");
        let mut wall = wall();

        run_command(&mut wall, &Settings::default(), &format!("add {}", clip.display()));

        let player = wall.player(PlayerId(1)).expect("player");
        assert_eq!(player.playlist().len(), 1);
        assert!(player.is_loaded());
    }

    #[test]
    fn speed_command_accepts_x_suffix() {
        let mut wall = wall();
        run_command(&mut wall, &Settings::default(), "speed 2.5x");
        assert_eq!(wall.player(PlayerId(1)).expect("player").speed(), 2.5);

        run_command(&mut wall, &Settings::default(), "global 0.1");
        assert_eq!(wall.player(PlayerId(1)).expect("player").speed(), 0.25);
    }

    #[test]
    fn unknown_command_leaves_a_hint() {
        let mut wall = wall();
        run_command(&mut wall, &Settings::default(), "dance");
        assert_eq!(
            wall.sink().notice(None, Instant::now()),
            Some("Unknown command. Use :help")
        );
    }

    #[test]
    fn startup_creates_requested_players_and_loads_paths() {
        let dir = tempdir().expect("tempdir");
        fs::write(dir.path().join("a.mp4"), vec![0_u8; 4_096]).expect("write");
        let options = AppStartupOptions {
            silent: true,
            players: 3,
            paths: vec![dir.path().to_path_buf()],
        };

        let wall = build_wall(&Settings::default(), &options);
        assert_eq!(wall.len(), 3);
        assert_eq!(wall.active_id(), Some(PlayerId(1)));
        assert_eq!(wall.player(PlayerId(1)).expect("first").playlist().len(), 1);
    }
}
