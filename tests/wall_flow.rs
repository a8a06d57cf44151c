use proptest::prelude::*;
use std::fs;
use std::time::Duration;
use tempfile::tempdir;
use vidwall::command::{Command, CommandOutcome, PlayerAction, Target};
use vidwall::coordinator::PlayerCoordinator;
use vidwall::error::WallError;
use vidwall::media::{MediaErrorCode, PlayPolicy, ScriptedMediaEngine};
use vidwall::model::{MAX_PLAYERS, PlayerId, ProblemReason, VideoFile};
use vidwall::status::StatusBoard;

type Wall = PlayerCoordinator<StatusBoard>;

fn wall() -> (Wall, ScriptedMediaEngine) {
    let engine = ScriptedMediaEngine::new();
    let script = engine.clone();
    (
        PlayerCoordinator::new(Box::new(engine), StatusBoard::new()),
        script,
    )
}

fn clip(name: &str, size: usize) -> VideoFile {
    VideoFile::in_memory(name, "video/mp4", vec![0_u8; size])
}

#[test]
fn corrupted_file_is_rejected_and_the_rest_is_kept() {
    let (mut wall, _) = wall();
    let report = wall
        .add_files(PlayerId(1), vec![clip("x.mp4", 0), clip("y.mp4", 2_048)])
        .expect("one file survives");

    let player = wall.player(PlayerId(1)).expect("player");
    let names: Vec<&str> = player.playlist().iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["y.mp4"]);
    assert_eq!(report.problems.len(), 1);
    assert_eq!(report.problems[0].name, "x.mp4");
    assert_eq!(report.problems[0].reason, ProblemReason::Empty);
}

#[test]
fn all_bad_batch_reports_problems_and_no_valid_files() {
    let (mut wall, _) = wall();
    let err = wall
        .add_files(PlayerId(1), vec![clip("x.mp4", 0), clip("z.mp4", 100)])
        .expect_err("nothing valid");
    assert!(matches!(err, WallError::NoValidFiles { .. }));

    let board = wall.sink();
    assert_eq!(board.pending_alerts(), 2);
    assert!(
        board
            .current_alert()
            .expect("problem report")
            .starts_with("PROBLEMATIC FILES FOUND in Player 1")
    );
}

#[test]
fn tenth_player_is_refused() {
    let (mut wall, _) = wall();
    while wall.len() < MAX_PLAYERS {
        wall.add_player().expect("room left");
    }
    let before = wall.active_id();
    let err = wall.add_player().expect_err("full");
    assert!(matches!(err, WallError::Capacity));
    assert_eq!(wall.len(), MAX_PLAYERS);
    assert_eq!(wall.active_id(), before);
}

#[test]
fn sync_clamps_to_each_players_duration() {
    let (mut wall, script) = wall();
    script.set_duration("long.mp4", Some(Duration::from_secs(120)));
    script.set_duration("short.mp4", Some(Duration::from_secs(30)));
    let second = wall.add_player().expect("second");
    wall.add_files(PlayerId(1), vec![clip("long.mp4", 4_096)])
        .expect("long");
    wall.add_files(second, vec![clip("short.mp4", 4_096)])
        .expect("short");

    wall.set_active(PlayerId(1)).expect("activate");
    wall.with_active(|player, _| player.skip_seconds(45.0))
        .expect("skip");
    wall.execute(Command::SyncAll).expect("sync");

    let short = wall.player(second).expect("second");
    assert_eq!(short.position(), Duration::from_secs(30));
}

#[test]
fn playlist_end_advances_and_wraps() {
    let (mut wall, script) = wall();
    wall.add_files(
        PlayerId(1),
        vec![clip("a.mp4", 2_048), clip("b.mp4", 2_048)],
    )
    .expect("intake");
    wall.execute(Command::active(PlayerAction::TogglePlay))
        .expect("play");

    script.finish("a.mp4");
    wall.tick();
    assert_eq!(wall.player(PlayerId(1)).expect("p").current_index(), Some(1));

    script.finish("b.mp4");
    wall.tick();
    let player = wall.player(PlayerId(1)).expect("p");
    assert_eq!(player.current_index(), Some(0));
    assert!(player.is_playing());
}

#[test]
fn decode_failure_is_reported_without_retry() {
    let (mut wall, script) = wall();
    script.fail_file("broken.mp4", MediaErrorCode::Decode);
    wall.add_files(PlayerId(1), vec![clip("broken.mp4", 2_048)])
        .expect("intake");
    wall.tick();
    wall.tick();

    assert_eq!(script.opened(), vec!["broken.mp4"]);
    let alert = wall.sink().current_alert().expect("error report");
    assert!(alert.contains("VIDEO PLAYBACK ERROR - Player 1"));
    assert!(alert.contains("Video decode error - file may be corrupted"));
}

#[test]
fn autoplay_block_falls_back_to_muted_play_all() {
    let (mut wall, script) = wall();
    script.set_play_policy(PlayPolicy::RequireMuted);
    let second = wall.add_player().expect("second");
    wall.add_files(PlayerId(1), vec![clip("a.mp4", 2_048)])
        .expect("one");
    wall.add_files(second, vec![clip("b.mp4", 2_048)])
        .expect("two");

    let outcome = wall.execute(Command::PlayAll).expect("play all");
    assert!(matches!(outcome, CommandOutcome::Count(2)));
    assert!(wall.players().iter().all(|player| player.is_output_muted()));
}

#[test]
fn non_finite_skips_leave_positions_alone() {
    let (mut wall, _) = wall();
    wall.add_files(PlayerId(1), vec![clip("a.mp4", 2_048)])
        .expect("intake");
    wall.execute(Command::active(PlayerAction::Skip(12.0)))
        .expect("skip");

    wall.execute(Command::active(PlayerAction::Skip(f64::NAN)))
        .expect("nan skip");
    wall.execute(Command::SkipAll(f64::INFINITY))
        .expect("infinite skip");
    assert_eq!(
        wall.player(PlayerId(1)).expect("p").position(),
        Duration::from_secs(12)
    );
}

#[test]
fn folder_intake_and_export_round_trip() {
    let media = tempdir().expect("media dir");
    fs::write(media.path().join("one.mp4"), vec![0_u8; 2_048]).expect("one");
    fs::write(media.path().join("two.mkv"), vec![0_u8; 3_072]).expect("two");
    fs::write(media.path().join("empty.mov"), Vec::<u8>::new()).expect("empty");
    let exports = tempdir().expect("export dir");
    let (mut wall, _) = wall();

    let outcome = wall
        .execute(Command::AddFiles {
            target: Target::Player(PlayerId(1)),
            paths: vec![media.path().to_path_buf()],
        })
        .expect("intake");
    let CommandOutcome::Added(report) = outcome else {
        panic!("expected intake report");
    };
    assert_eq!(report.accepted, 2);
    assert_eq!(report.problems.len(), 1);

    let path = wall.export_to(exports.path()).expect("export");
    let raw = fs::read_to_string(&path).expect("read export");
    assert!(raw.contains("\"sizeBytes\": 3072"));

    let summary = wall.import_from(&path).expect("import");
    assert_eq!((summary.players, summary.files), (1, 2));
}

#[derive(Debug, Clone)]
enum Op {
    Add,
    Remove(u32),
    Activate(u32),
    Intake(u16),
    Next,
    Previous,
    Shuffle,
    Finish,
    Clear,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Add),
        (1_u32..12).prop_map(Op::Remove),
        (1_u32..12).prop_map(Op::Activate),
        (0_u16..4_096).prop_map(Op::Intake),
        Just(Op::Next),
        Just(Op::Previous),
        Just(Op::Shuffle),
        Just(Op::Finish),
        Just(Op::Clear),
    ]
}

proptest! {
    #[test]
    fn invariants_hold_under_random_commands(ops in proptest::collection::vec(op(), 0..60)) {
        let (mut wall, script) = wall();
        for (step, op) in ops.into_iter().enumerate() {
            match op {
                Op::Add => { let _ = wall.add_player(); }
                Op::Remove(id) => { let _ = wall.remove_player(PlayerId(id)); }
                Op::Activate(id) => { let _ = wall.set_active(PlayerId(id)); }
                Op::Intake(size) => {
                    let file = clip(&format!("clip_{step}.mp4"), usize::from(size));
                    let _ = wall.add_files_to_active(vec![file]);
                }
                Op::Next => { let _ = wall.with_active(|p, e| p.next(e)); }
                Op::Previous => { let _ = wall.with_active(|p, e| p.previous(e)); }
                Op::Shuffle => { let _ = wall.with_active(|p, _| p.toggle_shuffle()); }
                Op::Finish => {
                    for name in script.live() {
                        script.finish(&name);
                    }
                }
                Op::Clear => { wall.clear_all(|_| true); }
            }
            wall.tick();

            prop_assert!((1..=MAX_PLAYERS).contains(&wall.len()));
            let active = wall.active_id().expect("active player");
            prop_assert!(wall.player(active).is_some());
            let loaded = wall.players().iter().filter(|p| p.is_loaded()).count();
            prop_assert_eq!(script.live().len(), loaded);
            for player in wall.players() {
                if let Some(index) = player.current_index() {
                    prop_assert!(index < player.playlist().len());
                }
            }
        }
    }
}
