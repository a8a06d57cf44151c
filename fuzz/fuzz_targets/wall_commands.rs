#![no_main]

use libfuzzer_sys::fuzz_target;
use std::time::Duration;
use vidwall::coordinator::PlayerCoordinator;
use vidwall::media::ScriptedMediaEngine;
use vidwall::model::{MAX_PLAYERS, PlayerId, VideoFile};
use vidwall::status::StatusBoard;

fuzz_target!(|data: &[u8]| {
    let engine = ScriptedMediaEngine::new();
    let script = engine.clone();
    let mut wall = PlayerCoordinator::new(Box::new(engine), StatusBoard::new());

    for (step, byte) in data.iter().enumerate() {
        let target = PlayerId(u32::from(byte >> 4) + 1);
        match byte % 12 {
            0 => {
                let _ = wall.add_player();
            }
            1 => {
                let _ = wall.remove_player(target);
            }
            2 => {
                let _ = wall.set_active(target);
            }
            3 => {
                let size = usize::from(*byte) * 16;
                let file = VideoFile::in_memory(format!("clip_{step}.mp4"), "video/mp4", vec![0_u8; size]);
                let _ = wall.add_files_to_active(vec![file]);
            }
            4 => {
                let _ = wall.with_active(|player, engine| player.next(engine));
            }
            5 => {
                let _ = wall.with_active(|player, engine| player.previous(engine));
            }
            6 => {
                let _ = wall.with_active(|player, _| player.toggle_shuffle());
            }
            7 => {
                wall.toggle_all();
            }
            8 => {
                let _ = wall.sync_all();
            }
            9 => {
                let _ = wall.clear_all(|_| byte & 1 == 0);
            }
            10 => {
                for name in script.playing() {
                    script.finish(&name);
                }
            }
            _ => script.advance(Duration::from_millis(u64::from(*byte) * 100)),
        }
        wall.tick();

        assert!((1..=MAX_PLAYERS).contains(&wall.len()));
        let active = wall.active_id().expect("an active player");
        assert!(wall.player(active).is_some());
        for player in wall.players() {
            if let Some(index) = player.current_index() {
                assert!(index < player.playlist().len());
            }
        }
    }
});
