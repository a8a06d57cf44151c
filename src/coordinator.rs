//! The wall: owns every player, the media engine and the status sink.
//!
//! Exactly one player is active once construction finishes. Players report
//! upward over a channel; [`PlayerCoordinator::settle`] drains it, forwards
//! user feedback to the sink and rebuilds the master playlist when any
//! player's playlist moved.

use crate::error::{Result, WallError};
use crate::export::{ExportDocument, ImportSummary};
use crate::media::MediaEngine;
use crate::model::{
    FileProblem, MAX_PLAYERS, MasterEntry, PerformanceEstimate, PlayerId, VideoFile, clamp_speed,
};
use crate::player::{IntakeReport, NOTICE_BRIEF, NOTICE_DEFAULT, NOTICE_LONG, Player};
use crate::status::StatusSink;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    Notice {
        player: PlayerId,
        text: String,
        duration: Duration,
    },
    Problems {
        player: PlayerId,
        problems: Vec<FileProblem>,
    },
    Error {
        player: PlayerId,
        message: String,
    },
    PlaylistChanged(PlayerId),
}

/// A player's handle back to whoever owns it.
#[derive(Debug, Clone)]
pub struct CoordinatorLink {
    player: PlayerId,
    sender: Sender<PlayerEvent>,
}

impl CoordinatorLink {
    pub fn new(player: PlayerId, sender: Sender<PlayerEvent>) -> Self {
        Self { player, sender }
    }

    /// A link with its own receiving end, for driving a player standalone.
    pub fn channel(player: PlayerId) -> (Self, Receiver<PlayerEvent>) {
        let (sender, receiver) = mpsc::channel();
        (Self::new(player, sender), receiver)
    }

    pub fn notice(&self, text: impl Into<String>, duration: Duration) {
        self.send(PlayerEvent::Notice {
            player: self.player,
            text: text.into(),
            duration,
        });
    }

    pub fn problems(&self, problems: Vec<FileProblem>) {
        self.send(PlayerEvent::Problems {
            player: self.player,
            problems,
        });
    }

    pub fn error(&self, message: impl Into<String>) {
        self.send(PlayerEvent::Error {
            player: self.player,
            message: message.into(),
        });
    }

    pub fn playlist_changed(&self) {
        self.send(PlayerEvent::PlaylistChanged(self.player));
    }

    fn send(&self, event: PlayerEvent) {
        // The coordinator is gone during teardown; nothing left to tell.
        let _ = self.sender.send(event);
    }
}

pub struct PlayerCoordinator<S: StatusSink> {
    players: Vec<Player>,
    active: Option<PlayerId>,
    next_id: u32,
    engine: Box<dyn MediaEngine>,
    sender: Sender<PlayerEvent>,
    events: Receiver<PlayerEvent>,
    sink: S,
    master_playlist: Vec<MasterEntry>,
}

impl<S: StatusSink> PlayerCoordinator<S> {
    /// Builds the wall with its first player already active.
    pub fn new(engine: Box<dyn MediaEngine>, sink: S) -> Self {
        let (sender, events) = mpsc::channel();
        let mut coordinator = Self {
            players: Vec::with_capacity(MAX_PLAYERS),
            active: None,
            next_id: 1,
            engine,
            sender,
            events,
            sink,
            master_playlist: Vec::new(),
        };
        coordinator.spawn_player();
        coordinator.settle();
        coordinator
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|player| player.id() == id)
    }

    pub fn active_id(&self) -> Option<PlayerId> {
        self.active
    }

    pub fn active(&self) -> Option<&Player> {
        self.active.and_then(|id| self.player(id))
    }

    pub fn is_active(&self, id: PlayerId) -> bool {
        self.active == Some(id)
    }

    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn master_playlist(&self) -> &[MasterEntry] {
        &self.master_playlist
    }

    pub fn performance(&self) -> PerformanceEstimate {
        let active_videos = self.players.iter().filter(|p| p.is_playing()).count();
        let queued = self.players.iter().map(|p| p.playlist().len()).sum();
        PerformanceEstimate::estimate(self.players.len(), active_videos, queued)
    }

    pub fn add_player(&mut self) -> Result<PlayerId> {
        if self.players.len() >= MAX_PLAYERS {
            return Err(self.refuse(WallError::Capacity));
        }
        let id = self.spawn_player();
        self.settle();
        Ok(id)
    }

    fn spawn_player(&mut self) -> PlayerId {
        let id = PlayerId(self.next_id);
        self.next_id += 1;
        let link = CoordinatorLink::new(id, self.sender.clone());
        self.players.push(Player::new(id, link));
        tracing::info!(player = %id, total = self.players.len(), "player added");
        self.activate(id);
        id
    }

    pub fn remove_player(&mut self, id: PlayerId) -> Result<()> {
        if self.players.len() <= 1 {
            return Err(self.refuse(WallError::LastPlayer));
        }
        let Some(position) = self.players.iter().position(|player| player.id() == id) else {
            return Err(self.refuse(WallError::UnknownPlayer(id)));
        };

        self.players.remove(position).destroy();
        tracing::info!(player = %id, total = self.players.len(), "player removed");

        if self.active == Some(id) {
            let first = self.players[0].id();
            self.activate(first);
        }
        self.settle();
        self.sink.forget(id);
        self.sink
            .notify(None, &format!("Player {id} removed"), NOTICE_DEFAULT);
        self.refresh_master_playlist();
        Ok(())
    }

    pub fn set_active(&mut self, id: PlayerId) -> Result<()> {
        if self.player(id).is_none() {
            return Err(self.refuse(WallError::UnknownPlayer(id)));
        }
        self.activate(id);
        self.settle();
        Ok(())
    }

    /// Activates the player shown in the 1-based slot, as the digit keys do.
    pub fn activate_slot(&mut self, slot: usize) -> Option<PlayerId> {
        let id = self.players.get(slot.checked_sub(1)?)?.id();
        self.activate(id);
        self.settle();
        Some(id)
    }

    fn activate(&mut self, id: PlayerId) {
        self.active = Some(id);
        if let Some(player) = self.player(id) {
            player.announce_active();
        }
    }

    /// Runs `action` against one player with the shared engine, then settles.
    pub fn with_player<T>(
        &mut self,
        id: PlayerId,
        action: impl FnOnce(&mut Player, &mut dyn MediaEngine) -> T,
    ) -> Result<T> {
        let Some(player) = self.players.iter_mut().find(|player| player.id() == id) else {
            return Err(self.refuse(WallError::UnknownPlayer(id)));
        };
        let value = action(player, self.engine.as_mut());
        self.settle();
        Ok(value)
    }

    pub fn with_active<T>(
        &mut self,
        action: impl FnOnce(&mut Player, &mut dyn MediaEngine) -> T,
    ) -> Result<T> {
        let Some(id) = self.active else {
            return Err(self.refuse(WallError::NoActivePlayer));
        };
        self.with_player(id, action)
    }

    pub fn add_files(&mut self, id: PlayerId, files: Vec<VideoFile>) -> Result<IntakeReport> {
        self.with_player(id, |player, engine| player.validate_and_add_files(files, engine))?
    }

    pub fn add_files_to_active(&mut self, files: Vec<VideoFile>) -> Result<IntakeReport> {
        let Some(id) = self.active else {
            return Err(self.refuse(WallError::NoActivePlayer));
        };
        self.add_files(id, files)
    }

    /// Starts every loaded player. Returns how many are playing afterwards.
    pub fn play_all(&mut self) -> usize {
        let started = self
            .players
            .iter_mut()
            .filter(|player| player.is_loaded())
            .map(|player| player.play())
            .filter(|outcome| outcome.is_playing())
            .count();
        tracing::info!(started, "play all");
        self.sink
            .notify(None, &format!("Playing {started} video(s)"), NOTICE_DEFAULT);
        self.settle();
        started
    }

    pub fn pause_all(&mut self) -> usize {
        let paused = self
            .players
            .iter_mut()
            .map(|player| player.pause())
            .filter(|changed| *changed)
            .count();
        self.sink.notify(None, "All paused", NOTICE_BRIEF);
        self.settle();
        paused
    }

    /// Pauses everything if anything is playing, otherwise plays everything.
    pub fn toggle_all(&mut self) -> bool {
        if self.players.iter().any(Player::is_playing) {
            self.pause_all();
            false
        } else {
            self.play_all() > 0
        }
    }

    pub fn skip_all(&mut self, delta: f64) -> usize {
        if !delta.is_finite() {
            return 0;
        }
        let moved = self
            .players
            .iter_mut()
            .map(|player| player.skip_seconds(delta))
            .filter(|moved| *moved)
            .count();
        let sign = if delta >= 0.0 { "+" } else { "-" };
        self.sink
            .notify(None, &format!("All players {sign}{}s", delta.abs()), NOTICE_BRIEF);
        self.settle();
        moved
    }

    pub fn adjust_all_speeds(&mut self, delta: f32) {
        for player in &mut self.players {
            player.adjust_speed(delta);
        }
        self.sink.notify(None, "All speeds adjusted", NOTICE_BRIEF);
        self.settle();
    }

    pub fn apply_global_speed(&mut self, rate: f32) -> f32 {
        let rate = clamp_speed(rate);
        for player in &mut self.players {
            player.set_speed(rate);
        }
        self.sink.notify(
            None,
            &format!("All speeds set to {}", crate::format::format_speed(rate)),
            NOTICE_DEFAULT,
        );
        self.settle();
        rate
    }

    /// Aligns every other player with a known duration to the active
    /// player's position and speed. Returns how many players were moved.
    pub fn sync_all(&mut self) -> Result<usize> {
        let Some(active) = self.active() else {
            return Err(self.refuse(WallError::NoActivePlayer));
        };
        let (active_id, position, rate) = (active.id(), active.position(), active.speed());
        if active.duration().is_none() {
            return Err(self.refuse(WallError::NothingLoaded(active_id)));
        }

        let synced = self
            .players
            .iter_mut()
            .filter(|player| player.id() != active_id)
            .map(|player| player.sync_to(position, rate))
            .filter(|synced| *synced)
            .count();
        tracing::info!(leader = %active_id, synced, "players synced");
        self.sink.notify(
            None,
            "All players synced!",
            NOTICE_DEFAULT,
        );
        self.settle();
        Ok(synced)
    }

    /// Toggles shuffle on every player that has something queued.
    pub fn shuffle_all(&mut self) -> usize {
        let mut toggled = 0;
        for player in &mut self.players {
            if player.playlist().is_empty() {
                continue;
            }
            player.toggle_shuffle();
            toggled += 1;
        }
        self.sink.notify(
            None,
            &format!("Shuffle toggled for {toggled} player(s)"),
            NOTICE_DEFAULT,
        );
        self.settle();
        toggled
    }

    /// Empties every playlist after `confirm` accepts the prompt.
    pub fn clear_all(&mut self, confirm: impl FnOnce(&str) -> bool) -> bool {
        if !confirm("Clear all playlists? This cannot be undone.") {
            return false;
        }
        for player in &mut self.players {
            player.clear();
        }
        tracing::info!(players = self.players.len(), "all playlists cleared");
        self.sink.notify(None, "All playlists cleared", NOTICE_DEFAULT);
        self.settle();
        true
    }

    pub fn export_document(&self) -> Result<ExportDocument> {
        ExportDocument::capture(&self.players, time::OffsetDateTime::now_utc())
    }

    /// Writes the wall's playlists to `dir` and returns the written path.
    pub fn export_to(&mut self, dir: &Path) -> Result<PathBuf> {
        let written = self
            .export_document()
            .and_then(|document| crate::export::write_export(&document, dir));
        match written {
            Ok(path) => {
                self.sink.notify(
                    None,
                    &format!("Playlist exported to {}", path.display()),
                    NOTICE_LONG,
                );
                Ok(path)
            }
            Err(err) => Err(self.refuse(err)),
        }
    }

    /// Reads an exported document. Files cannot be re-bound from names alone,
    /// so this only reports what the document holds.
    pub fn import_from(&mut self, path: &Path) -> Result<ImportSummary> {
        match crate::export::read_import(path) {
            Ok(document) => {
                let summary = ImportSummary::of(&document);
                tracing::info!(path = %path.display(), players = summary.players, "playlist imported");
                self.sink.report_error(&summary.message());
                Ok(summary)
            }
            Err(err) => Err(self.refuse(err)),
        }
    }

    /// Drives media notifications for every player.
    pub fn tick(&mut self) {
        for player in &mut self.players {
            player.tick(self.engine.as_mut());
        }
        self.settle();
    }

    /// Forwards queued player feedback to the sink.
    pub fn settle(&mut self) {
        let mut playlists_changed = false;
        while let Ok(event) = self.events.try_recv() {
            match event {
                PlayerEvent::Notice {
                    player,
                    text,
                    duration,
                } => self.sink.notify(Some(player), &text, duration),
                PlayerEvent::Problems { player, problems } => {
                    self.sink.report_problems(player, &problems);
                }
                PlayerEvent::Error { message, .. } => self.sink.report_error(&message),
                PlayerEvent::PlaylistChanged(_) => playlists_changed = true,
            }
        }
        if playlists_changed {
            self.refresh_master_playlist();
        }
    }

    fn refresh_master_playlist(&mut self) {
        self.master_playlist = build_master_playlist(&self.players);
    }

    fn refuse(&mut self, err: WallError) -> WallError {
        tracing::warn!(%err, "request refused");
        self.sink.report_error(&err.to_string());
        err
    }
}

/// Every video across players, first occurrence of each (name, size) wins.
pub fn build_master_playlist(players: &[Player]) -> Vec<MasterEntry> {
    let mut seen = HashSet::new();
    let mut entries = Vec::new();
    for player in players {
        for file in player.playlist() {
            if seen.insert(file.key()) {
                entries.push(MasterEntry {
                    name: file.name.clone(),
                    size_bytes: file.size_bytes,
                    mime_type: file.mime_type.clone(),
                    player: player.id(),
                });
            }
        }
    }
    entries
}
