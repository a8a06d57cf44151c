//! Playlist export and import.
//!
//! Exports carry metadata only (name, size and MIME type per file), so an
//! import can describe a wall but never rebind its files.

use crate::error::{Result, WallError};
use crate::model::PlayerId;
use crate::player::Player;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub players: Vec<ExportedPlayer>,
    pub export_date: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedPlayer {
    pub id: PlayerId,
    #[serde(default)]
    pub playlist: Vec<ExportedFile>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedFile {
    pub name: String,
    #[serde(alias = "size")]
    pub size_bytes: u64,
    #[serde(alias = "type", default)]
    pub mime_type: String,
}

impl ExportDocument {
    pub fn capture(players: &[Player], at: OffsetDateTime) -> Result<Self> {
        let export_date = at
            .format(&Rfc3339)
            .map_err(|err| WallError::Export(err.to_string()))?;
        let players = players
            .iter()
            .map(|player| ExportedPlayer {
                id: player.id(),
                playlist: player
                    .playlist()
                    .iter()
                    .map(|file| ExportedFile {
                        name: file.name.clone(),
                        size_bytes: file.size_bytes,
                        mime_type: file.mime_type.clone(),
                    })
                    .collect(),
            })
            .collect();
        Ok(Self {
            players,
            export_date,
        })
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|err| WallError::Export(err.to_string()))
    }

    /// `video-playlist-YYYY-MM-DD.json`, dated by the export timestamp.
    pub fn file_name(&self) -> String {
        let date = self
            .export_date
            .split('T')
            .next()
            .filter(|date| !date.is_empty())
            .unwrap_or("undated");
        format!("video-playlist-{date}.json")
    }

    pub fn exported_at(&self) -> Option<OffsetDateTime> {
        OffsetDateTime::parse(&self.export_date, &Rfc3339).ok()
    }

    pub fn file_count(&self) -> usize {
        self.players.iter().map(|player| player.playlist.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSummary {
    pub players: usize,
    pub files: usize,
    pub per_player: Vec<(PlayerId, usize)>,
    pub export_date: String,
}

impl ImportSummary {
    pub fn of(document: &ExportDocument) -> Self {
        Self {
            players: document.players.len(),
            files: document.file_count(),
            per_player: document
                .players
                .iter()
                .map(|player| (player.id, player.playlist.len()))
                .collect(),
            export_date: document.export_date.clone(),
        }
    }

    pub fn message(&self) -> String {
        let mut message = String::from(
            "Playlist structure imported! You'll need to reload the actual video files.\n",
        );
        for (player, count) in &self.per_player {
            message.push_str(&format!("\nPlayer {player}: {count} video(s)"));
        }
        message.push_str(&format!("\n\nExported: {}", self.export_date));
        message
    }
}

pub fn write_export(document: &ExportDocument, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(document.file_name());
    fs::write(&path, document.to_json()?)?;
    tracing::info!(path = %path.display(), files = document.file_count(), "playlist exported");
    Ok(path)
}

pub fn read_import(path: &Path) -> Result<ExportDocument> {
    let raw = fs::read_to_string(path)?;
    ExportDocument::from_json(&raw)
}
