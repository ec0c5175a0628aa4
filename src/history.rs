//! History of completed runs.
//!
//! The pipeline only needs the [`HistoryStore`] trait. [`FsHistoryStore`]
//! keeps each entry as `<id>.json` (metadata, summary card, extracted text)
//! next to `<id>.wav` (the narration) in one directory. Both files are
//! written to a temp name first and renamed into place, so a crash never
//! leaves a half-written entry behind.

use crate::config::ExtractionStrategy;
use crate::error::NarrationError;
use crate::output::TextSource;
use crate::profile::{Goal, Language, RequestProfile, Tone};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// How the narrated text was obtained, as recorded in history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingMethod {
    Hybrid,
    Vision,
    Text,
    Rerun,
}

impl ProcessingMethod {
    pub fn from_run(source: TextSource, strategy: ExtractionStrategy) -> Self {
        match source {
            TextSource::TextFile => ProcessingMethod::Text,
            TextSource::Rerun => ProcessingMethod::Rerun,
            TextSource::Structured | TextSource::Vision => match strategy {
                ExtractionStrategy::Hybrid => ProcessingMethod::Hybrid,
                ExtractionStrategy::Vision => ProcessingMethod::Vision,
            },
        }
    }
}

/// The request settings a history entry was produced with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsSnapshot {
    pub summary_length: u32,
    pub tone: Tone,
    pub language: Language,
    pub goal: Goal,
    pub voice: String,
    pub processing_method: ProcessingMethod,
}

impl SettingsSnapshot {
    pub fn new(profile: &RequestProfile, processing_method: ProcessingMethod) -> Self {
        Self {
            summary_length: profile.target_minutes,
            tone: profile.tone,
            language: profile.language,
            goal: profile.goal.clone(),
            voice: profile.voice.clone(),
            processing_method,
        }
    }
}

/// What the pipeline hands to the store after a successful run.
#[derive(Debug, Clone)]
pub struct NewHistoryEntry {
    pub original_filename: String,
    pub formatted_summary: String,
    pub extracted_text: String,
    pub settings: SettingsSnapshot,
    pub audio: Vec<u8>,
    pub duration_secs: f64,
}

/// One saved run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub original_filename: String,
    pub formatted_summary: String,
    /// Omitted from listings unless asked for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_text: Option<String>,
    pub settings: SettingsSnapshot,
    pub duration_secs: f64,
    pub audio_bytes: usize,
}

/// Storage for completed runs.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Persist a run and return the stored entry (with text).
    async fn save(&self, entry: NewHistoryEntry) -> Result<HistoryEntry, NarrationError>;

    /// Entries newest first. `extracted_text` is `None` unless `include_text`.
    async fn list(
        &self,
        limit: usize,
        offset: usize,
        include_text: bool,
    ) -> Result<Vec<HistoryEntry>, NarrationError>;

    /// One entry, with text. `Ok(None)` when it does not exist.
    async fn get(&self, id: &str) -> Result<Option<HistoryEntry>, NarrationError>;

    async fn get_audio(&self, id: &str) -> Result<Option<Vec<u8>>, NarrationError>;

    /// `Ok(false)` when there was nothing to delete.
    async fn delete(&self, id: &str) -> Result<bool, NarrationError>;

    /// Delete every entry; returns how many were removed.
    async fn clear(&self) -> Result<usize, NarrationError>;

    /// Extracted text of an entry, for reruns.
    async fn get_text(&self, id: &str) -> Result<Option<String>, NarrationError> {
        Ok(self.get(id).await?.and_then(|e| e.extracted_text))
    }
}

/// Id format: `%Y%m%d_%H%M%S`, plus `_<n>` when several runs share a second.
static RE_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{8}_\d{6}(_\d+)?$").unwrap());

fn check_id(id: &str) -> Result<(), NarrationError> {
    if RE_ID.is_match(id) {
        Ok(())
    } else {
        Err(NarrationError::Validation(format!("invalid history id '{id}'")))
    }
}

fn persistence(detail: impl std::fmt::Display) -> NarrationError {
    NarrationError::Persistence {
        detail: detail.to_string(),
    }
}

/// Directory-backed [`HistoryStore`].
#[derive(Debug)]
pub struct FsHistoryStore {
    dir: PathBuf,
    /// Serialises id allocation.
    save_lock: Mutex<()>,
}

impl FsHistoryStore {
    /// Open (creating if needed) a history directory.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, NarrationError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| persistence(format!("cannot create {}: {e}", dir.display())))?;
        Ok(Self {
            dir,
            save_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn json_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    fn wav_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.wav"))
    }

    async fn read_entry(&self, path: &Path) -> Result<HistoryEntry, NarrationError> {
        let raw = tokio::fs::read(path)
            .await
            .map_err(|e| persistence(format!("{}: {e}", path.display())))?;
        serde_json::from_slice(&raw).map_err(|e| persistence(format!("{}: {e}", path.display())))
    }

    async fn entry_ids(&self) -> Result<Vec<String>, NarrationError> {
        let mut dir = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| persistence(format!("{}: {e}", self.dir.display())))?;
        let mut ids = Vec::new();
        while let Some(item) = dir.next_entry().await.map_err(persistence)? {
            let name = item.file_name();
            let name = name.to_string_lossy();
            if let Some(id) = name.strip_suffix(".json") {
                if RE_ID.is_match(id) {
                    ids.push(id.to_string());
                }
            }
        }
        Ok(ids)
    }
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), NarrationError> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, bytes)
        .await
        .map_err(|e| persistence(format!("{}: {e}", tmp.display())))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| persistence(format!("{}: {e}", path.display())))
}

/// Write an entry's audio, then its JSON. A JSON failure takes the audio
/// back out so no orphan WAV outlives the failed save.
async fn commit_entry(
    wav_path: &Path,
    audio: &[u8],
    json_path: &Path,
    json: &[u8],
) -> Result<(), NarrationError> {
    write_atomic(wav_path, audio).await?;
    if let Err(e) = write_atomic(json_path, json).await {
        if let Err(cleanup) = remove_if_present(wav_path).await {
            warn!("Could not remove orphan audio {}: {}", wav_path.display(), cleanup);
        }
        return Err(e);
    }
    Ok(())
}

async fn remove_if_present(path: &Path) -> Result<bool, NarrationError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(persistence(format!("{}: {e}", path.display()))),
    }
}

#[async_trait]
impl HistoryStore for FsHistoryStore {
    async fn save(&self, entry: NewHistoryEntry) -> Result<HistoryEntry, NarrationError> {
        let _guard = self.save_lock.lock().await;

        let created_at = Utc::now();
        let base = created_at.format("%Y%m%d_%H%M%S").to_string();
        let mut id = base.clone();
        let mut n = 1;
        while tokio::fs::try_exists(self.json_path(&id))
            .await
            .map_err(persistence)?
        {
            n += 1;
            id = format!("{base}_{n}");
        }

        let stored = HistoryEntry {
            id: id.clone(),
            created_at,
            original_filename: entry.original_filename,
            formatted_summary: entry.formatted_summary,
            extracted_text: Some(entry.extracted_text),
            settings: entry.settings,
            duration_secs: entry.duration_secs,
            audio_bytes: entry.audio.len(),
        };

        // Audio first: an entry is only visible once its JSON exists.
        let json = serde_json::to_vec_pretty(&stored).map_err(persistence)?;
        commit_entry(&self.wav_path(&id), &entry.audio, &self.json_path(&id), &json).await?;

        info!("Saved history entry {}", id);
        Ok(stored)
    }

    async fn list(
        &self,
        limit: usize,
        offset: usize,
        include_text: bool,
    ) -> Result<Vec<HistoryEntry>, NarrationError> {
        let mut entries = Vec::new();
        for id in self.entry_ids().await? {
            match self.read_entry(&self.json_path(&id)).await {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!("Skipping unreadable history entry {}: {}", id, e),
            }
        }

        entries.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });

        Ok(entries
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|mut e| {
                if !include_text {
                    e.extracted_text = None;
                }
                e
            })
            .collect())
    }

    async fn get(&self, id: &str) -> Result<Option<HistoryEntry>, NarrationError> {
        check_id(id)?;
        let path = self.json_path(id);
        if !tokio::fs::try_exists(&path).await.map_err(persistence)? {
            return Ok(None);
        }
        self.read_entry(&path).await.map(Some)
    }

    async fn get_audio(&self, id: &str) -> Result<Option<Vec<u8>>, NarrationError> {
        check_id(id)?;
        match tokio::fs::read(self.wav_path(id)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(persistence(e)),
        }
    }

    async fn delete(&self, id: &str) -> Result<bool, NarrationError> {
        check_id(id)?;
        let had_json = remove_if_present(&self.json_path(id)).await?;
        let had_wav = remove_if_present(&self.wav_path(id)).await?;
        debug!("Deleted history entry {} (json={}, wav={})", id, had_json, had_wav);
        Ok(had_json || had_wav)
    }

    async fn clear(&self) -> Result<usize, NarrationError> {
        let ids = self.entry_ids().await?;
        let mut removed = 0;
        for id in &ids {
            if self.delete(id).await? {
                removed += 1;
            }
        }
        info!("Cleared {} history entries", removed);
        Ok(removed)
    }
}
