//! JSON file backend for the event document.
//!
//! The document is rewritten wholesale on every save: serialized to a temp
//! file next to the target, then renamed over it, so readers only ever see a
//! complete document.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
#[cfg(test)]
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
#[cfg(test)]
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::draw::Assignments;
use crate::error::StoreError;
use crate::registration::Profile;

use super::state::EventState;
use super::traits::StateStore;

/// File names used by the two-document layout this store replaces.
pub mod legacy_files {
    pub const PROFILES: &str = "users_data.json";
    pub const ASSIGNMENTS: &str = "assignments.json";
}

/// Event document stored as a single pretty-printed JSON file.
pub struct JsonFileStore {
    path: PathBuf,
    legacy_dir: Option<PathBuf>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            legacy_dir: None,
        }
    }

    /// Import `users_data.json` / `assignments.json` from `dir` when the
    /// combined document does not exist yet.
    pub fn with_legacy_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.legacy_dir = Some(dir.into());
        self
    }

    async fn import_legacy(&self, dir: &Path) -> Option<EventState> {
        let profiles_path = dir.join(legacy_files::PROFILES);
        let assignments_path = dir.join(legacy_files::ASSIGNMENTS);

        let legacy_profiles: Option<BTreeMap<String, LegacyProfile>> =
            read_json_or_warn(&profiles_path).await;
        let assignments: Option<Assignments> = read_json_or_warn(&assignments_path).await;

        if legacy_profiles.is_none() && assignments.is_none() {
            return None;
        }

        let profiles: BTreeMap<String, Profile> = legacy_profiles
            .unwrap_or_default()
            .into_iter()
            .map(|(id, legacy)| (id, legacy.into_profile()))
            .collect();

        tracing::info!(
            dir = %dir.display(),
            profiles = profiles.len(),
            "Imported legacy participant data"
        );

        Some(EventState {
            profiles,
            assignments: assignments.unwrap_or_default(),
            ..EventState::default()
        })
    }
}

#[async_trait]
impl StateStore for JsonFileStore {
    async fn load(&self) -> Result<EventState, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(raw) => match serde_json::from_slice::<EventState>(&raw) {
                Ok(state) => Ok(state),
                Err(e) => {
                    tracing::warn!(
                        path = %self.path.display(),
                        "Malformed event document, starting empty: {}",
                        e
                    );
                    Ok(EventState::default())
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => {
                let Some(dir) = self.legacy_dir.as_deref() else {
                    return Ok(EventState::default());
                };
                match self.import_legacy(dir).await {
                    Some(state) => {
                        self.save(&state).await?;
                        Ok(state)
                    }
                    None => Ok(EventState::default()),
                }
            }
            Err(e) => Err(StoreError::Io {
                path: self.path.display().to_string(),
                source: e,
            }),
        }
    }

    async fn save(&self, state: &EventState) -> Result<(), StoreError> {
        let io_err = |path: &Path, source| StoreError::Io {
            path: path.display().to_string(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_err(parent, e))?;
        }

        let payload = serde_json::to_vec_pretty(state)?;
        let temp_path = self
            .path
            .with_extension(format!("{}.tmp", Uuid::new_v4().simple()));

        tokio::fs::write(&temp_path, payload)
            .await
            .map_err(|e| io_err(&temp_path, e))?;

        if let Err(e) = tokio::fs::rename(&temp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(io_err(&self.path, e));
        }

        Ok(())
    }
}

/// Profile record as written by the two-document layout.
#[derive(Debug, Deserialize)]
struct LegacyProfile {
    name: String,
    course: String,
    group: String,
    wishes: String,
    #[serde(default)]
    registration_date: Option<String>,
    #[serde(default)]
    username: Option<String>,
}

impl LegacyProfile {
    fn into_profile(self) -> Profile {
        let registered_at = self
            .registration_date
            .as_deref()
            .and_then(parse_legacy_timestamp)
            .unwrap_or_else(Utc::now);
        Profile {
            name: self.name,
            course: self.course,
            group: self.group,
            wishes: self.wishes,
            registered_at,
            handle: self.username,
        }
    }
}

/// Accepts RFC 3339 or a naive ISO timestamp in local time.
fn parse_legacy_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

async fn read_json_or_warn<T: serde::de::DeserializeOwned>(path: &Path) -> Option<T> {
    let raw = tokio::fs::read(path).await.ok()?;
    match serde_json::from_slice(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(path = %path.display(), "Skipping malformed legacy file: {}", e);
            None
        }
    }
}

/// In-memory backend. Counts saves so callers can check write behaviour.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<EventState>,
    saves: AtomicUsize,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: EventState) -> Self {
        Self {
            state: Mutex::new(state),
            saves: AtomicUsize::new(0),
        }
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::Relaxed)
    }

    pub async fn snapshot(&self) -> EventState {
        self.state.lock().await.clone()
    }
}

#[cfg(test)]
#[async_trait]
impl StateStore for MemoryStore {
    async fn load(&self) -> Result<EventState, StoreError> {
        Ok(self.state.lock().await.clone())
    }

    async fn save(&self, state: &EventState) -> Result<(), StoreError> {
        *self.state.lock().await = state.clone();
        self.saves.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
