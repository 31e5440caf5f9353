//! Saved works
//!
//! A work is a saved editing session: a copy of the template, the editable
//! state, and where the template's assets live. Works are kept in a
//! `LocalStore`, a directory of JSON values addressed by key.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use walkdir::WalkDir;

use crate::error::{PhotocardError, Result};
use crate::state::snapshot::EditableState;
use crate::template::migration::CURRENT_SCHEMA_VERSION;
use crate::template::model::TemplateConfig;

/// Extension of stored values.
const VALUE_EXTENSION: &str = "json";

/// Key prefix for works.
const WORK_KEY_PREFIX: &str = "work-";

/// Directory-backed key/value store with JSON values.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub fn open(root: &Path) -> Result<Self> {
        if !root.exists() {
            fs::create_dir_all(root).map_err(|e| PhotocardError::DirectoryCreateError {
                path: root.to_path_buf(),
                source: e,
            })?;
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// The value is written to a temporary file first and renamed over the
    /// old one, so readers never see a half-written value.
    pub fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let path = self.value_path(key)?;
        let tmp_path = path.with_extension("json.tmp");

        let content = serde_json::to_string_pretty(value)?;
        fs::write(&tmp_path, content).map_err(|e| PhotocardError::FileWriteError {
            path: tmp_path.clone(),
            source: e,
        })?;
        fs::rename(&tmp_path, &path).map_err(|e| PhotocardError::FileWriteError {
            path: path.clone(),
            source: e,
        })?;

        tracing::debug!(key, "stored value");
        Ok(())
    }

    /// Read the value under `key`, or `None` when absent.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let path = self.value_path(key)?;
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path).map_err(|e| PhotocardError::FileReadError {
            path: path.clone(),
            source: e,
        })?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Delete the value under `key`. Returns whether it existed.
    pub fn remove(&self, key: &str) -> Result<bool> {
        let path = self.value_path(key)?;
        if !path.exists() {
            return Ok(false);
        }
        fs::remove_file(&path).map_err(|e| PhotocardError::FileWriteError { path, source: e })?;
        Ok(true)
    }

    /// All keys in the store, sorted.
    pub fn keys(&self) -> Result<Vec<String>> {
        let mut keys: Vec<String> = WalkDir::new(&self.root)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some(VALUE_EXTENSION) {
                    return None;
                }
                path.file_stem()
                    .and_then(|stem| stem.to_str())
                    .filter(|stem| is_valid_key(stem))
                    .map(str::to_string)
            })
            .collect();
        keys.sort();
        Ok(keys)
    }

    fn value_path(&self, key: &str) -> Result<PathBuf> {
        if !is_valid_key(key) {
            return Err(PhotocardError::InvalidStorageKey {
                key: key.to_string(),
            });
        }
        Ok(self.root.join(format!("{}.{}", key, VALUE_EXTENSION)))
    }
}

/// Keys are non-empty and limited to `[A-Za-z0-9_-]`.
fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// A saved editing session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Work {
    /// Schema version of the embedded template.
    #[serde(default = "default_schema_version")]
    pub schema_version: String,

    pub id: String,

    pub title: String,

    pub created_at: DateTime<Utc>,

    pub modified_at: DateTime<Utc>,

    /// Directory template-relative asset paths resolve against.
    pub asset_root: PathBuf,

    pub template: TemplateConfig,

    pub state: EditableState,
}

fn default_schema_version() -> String {
    CURRENT_SCHEMA_VERSION.to_string()
}

impl Work {
    /// Start a work from a template with default state.
    pub fn new(title: impl Into<String>, template: TemplateConfig, asset_root: &Path) -> Self {
        let now = Utc::now();
        let state = EditableState::from_template(&template);
        Self {
            schema_version: CURRENT_SCHEMA_VERSION.to_string(),
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            created_at: now,
            modified_at: now,
            asset_root: asset_root.to_path_buf(),
            template,
            state,
        }
    }

    fn key_for(id: &str) -> String {
        format!("{}{}", WORK_KEY_PREFIX, id)
    }

    /// Persist the work, bumping its modification time.
    pub fn save(&mut self, store: &LocalStore) -> Result<()> {
        self.modified_at = Utc::now();
        store.put(&Self::key_for(&self.id), self)
    }

    /// Load a work, migrating and validating its embedded template.
    pub fn load(store: &LocalStore, id: &str) -> Result<Self> {
        let raw: serde_json::Value = store
            .get(&Self::key_for(id))?
            .ok_or_else(|| PhotocardError::WorkNotFound { id: id.to_string() })?;

        let mut raw = raw;
        let template = raw
            .get_mut("template")
            .map(serde_json::Value::take)
            .ok_or_else(|| PhotocardError::InvalidTemplate {
                reason: format!("work '{}' has no template", id),
            })?;
        let template = TemplateConfig::from_value(template)?;

        if let Some(obj) = raw.as_object_mut() {
            obj.insert("template".to_string(), serde_json::to_value(&template)?);
            obj.insert(
                "schema_version".to_string(),
                serde_json::Value::String(CURRENT_SCHEMA_VERSION.to_string()),
            );
        }

        Ok(serde_json::from_value(raw)?)
    }

    /// Ids of all saved works, sorted.
    pub fn list(store: &LocalStore) -> Result<Vec<String>> {
        Ok(store
            .keys()?
            .into_iter()
            .filter_map(|key| key.strip_prefix(WORK_KEY_PREFIX).map(str::to_string))
            .collect())
    }

    pub fn delete(store: &LocalStore, id: &str) -> Result<bool> {
        store.remove(&Self::key_for(id))
    }
}
