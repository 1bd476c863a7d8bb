//! Durable relay state: one small JSON record per file in a single directory.
//!
//! Reads never fail for "missing" conditions. A record that is absent, lacks
//! the requested key, or cannot be parsed reads as `0`, so callers cannot
//! tell "absent" from "explicitly zero" and treat both as "nothing yet".
//! Writes replace the whole record via a temp file in the same directory and
//! a rename, so a crash mid-write leaves the previous record intact.

use std::{
    fs,
    io::{ErrorKind, Write},
    path::PathBuf,
};

use serde::Serialize;
use serde_json::{json, Value};

use crate::{domain::PostId, errors::Error, team::TeamConfig, Result};

pub const WATERMARK_RECORD: &str = "last_vk_wall_id.json";
pub const WATERMARK_KEY: &str = "last_vk_wall_id";
pub const TEAM_CONFIG_RECORD: &str = "team_config.json";
pub const LAST_ERROR_RECORD: &str = "last_api_error.json";
pub const LAST_ERROR_KEY: &str = "last_api_error";

#[derive(Clone, Debug)]
pub struct JsonStore {
    dir: PathBuf,
}

impl JsonStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    /// Load a record, or one key of it. Missing or unreadable ⇒ `0`.
    pub fn read(&self, name: &str, key: Option<&str>) -> Value {
        let path = self.path(name);
        let txt = match fs::read_to_string(&path) {
            Ok(txt) => txt,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!("state record `{name}` doesn't exist");
                return default_value();
            }
            Err(e) => {
                tracing::warn!("state record `{name}` unreadable: {e}");
                return default_value();
            }
        };

        let data: Value = match serde_json::from_str(&txt) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("state record `{name}` is not valid JSON: {e}");
                return default_value();
            }
        };

        let Some(key) = key else {
            return data;
        };
        match data.get(key) {
            Some(v) => v.clone(),
            None => {
                tracing::info!("state record `{name}` doesn't contain key `{key}`");
                default_value()
            }
        }
    }

    /// Replace a record with `value`. Creates the state directory if needed.
    pub fn write<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<()> {
        let txt = serde_json::to_string(value)?;
        fs::create_dir_all(&self.dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(txt.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.path(name))
            .map_err(|e| Error::Io(e.error))?;
        Ok(())
    }

    pub fn load_watermark(&self) -> PostId {
        let raw = self.read(WATERMARK_RECORD, Some(WATERMARK_KEY));
        match raw.as_i64() {
            Some(id) if id > 0 => PostId(id),
            Some(_) => PostId::NONE,
            None => {
                tracing::warn!("watermark is not an integer ({raw}); starting from scratch");
                PostId::NONE
            }
        }
    }

    pub fn save_watermark(&self, id: PostId) -> Result<()> {
        self.write(WATERMARK_RECORD, &json!({ WATERMARK_KEY: id.0 }))
    }

    /// The stored team config, if one exists and parses.
    pub fn load_team_config(&self) -> Option<TeamConfig> {
        let raw = self.read(TEAM_CONFIG_RECORD, None);
        if !raw.is_object() {
            return None;
        }
        match serde_json::from_value(raw) {
            Ok(cfg) => Some(cfg),
            Err(e) => {
                tracing::warn!("stored team config ignored: {e}");
                None
            }
        }
    }

    pub fn save_team_config(&self, cfg: &TeamConfig) -> Result<()> {
        self.write(TEAM_CONFIG_RECORD, cfg)
    }

    pub fn load_last_error(&self) -> Option<String> {
        self.read(LAST_ERROR_RECORD, Some(LAST_ERROR_KEY))
            .as_str()
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    pub fn save_last_error(&self, err: Option<&str>) -> Result<()> {
        self.write(
            LAST_ERROR_RECORD,
            &json!({ LAST_ERROR_KEY: err.unwrap_or_default() }),
        )
    }
}

fn default_value() -> Value {
    Value::from(0)
}
