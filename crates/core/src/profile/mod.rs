use std::{collections::HashMap, fmt, io, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::{config::ProfileConfig, Result, SessionError};

/// Which profile a request needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileMode {
    Record,
    Playback,
}

impl ProfileMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Record => "record",
            Self::Playback => "playback",
        }
    }
}

impl fmt::Display for ProfileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source of raw profile text, read fresh for every request.
pub trait ProfileSource {
    fn load(&self, mode: ProfileMode) -> Result<String>;
}

/// Reads profiles from one file per mode inside a directory.
///
/// Only the first line of a profile file is significant.
#[derive(Debug, Clone)]
pub struct FileProfileStore {
    directory: PathBuf,
    record_file: String,
    playback_file: String,
}

impl FileProfileStore {
    pub fn new(config: &ProfileConfig) -> Self {
        Self {
            directory: config.directory.clone(),
            record_file: config.record_file.clone(),
            playback_file: config.playback_file.clone(),
        }
    }

    /// Returns the file backing the requested mode.
    pub fn path_for(&self, mode: ProfileMode) -> PathBuf {
        match mode {
            ProfileMode::Record => self.directory.join(&self.record_file),
            ProfileMode::Playback => self.directory.join(&self.playback_file),
        }
    }
}

impl ProfileSource for FileProfileStore {
    fn load(&self, mode: ProfileMode) -> Result<String> {
        let path = self.path_for(mode);
        let raw = std::fs::read_to_string(&path).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => SessionError::ProfileNotFound {
                mode: mode.as_str(),
                path: path.display().to_string(),
            },
            io::ErrorKind::InvalidData => {
                SessionError::parse(format!("profile `{}` is not valid UTF-8", path.display()))
            }
            _ => SessionError::Io(err),
        })?;

        let line = raw.lines().next().unwrap_or_default().to_string();
        tracing::debug!(%mode, path = %path.display(), profile = %line, "loaded profile");
        Ok(line)
    }
}

/// Profiles held in memory, keyed by mode.
#[derive(Debug, Clone, Default)]
pub struct MemoryProfileStore {
    profiles: HashMap<ProfileMode, String>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(mut self, mode: ProfileMode, text: impl Into<String>) -> Self {
        self.set(mode, text);
        self
    }

    pub fn set(&mut self, mode: ProfileMode, text: impl Into<String>) {
        self.profiles.insert(mode, text.into());
    }
}

impl ProfileSource for MemoryProfileStore {
    fn load(&self, mode: ProfileMode) -> Result<String> {
        self.profiles
            .get(&mode)
            .cloned()
            .ok_or(SessionError::ProfileNotFound {
                mode: mode.as_str(),
                path: "<memory>".to_string(),
            })
    }
}
