use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{descriptor::MAX_ELEMENTS, Result};

/// Top-level configuration structure for the daemon.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub profiles: ProfileConfig,
    pub session: SessionConfig,
    pub service: ServiceConfig,
}

impl AppConfig {
    /// Reads a JSON configuration file. Missing sections keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config = serde_json::from_str(&raw)?;
        Ok(config)
    }
}

/// Where the record and playback profiles live and how they are tokenized.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    pub directory: PathBuf,
    pub record_file: String,
    pub playback_file: String,
    pub delimiter: char,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            record_file: "pipeline_record_profile".to_string(),
            playback_file: "pipeline_playback_profile".to_string(),
            delimiter: '!',
        }
    }
}

/// What to do when the engine reports an error on the active pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Stop the pipeline and flag it as faulted; keep serving requests.
    #[default]
    StopPipeline,
    /// Stop the pipeline and ask the request loop to exit.
    Quit,
}

/// Tunables for the pipeline lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub max_elements: usize,
    pub pipeline_name: String,
    pub on_error: ErrorPolicy,
    pub poll_interval_ms: u64,
}

impl SessionConfig {
    /// Element limit handed to the descriptor builder. Configuration may
    /// lower the limit but never raise it above [`MAX_ELEMENTS`].
    pub fn element_limit(&self) -> usize {
        self.max_elements.min(MAX_ELEMENTS)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_elements: MAX_ELEMENTS,
            pipeline_name: "session-pipeline".to_string(),
            on_error: ErrorPolicy::StopPipeline,
            poll_interval_ms: 50,
        }
    }
}

/// Identity the RPC transport publishes the session object under.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub name: String,
    pub object_path: String,
    pub interface: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: "org.mediasession.Service".to_string(),
            object_path: "/org/mediasession/Session".to_string(),
            interface: "org.mediasession.Session".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn partial_files_fall_back_to_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let json = r#"{
            "profiles": { "directory": "/etc/profiles" },
            "session": { "on_error": "quit" }
        }"#;
        file.write_all(json.as_bytes()).unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.profiles.directory, PathBuf::from("/etc/profiles"));
        assert_eq!(config.profiles.record_file, "pipeline_record_profile");
        assert_eq!(config.profiles.delimiter, '!');
        assert_eq!(config.session.on_error, ErrorPolicy::Quit);
        assert_eq!(config.session.max_elements, 100);
    }

    #[test]
    fn element_limit_only_lowers_the_ceiling() {
        let mut session = SessionConfig {
            max_elements: 1000,
            ..Default::default()
        };
        assert_eq!(session.element_limit(), MAX_ELEMENTS);

        session.max_elements = 3;
        assert_eq!(session.element_limit(), 3);
    }

    #[test]
    fn rejects_malformed_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        let err = AppConfig::load(file.path()).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::ConfigError);
    }
}
