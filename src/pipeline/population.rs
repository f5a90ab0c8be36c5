//! Application population snapshots
//!
//! The coordination substrate (outside this crate) tracks which application
//! versions exist and which rules they request. The pipeline consumes that
//! state as a plain [`Application`] list; for the daemon a JSON file
//! provider is included so population changes can be delivered by rewriting
//! the file and signalling the process.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::PipelineError;
use crate::rules::OwnerId;

/// One application version and its desired routing state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    /// Stable identity of this application version
    pub owner: OwnerId,

    /// Raw rule pattern strings as requested by the application
    #[serde(default)]
    pub raw_rules: Vec<String>,

    /// Backing target address; `None` means no deployed target yet and the
    /// application is skipped during activation
    #[serde(default)]
    pub target: Option<String>,
}

impl Application {
    /// Create an application with no rules and no target
    pub fn new(owner: impl Into<OwnerId>) -> Self {
        Self {
            owner: owner.into(),
            raw_rules: Vec::new(),
            target: None,
        }
    }

    /// Set the backing target address
    #[must_use]
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Add a raw rule pattern
    #[must_use]
    pub fn with_rule(mut self, pattern: impl Into<String>) -> Self {
        self.raw_rules.push(pattern.into());
        self
    }

    /// Check whether the application has a deployed backing target
    #[must_use]
    pub const fn has_target(&self) -> bool {
        self.target.is_some()
    }
}

/// Source of population snapshots
pub trait PopulationProvider {
    /// Return the current set of active applications.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError` if the snapshot cannot be produced.
    fn active_applications(&self) -> Result<Vec<Application>, PipelineError>;
}

/// On-disk population snapshot file
///
/// Wraps the application list so the file format has room for metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PopulationFile {
    /// The active applications
    #[serde(default)]
    pub applications: Vec<Application>,
}

/// Population provider backed by a JSON file
#[derive(Debug, Clone)]
pub struct FilePopulationProvider {
    path: PathBuf,
}

impl FilePopulationProvider {
    /// Create a provider reading from the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The file path this provider reads
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PopulationProvider for FilePopulationProvider {
    fn active_applications(&self) -> Result<Vec<Application>, PipelineError> {
        load_population(&self.path)
    }
}

/// Load a population snapshot from a JSON file
///
/// # Errors
///
/// Returns `PipelineError` if the file is missing or does not parse.
pub fn load_population(path: impl AsRef<Path>) -> Result<Vec<Application>, PipelineError> {
    let path = path.as_ref();

    debug!("Loading population snapshot from {:?}", path);

    if !path.exists() {
        return Err(PipelineError::PopulationNotFound {
            path: path.display().to_string(),
        });
    }

    let contents = std::fs::read_to_string(path)?;
    let file: PopulationFile = serde_json::from_str(&contents).map_err(|e| {
        PipelineError::PopulationParse(format!("Failed to parse JSON: {e} at {path:?}"))
    })?;

    info!(
        "Population snapshot loaded: {} applications",
        file.applications.len()
    );

    Ok(file.applications)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_application_builder() {
        let app = Application::new("web-v1")
            .with_target("10.0.0.3:8080")
            .with_rule("/app/**")
            .with_rule("/app/*.css");

        assert_eq!(app.owner, OwnerId::from("web-v1"));
        assert!(app.has_target());
        assert_eq!(app.raw_rules.len(), 2);

        let bare = Application::new("web-v2");
        assert!(!bare.has_target());
    }

    #[test]
    fn test_load_population() {
        let mut file = NamedTempFile::new().unwrap();
        let json = r#"{
            "applications": [
                {
                    "owner": "web-v1",
                    "raw_rules": ["/app/**"],
                    "target": "10.0.0.3:8080"
                },
                {
                    "owner": "web-v2"
                }
            ]
        }"#;
        file.write_all(json.as_bytes()).unwrap();

        let apps = load_population(file.path()).unwrap();
        assert_eq!(apps.len(), 2);
        assert_eq!(apps[0].owner, OwnerId::from("web-v1"));
        assert!(apps[0].has_target());
        assert!(!apps[1].has_target());
        assert!(apps[1].raw_rules.is_empty());
    }

    #[test]
    fn test_load_population_not_found() {
        let result = load_population("/nonexistent/population.json");
        assert!(matches!(
            result,
            Err(PipelineError::PopulationNotFound { .. })
        ));
    }

    #[test]
    fn test_load_population_invalid_json() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"not valid json").unwrap();
        let result = load_population(file.path());
        assert!(matches!(result, Err(PipelineError::PopulationParse(_))));
    }

    #[test]
    fn test_file_provider() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(br#"{"applications": []}"#).unwrap();
        let provider = FilePopulationProvider::new(file.path());
        assert!(provider.active_applications().unwrap().is_empty());
    }
}
