//! Optional settings file for the service controller

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::descriptor::ServiceDescriptor;
use crate::error::DaemonError;

pub const DEFAULT_LABEL_PREFIX: &str = "com.rustle";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Settings read from an optional YAML file. Every key may be omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonSettings {
    /// Overrides the `"<name> server daemon"` description.
    pub description: Option<String>,
    /// Native services that must be active first. Added after the platform defaults.
    pub dependencies: Vec<String>,
    /// Reverse-DNS prefix of the launchd plist file name.
    pub launchd_label_prefix: String,
    /// Filesystem root that artifact paths are resolved against.
    pub root: PathBuf,
    /// Windows stop poll interval.
    pub stop_poll_interval_ms: u64,
}

impl Default for DaemonSettings {
    fn default() -> Self {
        Self {
            description: None,
            dependencies: Vec::new(),
            launchd_label_prefix: DEFAULT_LABEL_PREFIX.to_string(),
            root: PathBuf::from("/"),
            stop_poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl DaemonSettings {
    pub async fn load(path: &Path) -> Result<Self, DaemonError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| DaemonError::io(path, e))?;
        Self::from_yaml(path, &content)
    }

    pub fn from_yaml(path: &Path, content: &str) -> Result<Self, DaemonError> {
        let settings: Self = serde_yaml::from_str(content).map_err(|e| DaemonError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        if settings.stop_poll_interval_ms == 0 {
            return Err(DaemonError::Config {
                path: path.to_path_buf(),
                message: "stop_poll_interval_ms must be greater than zero".to_string(),
            });
        }
        if settings.launchd_label_prefix.trim().is_empty() {
            return Err(DaemonError::Config {
                path: path.to_path_buf(),
                message: "launchd_label_prefix must not be empty".to_string(),
            });
        }

        Ok(settings)
    }

    pub fn stop_poll_interval(&self) -> Duration {
        Duration::from_millis(self.stop_poll_interval_ms)
    }

    /// Apply the description and dependency overrides to `descriptor`.
    pub fn apply(&self, descriptor: ServiceDescriptor) -> ServiceDescriptor {
        let descriptor = match &self.description {
            Some(description) => descriptor.with_description(description.clone()),
            None => descriptor,
        };
        descriptor.with_dependencies(self.dependencies.iter().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let settings = DaemonSettings::from_yaml(Path::new("empty.yml"), "{}").unwrap();
        assert_eq!(settings, DaemonSettings::default());
        assert_eq!(settings.stop_poll_interval(), Duration::from_millis(50));
    }

    #[test]
    fn test_partial_file() {
        let yaml = "description: Nightly backups\ndependencies: [remote-fs.target]\n";
        let settings = DaemonSettings::from_yaml(Path::new("svc.yml"), yaml).unwrap();
        assert_eq!(settings.description.as_deref(), Some("Nightly backups"));
        assert_eq!(settings.launchd_label_prefix, DEFAULT_LABEL_PREFIX);

        let descriptor = settings.apply(
            ServiceDescriptor::from_executable("/usr/bin/backupd")
                .with_dependencies(["network.target"]),
        );
        assert_eq!(descriptor.description(), "Nightly backups");
        assert_eq!(
            descriptor.dependencies(),
            ["network.target".to_string(), "remote-fs.target".to_string()]
        );
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let err = DaemonSettings::from_yaml(Path::new("svc.yml"), "stop_poll_interval_ms: 0")
            .unwrap_err();
        assert!(matches!(err, DaemonError::Config { .. }));
    }

    #[test]
    fn test_malformed_yaml_rejected() {
        let err = DaemonSettings::from_yaml(Path::new("svc.yml"), "dependencies: {").unwrap_err();
        assert!(err.to_string().starts_with("Invalid configuration in svc.yml"));
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let err = DaemonSettings::load(Path::new("/nonexistent/rustle-service.yml"))
            .await
            .unwrap_err();
        assert!(matches!(err, DaemonError::Io { .. }));
    }
}
