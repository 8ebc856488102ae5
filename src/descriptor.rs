//! Identity of the executable being registered as a service

use std::path::{Path, PathBuf};

use crate::error::DaemonError;

/// Immutable description of the service, built once per process run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    executable_path: PathBuf,
    service_name: String,
    description: String,
    dependencies: Vec<String>,
    working_directory: PathBuf,
}

impl ServiceDescriptor {
    /// Build a descriptor for `executable_path`, deriving the name, description
    /// and working directory from it.
    pub fn from_executable(executable_path: impl Into<PathBuf>) -> Self {
        let executable_path = executable_path.into();
        let app_name = executable_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let working_directory = executable_path
            .parent()
            .map(|dir| {
                if dir.as_os_str().is_empty() {
                    PathBuf::from(".")
                } else {
                    dir.to_path_buf()
                }
            })
            .unwrap_or_else(|| PathBuf::from("/"));

        Self {
            service_name: normalize_service_name(&app_name),
            description: format!("{app_name} server daemon"),
            dependencies: Vec::new(),
            working_directory,
            executable_path,
        }
    }

    /// Descriptor for the currently running binary.
    pub fn current() -> Result<Self, DaemonError> {
        let exe = std::env::current_exe()
            .map_err(|e| DaemonError::io(PathBuf::from("<current executable>"), e))?;
        Ok(Self::from_executable(exe))
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for dep in dependencies {
            let dep = dep.into();
            if !dep.is_empty() && !self.dependencies.contains(&dep) {
                self.dependencies.push(dep);
            }
        }
        self
    }

    pub fn executable_path(&self) -> &Path {
        &self.executable_path
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    pub fn working_directory(&self) -> &Path {
        &self.working_directory
    }
}

/// Collapse whitespace runs into single underscores, trimming the ends.
pub fn normalize_service_name(app_name: &str) -> String {
    app_name.split_whitespace().collect::<Vec<_>>().join("_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_descriptor_from_executable() {
        let desc = ServiceDescriptor::from_executable("/opt/backup tools/backup agent");
        assert_eq!(desc.service_name(), "backup_agent");
        assert_eq!(desc.description(), "backup agent server daemon");
        assert_eq!(desc.working_directory(), Path::new("/opt/backup tools"));
        assert!(desc.dependencies().is_empty());
    }

    #[test]
    fn test_working_directory_is_parent() {
        let desc = ServiceDescriptor::from_executable("/srv/agent/agent");
        assert_eq!(desc.working_directory(), Path::new("/srv/agent"));

        let bare = ServiceDescriptor::from_executable("agent");
        assert_eq!(bare.working_directory(), Path::new("."));
    }

    #[test]
    fn test_dependencies_keep_order_and_skip_duplicates() {
        let desc = ServiceDescriptor::from_executable("/usr/bin/syncd").with_dependencies([
            "network.target",
            "",
            "remote-fs.target",
            "network.target",
        ]);
        assert_eq!(
            desc.dependencies(),
            ["network.target".to_string(), "remote-fs.target".to_string()]
        );
    }

    #[test]
    fn test_normalize_collapses_runs() {
        assert_eq!(normalize_service_name("  my \t big\n app "), "my_big_app");
        assert_eq!(normalize_service_name("plain"), "plain");
    }

    proptest! {
        #[test]
        fn normalized_names_never_contain_whitespace(name in "[a-z \\t]{0,24}") {
            let normalized = normalize_service_name(&name);
            prop_assert!(!normalized.chars().any(char::is_whitespace));
            prop_assert!(!normalized.starts_with('_'));
            prop_assert!(!normalized.ends_with('_'));
        }
    }
}
