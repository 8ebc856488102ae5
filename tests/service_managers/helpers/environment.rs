//! Temporary filesystem root laid out like a real host

use rustle_service::privilege::StaticPrivilege;
use rustle_service::{ControllerContext, ServiceDescriptor};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

use super::RecordingRunner;

const SKELETON: &[&str] = &[
    "etc/systemd/system",
    "etc/init.d",
    "etc/init",
    "etc/logrotate.d",
    "var/log",
    "Library/LaunchDaemons",
    "usr/local/etc/rc.d",
];

pub struct TestEnvironment {
    pub root: TempDir,
    pub runner: Arc<RecordingRunner>,
    privileged: bool,
}

impl TestEnvironment {
    pub fn new() -> Self {
        let root = TempDir::new().expect("Failed to create temp root");
        for dir in SKELETON {
            std::fs::create_dir_all(root.path().join(dir)).expect("Failed to create skeleton");
        }
        Self {
            root,
            runner: Arc::new(RecordingRunner::new()),
            privileged: true,
        }
    }

    pub fn unprivileged() -> Self {
        Self {
            privileged: false,
            ..Self::new()
        }
    }

    pub fn ctx(&self) -> ControllerContext {
        ControllerContext::system()
            .with_root(self.root.path())
            .with_runner(self.runner.clone())
            .with_privilege(Arc::new(StaticPrivilege(self.privileged)))
    }

    /// Host path resolved under the temp root.
    pub fn path(&self, absolute: &str) -> PathBuf {
        self.root.path().join(absolute.trim_start_matches('/'))
    }

    pub fn descriptor(&self) -> ServiceDescriptor {
        ServiceDescriptor::from_executable("/usr/local/bin/backupd")
            .with_dependencies(["network.target"])
    }

    /// Every regular file under the root, relative and sorted.
    pub fn files(&self) -> Vec<String> {
        let mut files = Vec::new();
        collect_files(self.root.path(), self.root.path(), &mut files);
        files.sort();
        files
    }
}

fn collect_files(base: &std::path::Path, dir: &std::path::Path, out: &mut Vec<String>) {
    for entry in std::fs::read_dir(dir).expect("Failed to read dir") {
        let path = entry.expect("Failed to read entry").path();
        if path.is_dir() {
            collect_files(base, &path, out);
        } else {
            out.push(
                path.strip_prefix(base)
                    .expect("Path outside root")
                    .to_string_lossy()
                    .to_string(),
            );
        }
    }
}
