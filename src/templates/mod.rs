//! Rendering of native service configuration files

pub mod bodies;

use handlebars::Handlebars;
use once_cell::sync::Lazy;
use serde::Serialize;
use std::path::Path;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::descriptor::ServiceDescriptor;
use crate::error::DaemonError;

static REGISTRY: Lazy<Handlebars<'static>> = Lazy::new(|| {
    let mut handlebars = Handlebars::new();
    handlebars.set_strict_mode(false);
    // Unit files and shell scripts must come out byte for byte.
    handlebars.register_escape_fn(handlebars::no_escape);
    handlebars
});

/// The closed set of configuration files the controllers generate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    SystemdUnit,
    SysVScript,
    UpstartConf,
    LaunchdPlist,
    RcScript,
    LogRotate,
}

impl TemplateKind {
    pub fn name(self) -> &'static str {
        match self {
            TemplateKind::SystemdUnit => "systemd-unit",
            TemplateKind::SysVScript => "sysv-script",
            TemplateKind::UpstartConf => "upstart-conf",
            TemplateKind::LaunchdPlist => "launchd-plist",
            TemplateKind::RcScript => "rc-script",
            TemplateKind::LogRotate => "logrotate",
        }
    }

    pub fn body(self) -> &'static str {
        match self {
            TemplateKind::SystemdUnit => bodies::SYSTEMD_UNIT,
            TemplateKind::SysVScript => bodies::SYSV_SCRIPT,
            TemplateKind::UpstartConf => bodies::UPSTART_CONF,
            TemplateKind::LaunchdPlist => bodies::LAUNCHD_PLIST,
            TemplateKind::RcScript => bodies::RC_SCRIPT,
            TemplateKind::LogRotate => bodies::LOGROTATE_CONF,
        }
    }
}

/// Values substituted into a template. Every field is optional in the sense
/// that an empty value renders as an empty string.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TemplateFields {
    pub name: String,
    pub description: String,
    pub path: String,
    pub work_dir: String,
    /// `path` quoted for a shell or systemd command line.
    pub exec: String,
    /// `work_dir` quoted for a shell command line.
    pub exec_dir: String,
    /// Invocation arguments, shell-quoted and space separated.
    pub args: String,
    /// Invocation arguments one by one, for formats that list them.
    pub arg_list: Vec<String>,
    /// Dependencies, space separated.
    pub dependencies: String,
}

impl TemplateFields {
    pub fn new(descriptor: &ServiceDescriptor, args: &[String]) -> Self {
        let path = descriptor.executable_path().to_string_lossy().to_string();
        let work_dir = descriptor.working_directory().to_string_lossy().to_string();
        Self {
            exec: shell_words::quote(&path).into_owned(),
            exec_dir: shell_words::quote(&work_dir).into_owned(),
            name: descriptor.service_name().to_string(),
            description: descriptor.description().to_string(),
            path,
            work_dir,
            args: shell_words::join(args),
            arg_list: args.to_vec(),
            dependencies: descriptor.dependencies().join(" "),
        }
    }

    /// Copy with every value escaped for inclusion in XML character data.
    pub fn xml_escaped(&self) -> Self {
        Self {
            name: xml_escape(&self.name),
            description: xml_escape(&self.description),
            path: xml_escape(&self.path),
            work_dir: xml_escape(&self.work_dir),
            exec: xml_escape(&self.exec),
            exec_dir: xml_escape(&self.exec_dir),
            args: xml_escape(&self.args),
            arg_list: self.arg_list.iter().map(|a| xml_escape(a)).collect(),
            dependencies: xml_escape(&self.dependencies),
        }
    }
}

pub struct TemplateRenderer;

impl TemplateRenderer {
    pub fn render(kind: TemplateKind, fields: &TemplateFields) -> Result<String, DaemonError> {
        REGISTRY
            .render_template(kind.body(), fields)
            .map_err(|source| DaemonError::Template {
                template: kind.name().to_string(),
                source,
            })
    }

    /// Render `kind` into `dest` and then apply `mode`.
    ///
    /// The file is opened with create semantics. A failure to set the mode is
    /// reported as `Permissions`, separately from write failures.
    pub async fn render_to_file(
        kind: TemplateKind,
        fields: &TemplateFields,
        dest: &Path,
        mode: u32,
    ) -> Result<(), DaemonError> {
        let content = Self::render(kind, fields)?;

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| DaemonError::io(dest, e))?;
        file.write_all(content.as_bytes())
            .await
            .map_err(|e| DaemonError::io(dest, e))?;
        file.flush().await.map_err(|e| DaemonError::io(dest, e))?;
        drop(file);

        set_mode(dest, mode).await?;
        debug!(
            template = kind.name(),
            path = %dest.display(),
            mode = %format!("{mode:o}"),
            "rendered configuration"
        );
        Ok(())
    }
}

/// Apply permission bits to an existing file.
pub async fn set_mode(path: &Path, mode: u32) -> Result<(), DaemonError> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(mode))
            .await
            .map_err(|source| DaemonError::Permissions {
                path: path.to_path_buf(),
                source,
            })?;
    }

    #[cfg(not(unix))]
    {
        // Only the write bit has a meaning here
        let mut permissions = tokio::fs::metadata(path)
            .await
            .map_err(|source| DaemonError::Permissions {
                path: path.to_path_buf(),
                source,
            })?
            .permissions();
        permissions.set_readonly(mode & 0o200 == 0);
        tokio::fs::set_permissions(path, permissions)
            .await
            .map_err(|source| DaemonError::Permissions {
                path: path.to_path_buf(),
                source,
            })?;
    }

    Ok(())
}

fn xml_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn fields() -> TemplateFields {
        let descriptor = ServiceDescriptor::from_executable("/opt/backupd/backupd")
            .with_dependencies(["network.target"]);
        TemplateFields::new(
            &descriptor,
            &["--config".to_string(), "/etc/backupd.yml".to_string()],
        )
    }

    #[test]
    fn test_systemd_unit_dependencies() {
        let unit = TemplateRenderer::render(TemplateKind::SystemdUnit, &fields()).unwrap();
        assert!(unit.lines().any(|l| l == "Requires=network.target"));
        assert!(unit.lines().any(|l| l == "After=network.target"));
        assert!(unit
            .lines()
            .any(|l| l == "ExecStart=/opt/backupd/backupd --config /etc/backupd.yml"));
        assert!(unit.lines().any(|l| l == "WorkingDirectory=/opt/backupd"));
    }

    #[test]
    fn test_empty_fields_render_empty() {
        let unit =
            TemplateRenderer::render(TemplateKind::SystemdUnit, &TemplateFields::default())
                .unwrap();
        assert!(unit.lines().any(|l| l == "Requires="));
        assert!(unit.lines().any(|l| l == "Description="));
    }

    #[test]
    fn test_args_are_shell_quoted() {
        let descriptor = ServiceDescriptor::from_executable("/usr/bin/syncd");
        let fields = TemplateFields::new(&descriptor, &["--name".to_string(), "my box".to_string()]);
        assert_eq!(fields.args, "--name 'my box'");
        assert_eq!(fields.arg_list, vec!["--name", "my box"]);
    }

    #[test]
    fn test_path_with_spaces_stays_one_word() {
        let descriptor = ServiceDescriptor::from_executable("/opt/backup tools/backup agent");
        let fields = TemplateFields::new(&descriptor, &["--x".to_string()]);

        let unit = TemplateRenderer::render(TemplateKind::SystemdUnit, &fields).unwrap();
        let exec_start = unit
            .lines()
            .find_map(|l| l.strip_prefix("ExecStart="))
            .unwrap();
        assert_eq!(
            shell_words::split(exec_start).unwrap(),
            vec!["/opt/backup tools/backup agent", "--x"]
        );
        assert!(unit.lines().any(|l| l == "WorkingDirectory=/opt/backup tools"));

        let script = TemplateRenderer::render(TemplateKind::SysVScript, &fields).unwrap();
        assert!(script.contains("cd '/opt/backup tools'\n"));
        assert!(script.contains("\"$exec\" --x >> $logfile 2>&1 &"));

        let job = TemplateRenderer::render(TemplateKind::UpstartConf, &fields).unwrap();
        assert!(job.contains("exec '/opt/backup tools/backup agent' --x >>"));

        let rc = TemplateRenderer::render(TemplateKind::RcScript, &fields).unwrap();
        assert!(rc.contains("cd '/opt/backup tools' && "));
        assert!(rc.contains("-f '/opt/backup tools/backup agent' --x\""));
    }

    #[test]
    fn test_plist_lists_arguments_and_escapes() {
        let mut fields = fields();
        fields.arg_list.push("a&b".to_string());
        let plist =
            TemplateRenderer::render(TemplateKind::LaunchdPlist, &fields.xml_escaped()).unwrap();
        assert!(plist.contains("<string>/opt/backupd/backupd</string>"));
        assert!(plist.contains("        <string>--config</string>\n"));
        assert!(plist.contains("<string>a&amp;b</string>"));
        assert!(plist.contains("    </array>"));
    }

    #[test]
    fn test_logrotate_uses_name() {
        let conf = TemplateRenderer::render(TemplateKind::LogRotate, &fields()).unwrap();
        assert!(conf.starts_with("/var/log/backupd/*.log {"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_render_to_file_sets_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let dest = dir.path().join("backupd");
        TemplateRenderer::render_to_file(TemplateKind::SysVScript, &fields(), &dest, 0o755)
            .await
            .unwrap();

        let metadata = std::fs::metadata(&dest).unwrap();
        assert_eq!(metadata.permissions().mode() & 0o777, 0o755);
        let content = std::fs::read_to_string(&dest).unwrap();
        assert!(content.contains("exec=\"/opt/backupd/backupd\""));
    }

    #[tokio::test]
    async fn test_render_to_missing_directory_is_io_error() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("missing").join("backupd.service");
        let err = TemplateRenderer::render_to_file(TemplateKind::SystemdUnit, &fields(), &dest, 0o644)
            .await
            .unwrap_err();
        assert!(matches!(err, DaemonError::Io { .. }));
    }
}
