//! Thin wrapper around [`std::process::Command`] for running host tools.
//!
//! Every converter the builder drives goes through [`Cmd`], so failures
//! carry the same shape: a caller-chosen message, the exit status, and the
//! tool's trimmed stderr.

use anyhow::{bail, Context, Result};
use std::ffi::OsString;
use std::path::Path;
use std::process::Command;

/// Builder for a single external command invocation.
#[derive(Debug)]
pub struct Cmd {
    program: String,
    args: Vec<OsString>,
    error_msg: Option<String>,
}

impl Cmd {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            error_msg: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Append a path argument without lossy string conversion.
    pub fn arg_path(mut self, path: &Path) -> Self {
        self.args.push(path.as_os_str().to_owned());
        self
    }

    /// Message used when the command cannot be spawned or exits nonzero.
    pub fn error_msg(mut self, msg: impl Into<String>) -> Self {
        self.error_msg = Some(msg.into());
        self
    }

    /// Render the command line for log output.
    pub fn display(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }

    /// Run to completion. Output is captured; stderr ends up in the error.
    pub fn run(self) -> Result<()> {
        log::debug!("running: {}", self.display());

        let output = Command::new(&self.program)
            .args(&self.args)
            .output()
            .with_context(|| match &self.error_msg {
                Some(msg) => format!("{} ({} could not be started)", msg, self.program),
                None => format!("failed to start '{}'", self.program),
            })?;

        if output.status.success() {
            return Ok(());
        }

        let headline = self
            .error_msg
            .unwrap_or_else(|| format!("'{}' failed", self.program));
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        if stderr.is_empty() {
            bail!("{} (status {})", headline, output.status);
        }
        bail!("{} (status {}): {}", headline, output.status, stderr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successful_command_is_ok() {
        assert!(Cmd::new("sh").args(["-c", "echo hello"]).run().is_ok());
    }

    #[test]
    fn nonzero_exit_reports_message_and_stderr() {
        let err = Cmd::new("sh")
            .args(["-c", "echo broken >&2; exit 3"])
            .error_msg("converter failed")
            .run()
            .unwrap_err();
        let msg = format!("{:#}", err);
        assert!(msg.contains("converter failed"));
        assert!(msg.contains("broken"));
    }

    #[test]
    fn silent_failure_reports_status() {
        let msg = format!("{:#}", Cmd::new("false").run().unwrap_err());
        assert!(msg.contains("'false' failed"));
        assert!(msg.contains("status"));
    }

    #[test]
    fn missing_program_is_an_error() {
        let err = Cmd::new("definitely_not_a_real_command_12345")
            .error_msg("rasterizer unavailable")
            .run()
            .unwrap_err();
        assert!(format!("{:#}", err).contains("rasterizer unavailable"));
    }

    #[test]
    fn display_joins_arguments() {
        let cmd = Cmd::new("sips")
            .args(["-z", "16", "16"])
            .arg_path(Path::new("in.png"));
        assert_eq!(cmd.display(), "sips -z 16 16 in.png");
    }
}
