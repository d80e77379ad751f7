//! External tool command wrapper (iinfo, magick)

use std::path::Path;
use std::process::{Command, Output};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("{0} not found in system PATH")]
    NotInstalled(String),

    #[error("{program} execution failed: {stderr}")]
    ExecutionFailed { program: String, stderr: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub struct ToolCommand {
    program: String,
    args: Vec<String>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args(mut self, args: &[&str]) -> Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    pub fn path(mut self, path: impl AsRef<Path>) -> Self {
        self.args.push(path.as_ref().display().to_string());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// Run the tool and return its captured output.
    ///
    /// A non-zero exit status is reported as `ExecutionFailed` carrying stderr.
    pub fn execute(self) -> Result<Output, ToolError> {
        debug!("Running: {} {}", self.program, self.args.join(" "));

        let output = Command::new(&self.program)
            .args(&self.args)
            .output()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => ToolError::NotInstalled(self.program.clone()),
                _ => ToolError::ExecutionFailed {
                    program: self.program.clone(),
                    stderr: e.to_string(),
                },
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ToolError::ExecutionFailed {
                program: self.program,
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_collects_args_in_order() {
        let cmd = ToolCommand::new("magick")
            .args(&["-size", "64x32"])
            .arg("canvas:black")
            .path(Path::new("/tmp/out.0001.png"));

        assert_eq!(cmd.program(), "magick");
        assert_eq!(
            cmd.arguments(),
            &["-size", "64x32", "canvas:black", "/tmp/out.0001.png"]
        );
    }

    #[test]
    fn test_missing_program_is_not_installed() {
        let err = ToolCommand::new("mediaseq-definitely-not-a-real-tool")
            .execute()
            .unwrap_err();
        assert!(matches!(err, ToolError::NotInstalled(_)));
    }
}
