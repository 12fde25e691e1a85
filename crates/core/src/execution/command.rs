//! Subprocess execution
//!
//! This module runs external commands for operations that delegate their work
//! to another program. Output of both streams is forwarded line by line to the
//! operation's console while the process runs.

use std::io::{BufRead, BufReader, Read};
use std::path::PathBuf;
use std::process::{Command, Stdio};

use anyhow::Context;
use stager_operation_protocol::{ConsoleOutput, Operation, OperationKind};

/// Everything needed to start one external process
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSpec {
    program: String,
    args: Vec<String>,
    working_dir: PathBuf,
    env: Vec<(String, String)>,
}

impl ProcessSpec {
    pub fn new(program: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: working_dir.into(),
            env: Vec::new(),
        }
    }

    /// Build from an argv list whose first element is the program
    pub fn from_argv(argv: &[String], working_dir: impl Into<PathBuf>) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(program.clone(), working_dir).args(args.iter().cloned()))
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Space-joined program and arguments
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        for (key, value) in &self.env {
            command.env(key, value);
        }
        command
    }
}

/// An operation that runs an external process to completion
#[derive(Debug, Clone)]
pub struct SubprocessOperation {
    name: String,
    summary: String,
    spec: ProcessSpec,
}

impl SubprocessOperation {
    /// The summary is the command line
    pub fn new(name: impl Into<String>, spec: ProcessSpec) -> Self {
        Self {
            name: name.into(),
            summary: spec.command_line(),
            spec,
        }
    }
}

impl Operation for SubprocessOperation {
    fn name(&self) -> &str {
        &self.name
    }

    fn summary(&self) -> String {
        self.summary.clone()
    }

    fn kind(&self) -> OperationKind {
        OperationKind::Subprocess
    }

    fn run(&mut self, console: &ConsoleOutput) -> anyhow::Result<()> {
        tracing::debug!(
            operation = %self.name,
            command = %self.spec.command_line(),
            cwd = %self.spec.working_dir.display(),
            "spawning process"
        );

        let mut child = self
            .spec
            .to_command()
            .spawn()
            .with_context(|| format!("Failed to execute command '{}'", self.spec.program))?;

        let stdout = child.stdout.take().context("Child stdout was not captured")?;
        let stderr = child.stderr.take().context("Child stderr was not captured")?;

        std::thread::scope(|scope| {
            scope.spawn(|| forward_lines(stdout, console));
            scope.spawn(|| forward_lines(stderr, console));
        });

        let status = child
            .wait()
            .with_context(|| format!("Failed to wait for command '{}'", self.spec.program))?;

        if !status.success() {
            anyhow::bail!(
                "Command '{}' failed with exit code {}",
                self.spec.command_line(),
                status.code().unwrap_or(-1)
            );
        }

        Ok(())
    }
}

/// Append each line of `stream` to `console` as it arrives
fn forward_lines(stream: impl Read, console: &ConsoleOutput) {
    let mut reader = BufReader::new(stream);
    let mut line = Vec::new();
    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line) {
            Ok(0) => break,
            Ok(_) => console.append(String::from_utf8_lossy(&line).into_owned()),
            Err(e) => {
                tracing::warn!(error = %e, "stopped reading process output");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_and_summary() {
        let spec = ProcessSpec::new("composer", "/srv/app")
            .args(["install", "--no-interaction"])
            .env("COMPOSER_NO_INTERACTION", "1");
        assert_eq!(spec.command_line(), "composer install --no-interaction");

        let op = SubprocessOperation::new("composer-install", spec.clone());
        assert_eq!(op.summary(), "composer install --no-interaction");
        assert_eq!(op.kind(), OperationKind::Subprocess);
    }

    #[test]
    fn test_from_argv() {
        let argv = vec!["php".to_string(), "composer.phar".to_string()];
        let spec = ProcessSpec::from_argv(&argv, "/srv/app").unwrap().arg("install");
        assert_eq!(spec, ProcessSpec::new("php", "/srv/app").args(["composer.phar", "install"]));
        assert!(ProcessSpec::from_argv(&[], "/srv/app").is_none());
    }

    #[test]
    fn test_missing_program_fails() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut op = SubprocessOperation::new(
            "missing",
            ProcessSpec::new("stager-test-no-such-binary", temp_dir.path()),
        );
        let err = op.run(&ConsoleOutput::new()).unwrap_err();
        assert!(err.to_string().contains("Failed to execute command"));
    }

    #[cfg(unix)]
    #[test]
    fn test_output_lines_reach_console() {
        let temp_dir = tempfile::tempdir().unwrap();
        let spec = ProcessSpec::new("sh", temp_dir.path())
            .arg("-c")
            .arg("echo one; echo two; echo oops >&2");
        let mut op = SubprocessOperation::new("echo", spec);
        let console = ConsoleOutput::new();

        op.run(&console).unwrap();

        let mut chunks = console.snapshot();
        chunks.sort();
        assert_eq!(chunks, vec!["one\n", "oops\n", "two\n"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_non_zero_exit_is_an_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let spec = ProcessSpec::new("sh", temp_dir.path())
            .arg("-c")
            .arg("echo partial; exit 3");
        let mut op = SubprocessOperation::new("fail", spec);
        let console = ConsoleOutput::new();

        let err = op.run(&console).unwrap_err();
        assert!(err.to_string().contains("exit code 3"));
        assert_eq!(console.snapshot(), vec!["partial\n"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_environment_and_working_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::write(temp_dir.path().join("marker.txt"), "").unwrap();
        let spec = ProcessSpec::new("sh", temp_dir.path())
            .arg("-c")
            .arg("ls; echo $STAGER_TEST_VALUE")
            .env("STAGER_TEST_VALUE", "42");
        let mut op = SubprocessOperation::new("env", spec);
        let console = ConsoleOutput::new();

        op.run(&console).unwrap();

        assert_eq!(console.snapshot(), vec!["marker.txt\n", "42\n"]);
    }
}
