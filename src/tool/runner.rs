use std::process::Stdio;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use super::command::ToolCommand;
use crate::error::{FlashError, FlashResult};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub success: bool,
    /// `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn ok() -> Self {
        Self {
            success: true,
            code: Some(0),
            ..Default::default()
        }
    }

    pub fn status_text(&self) -> String {
        match self.code {
            Some(code) => format!("exit status {code}"),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Executes prepared tool commands. Blocks until the tool exits.
pub trait Runner {
    fn run(&self, cmd: &ToolCommand) -> FlashResult<ToolOutput>;
}

/// Spawns real processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl Runner for SystemRunner {
    fn run(&self, cmd: &ToolCommand) -> FlashResult<ToolOutput> {
        let mut process = cmd.to_process();

        if cmd.capture {
            let spinner = ProgressBar::new_spinner();
            spinner.set_style(
                ProgressStyle::with_template("{spinner:.green} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            spinner.set_message(format!("running {}", tool_name(cmd)));
            spinner.enable_steady_tick(Duration::from_millis(100));

            let output = process
                .stdin(Stdio::null())
                .output()
                .map_err(|e| FlashError::io(&cmd.program, e));
            spinner.finish_and_clear();
            let output = output?;

            Ok(ToolOutput {
                success: output.status.success(),
                code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            })
        } else {
            let status = process
                .stdin(Stdio::inherit())
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit())
                .status()
                .map_err(|e| FlashError::io(&cmd.program, e))?;
            Ok(ToolOutput {
                success: status.success(),
                code: status.code(),
                ..Default::default()
            })
        }
    }
}

/// Logs each command and reports success without running anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunRunner;

impl Runner for DryRunRunner {
    fn run(&self, cmd: &ToolCommand) -> FlashResult<ToolOutput> {
        info!("[dry-run] {}", cmd);
        Ok(ToolOutput::ok())
    }
}

fn tool_name(cmd: &ToolCommand) -> String {
    cmd.program
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| cmd.program.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dry_run_always_succeeds() {
        let mut cmd = ToolCommand::new("/nonexistent/mklittlefs");
        cmd.arg("-c").arg("data_a");
        let out = DryRunRunner.run(&cmd).unwrap();
        assert!(out.success);
        assert_eq!(out.code, Some(0));
    }

    #[test]
    fn missing_program_is_an_io_error() {
        let cmd = ToolCommand::new("/nonexistent/definitely-not-a-tool");
        let err = SystemRunner.run(&cmd).unwrap_err();
        assert!(matches!(err, FlashError::Io { .. }));
    }

    #[test]
    fn status_text_reports_signal_kills() {
        let out = ToolOutput {
            success: false,
            code: None,
            ..Default::default()
        };
        assert_eq!(out.status_text(), "terminated by signal");
        assert_eq!(ToolOutput::ok().status_text(), "exit status 0");
    }
}
