//! External tools: `mklittlefs` builds images, `esptool.py` writes them.
//!
//! Each tool turns a request into a [`ToolCommand`]; a [`Runner`] executes
//! it. Tests swap the runner for one that records commands.

mod command;
pub mod esptool;
pub mod locate;
pub mod mklittlefs;
mod runner;

use std::path::Path;

use crate::error::{FlashError, FlashResult};

pub use command::ToolCommand;
pub use esptool::{Flasher, UploadRequest};
pub use mklittlefs::{BuildRequest, ImageBuilder};
pub use runner::{DryRunRunner, Runner, SystemRunner, ToolOutput};

pub trait ExternalTool {
    type Request;

    fn name(&self) -> &str;

    /// File that must exist before the tool can run.
    fn location(&self) -> &Path;

    /// Log line prefix for the command about to run.
    fn action(&self) -> &str;

    fn command(&self, request: &Self::Request) -> ToolCommand;

    fn invoke(&self, runner: &dyn Runner, request: &Self::Request) -> FlashResult<ToolOutput> {
        let location = self.location();
        if !location.is_file() {
            return Err(FlashError::ToolNotFound {
                tool: self.name().to_string(),
                path: location.to_path_buf(),
            });
        }

        let cmd = self.command(request);
        info!("{}: {}", self.action(), cmd);

        let output = runner.run(&cmd)?;
        if !output.success {
            return Err(FlashError::ToolExecutionFailed {
                tool: self.name().to_string(),
                status: output.status_text(),
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output)
    }
}
