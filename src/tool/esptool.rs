use std::path::{Path, PathBuf};

use super::{ExternalTool, Runner, ToolCommand};
use crate::error::FlashResult;
use crate::size::format_hex;

pub const DEFAULT_CHIP: &str = "esp32s3";
pub const DEFAULT_UPLOAD_PORT: &str = "COM3";
pub const DEFAULT_UPLOAD_BAUD: u32 = 460_800;
pub const DEFAULT_PYTHON: &str = "python";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub image_path: PathBuf,
    pub offset: u64,
    pub port: String,
    pub baud: u32,
}

/// Wraps `<python> esptool.py --chip <chip> --port <port> --baud <baud>
/// write_flash <offset> <image>`. Output goes straight to the console.
#[derive(Debug, Clone)]
pub struct Flasher {
    python: PathBuf,
    script: PathBuf,
    chip: String,
}

impl Flasher {
    pub fn new(python: impl Into<PathBuf>, script: impl Into<PathBuf>) -> Self {
        Self {
            python: python.into(),
            script: script.into(),
            chip: DEFAULT_CHIP.to_string(),
        }
    }

    pub fn with_chip(mut self, chip: impl Into<String>) -> Self {
        self.chip = chip.into();
        self
    }

    pub fn upload(&self, runner: &dyn Runner, request: &UploadRequest) -> FlashResult<()> {
        self.invoke(runner, request)?;
        info!(
            "LittleFS image written at {}: {}",
            format_hex(request.offset),
            request.image_path.display()
        );
        Ok(())
    }
}

impl ExternalTool for Flasher {
    type Request = UploadRequest;

    fn name(&self) -> &str {
        "esptool"
    }

    fn location(&self) -> &Path {
        &self.script
    }

    fn action(&self) -> &str {
        "Uploading LittleFS image"
    }

    fn command(&self, request: &UploadRequest) -> ToolCommand {
        let mut cmd = ToolCommand::new(&self.python);
        cmd.arg(&self.script)
            .args(["--chip", self.chip.as_str()])
            .args(["--port", request.port.as_str()])
            .arg("--baud")
            .arg(request.baud.to_string())
            .arg("write_flash")
            .arg(format_hex(request.offset))
            .arg(&request.image_path);
        cmd
    }
}
