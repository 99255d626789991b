use std::path::{Path, PathBuf};

use super::{ExternalTool, Runner, ToolCommand};
use crate::error::{FlashError, FlashResult};

pub const LITTLEFS_BLOCK_SIZE: u32 = 4096;
pub const LITTLEFS_PAGE_SIZE: u32 = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRequest {
    pub source_dir: PathBuf,
    pub image_path: PathBuf,
    pub size_bytes: u64,
}

/// Wraps `mklittlefs -c <dir> -b <block> -p <page> -s <size> <image>`.
#[derive(Debug, Clone)]
pub struct ImageBuilder {
    tool: PathBuf,
    block_size: u32,
    page_size: u32,
}

impl ImageBuilder {
    pub fn new(tool: impl Into<PathBuf>) -> Self {
        Self {
            tool: tool.into(),
            block_size: LITTLEFS_BLOCK_SIZE,
            page_size: LITTLEFS_PAGE_SIZE,
        }
    }

    pub fn with_geometry(mut self, block_size: u32, page_size: u32) -> Self {
        self.block_size = block_size;
        self.page_size = page_size;
        self
    }

    pub fn block_count(&self, size_bytes: u64) -> u64 {
        size_bytes.checked_div(u64::from(self.block_size)).unwrap_or(0)
    }

    pub fn build(&self, runner: &dyn Runner, request: &BuildRequest) -> FlashResult<()> {
        if let Some(parent) = request.image_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| FlashError::io(parent, e))?;
        }

        debug!(
            "LittleFS geometry: {} blocks of {} bytes, page {} bytes",
            self.block_count(request.size_bytes),
            self.block_size,
            self.page_size
        );

        let output = self.invoke(runner, request)?;
        for line in output.stdout.lines().filter(|l| !l.trim().is_empty()) {
            debug!("mklittlefs: {}", line);
        }
        info!("LittleFS image created: {}", request.image_path.display());
        Ok(())
    }
}

impl ExternalTool for ImageBuilder {
    type Request = BuildRequest;

    fn name(&self) -> &str {
        "mklittlefs"
    }

    fn location(&self) -> &Path {
        &self.tool
    }

    fn action(&self) -> &str {
        "Building LittleFS image"
    }

    fn command(&self, request: &BuildRequest) -> ToolCommand {
        let mut cmd = ToolCommand::new(&self.tool);
        cmd.arg("-c")
            .arg(&request.source_dir)
            .arg("-b")
            .arg(self.block_size.to_string())
            .arg("-p")
            .arg(self.page_size.to_string())
            .arg("-s")
            .arg(request.size_bytes.to_string())
            .arg(&request.image_path)
            .capture(true);
        cmd
    }
}
