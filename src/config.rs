use anyhow::{Context, bail};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{FlashError, FlashResult};
use crate::partition::PartitionTable;
use crate::target::Slot;
use crate::tool::esptool::{DEFAULT_CHIP, DEFAULT_PYTHON, DEFAULT_UPLOAD_BAUD, DEFAULT_UPLOAD_PORT};
use crate::tool::locate::{locate_esptool, locate_mklittlefs, platformio_packages_dir};
use crate::tool::mklittlefs::{LITTLEFS_BLOCK_SIZE, LITTLEFS_PAGE_SIZE};
use crate::tool::{Flasher, ImageBuilder};

pub const CONFIG_FILE: &str = ".dualfs.toml";
pub const PARTITIONS_FILE: &str = "partitions.csv";
pub const DEFAULT_BUILD_DIR: &str = ".pio/build";

/// Contents of `.dualfs.toml`. Every field is optional.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<ProjectConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload: Option<UploadConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolsConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProjectConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub build_dir: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partitions: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UploadConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baud: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chip: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ToolsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub python: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mklittlefs: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub esptool: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub packages_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ImageConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

impl AppConfig {
    pub fn load_from_file(path: &str) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn generate_config_file(force: bool) -> anyhow::Result<()> {
        if Path::new(CONFIG_FILE).exists() && !force {
            bail!(
                "Configuration file {} already exists. Use --force to overwrite.",
                CONFIG_FILE
            );
        }

        fs::write(CONFIG_FILE, Self::generate_full_config()?)
            .with_context(|| format!("failed to write {CONFIG_FILE}"))?;

        info!("Configuration file generated: {}", CONFIG_FILE);
        info!("Please edit this file to customize configuration");
        Ok(())
    }

    pub fn generate_full_config() -> anyhow::Result<String> {
        let config = AppConfig {
            project: Some(ProjectConfig {
                dir: Some(PathBuf::from(".")),
                build_dir: Some(PathBuf::from(DEFAULT_BUILD_DIR)),
                partitions: Some(PathBuf::from(PARTITIONS_FILE)),
            }),
            upload: Some(UploadConfig {
                port: Some(DEFAULT_UPLOAD_PORT.to_string()),
                baud: Some(DEFAULT_UPLOAD_BAUD),
                chip: Some(DEFAULT_CHIP.to_string()),
            }),
            tools: Some(ToolsConfig {
                python: Some(PathBuf::from(DEFAULT_PYTHON)),
                ..Default::default()
            }),
            image: Some(ImageConfig {
                block_size: Some(LITTLEFS_BLOCK_SIZE),
                page_size: Some(LITTLEFS_PAGE_SIZE),
            }),
        };
        let toml_content = toml::to_string_pretty(&config)?;
        Ok(format!(
            "# dualfs configuration file\n\
             # All fields are optional. Command line arguments and the PlatformIO\n\
             # environment (UPLOAD_PORT, UPLOAD_SPEED, BUILD_DIR, PYTHONEXE, PROJECT_DIR)\n\
             # override values set here.\n\
             # [tools] also accepts mklittlefs, esptool and packages_dir paths.\n\n{}",
            toml_content
        ))
    }
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub project_dir: Option<PathBuf>,
    pub build_dir: Option<PathBuf>,
    pub partitions: Option<PathBuf>,
    pub port: Option<String>,
    pub baud: Option<u32>,
    pub python: Option<PathBuf>,
}

/// Values exported by the host build environment, using PlatformIO's names.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    pub project_dir: Option<String>,
    pub build_dir: Option<String>,
    pub upload_port: Option<String>,
    pub upload_speed: Option<String>,
    pub python: Option<String>,
}

impl Environment {
    pub fn from_process() -> Self {
        let var = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());
        Self {
            project_dir: var("PROJECT_DIR"),
            build_dir: var("BUILD_DIR"),
            upload_port: var("UPLOAD_PORT"),
            upload_speed: var("UPLOAD_SPEED"),
            python: var("PYTHONEXE"),
        }
    }
}

/// Everything an operation needs, resolved once per invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashConfig {
    pub project_dir: PathBuf,
    pub build_dir: PathBuf,
    pub partitions_csv: PathBuf,
    pub upload_port: String,
    pub upload_speed: String,
    pub python_path: PathBuf,
    pub chip: String,
    pub block_size: u32,
    pub page_size: u32,
    pub mklittlefs: PathBuf,
    pub esptool: PathBuf,
}

impl FlashConfig {
    /// Merge sources: command line, then environment, then config file, then
    /// defaults. Relative build and partition paths hang off the project dir.
    pub fn resolve(
        cli: &Overrides,
        env: &Environment,
        file: Option<&AppConfig>,
    ) -> anyhow::Result<Self> {
        let project = file.and_then(|c| c.project.clone()).unwrap_or_default();
        let upload = file.and_then(|c| c.upload.clone()).unwrap_or_default();
        let tools = file.and_then(|c| c.tools.clone()).unwrap_or_default();
        let image = file.and_then(|c| c.image.clone()).unwrap_or_default();

        let project_dir = cli
            .project_dir
            .clone()
            .or_else(|| env.project_dir.as_ref().map(PathBuf::from))
            .or(project.dir)
            .unwrap_or_else(|| PathBuf::from("."));

        let build_dir = cli
            .build_dir
            .clone()
            .or_else(|| env.build_dir.as_ref().map(PathBuf::from))
            .or(project.build_dir)
            .map(|p| project_dir.join(p))
            .unwrap_or_else(|| project_dir.join(DEFAULT_BUILD_DIR));

        let partitions_csv = cli
            .partitions
            .clone()
            .or(project.partitions)
            .map(|p| project_dir.join(p))
            .unwrap_or_else(|| project_dir.join(PARTITIONS_FILE));

        let upload_port = cli
            .port
            .clone()
            .or_else(|| env.upload_port.clone())
            .or(upload.port)
            .unwrap_or_else(|| DEFAULT_UPLOAD_PORT.to_string());

        // Kept verbatim; only uploads need it to be a number.
        let upload_speed = cli
            .baud
            .map(|b| b.to_string())
            .or_else(|| env.upload_speed.clone())
            .or_else(|| upload.baud.map(|b| b.to_string()))
            .unwrap_or_else(|| DEFAULT_UPLOAD_BAUD.to_string());

        let python_path = cli
            .python
            .clone()
            .or_else(|| env.python.as_ref().map(PathBuf::from))
            .or(tools.python)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PYTHON));

        let block_size = image.block_size.unwrap_or(LITTLEFS_BLOCK_SIZE);
        let page_size = image.page_size.unwrap_or(LITTLEFS_PAGE_SIZE);
        if block_size == 0 || page_size == 0 {
            bail!("image block_size and page_size must be non-zero");
        }

        let packages = tools.packages_dir.or_else(platformio_packages_dir);

        Ok(Self {
            project_dir,
            build_dir,
            partitions_csv,
            upload_port,
            upload_speed,
            python_path,
            chip: upload.chip.unwrap_or_else(|| DEFAULT_CHIP.to_string()),
            block_size,
            page_size,
            mklittlefs: locate_mklittlefs(tools.mklittlefs.as_deref(), packages.as_deref()),
            esptool: locate_esptool(tools.esptool.as_deref(), packages.as_deref()),
        })
    }

    pub fn upload_baud(&self) -> FlashResult<u32> {
        self.upload_speed
            .trim()
            .parse()
            .map_err(|e: std::num::ParseIntError| {
                FlashError::parse(&self.upload_speed, format!("invalid upload speed: {e}"))
            })
    }

    pub fn partition_table(&self) -> FlashResult<PartitionTable> {
        PartitionTable::load(&self.partitions_csv)
    }

    pub fn data_dir(&self, slot: Slot) -> PathBuf {
        self.project_dir.join(slot.data_dir_name())
    }

    pub fn image_path(&self, slot: Slot) -> PathBuf {
        self.build_dir.join(slot.image_file_name())
    }

    pub fn image_builder(&self) -> ImageBuilder {
        ImageBuilder::new(&self.mklittlefs).with_geometry(self.block_size, self.page_size)
    }

    pub fn flasher(&self) -> Flasher {
        Flasher::new(&self.python_path, &self.esptool).with_chip(&self.chip)
    }
}
