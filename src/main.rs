use anyhow::Result;
use clap::{Parser, Subcommand};
use dualfs::config::{self, AppConfig, Environment, FlashConfig, Overrides};
use dualfs::partition::PartitionEntry;
use dualfs::size::{format_hex, format_size};
use dualfs::target::{self, Slot, Target};
use dualfs::tool::{DryRunRunner, Runner, SystemRunner};
use log::{error, info};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dualfs")]
#[command(about = "Build and flash LittleFS images for A/B data partitions", long_about = None)]
struct Cli {
    /// Project root holding partitions.csv, data_a/ and data_b/
    #[arg(long, global = true, value_name = "DIR")]
    project_dir: Option<PathBuf>,

    /// Directory receiving littlefs_a.bin / littlefs_b.bin
    #[arg(long, global = true, value_name = "DIR")]
    build_dir: Option<PathBuf>,

    /// Partition table (relative to the project dir)
    #[arg(long, global = true, value_name = "FILE")]
    partitions: Option<PathBuf>,

    /// Serial port for uploads (e.g., COM3 or /dev/ttyUSB0)
    #[arg(short, long, global = true)]
    port: Option<String>,

    /// Upload baud rate
    #[arg(short, long, global = true)]
    baud: Option<u32>,

    /// Python interpreter used to run esptool.py
    #[arg(long, global = true, value_name = "PATH")]
    python: Option<PathBuf>,

    /// Print the tool commands without running them
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build LittleFS image for partition A
    #[command(name = "buildfs_a")]
    BuildfsA,
    /// Build LittleFS image for partition B
    #[command(name = "buildfs_b")]
    BuildfsB,
    /// Build all LittleFS images
    #[command(name = "buildfs_all")]
    BuildfsAll,
    /// Build and upload LittleFS image for partition A
    #[command(name = "uploadfs_a")]
    UploadfsA,
    /// Build and upload LittleFS image for partition B
    #[command(name = "uploadfs_b")]
    UploadfsB,
    /// Build and upload all LittleFS images
    #[command(name = "uploadfs_all")]
    UploadfsAll,

    /// Show the partition table with resolved offsets
    Partitions {
        /// JSON output
        #[arg(long)]
        json: bool,
    },

    /// List available serial ports
    Ports,

    /// Generate configuration file (.dualfs.toml) in current directory
    Genconfig {
        /// Force overwrite existing configuration file
        #[arg(long)]
        force: bool,
    },
}

impl Commands {
    fn target(&self) -> Option<Target> {
        match self {
            Commands::BuildfsA => Some(Target::BUILDFS_A),
            Commands::BuildfsB => Some(Target::BUILDFS_B),
            Commands::BuildfsAll => Some(Target::BUILDFS_ALL),
            Commands::UploadfsA => Some(Target::UPLOADFS_A),
            Commands::UploadfsB => Some(Target::UPLOADFS_B),
            Commands::UploadfsAll => Some(Target::UPLOADFS_ALL),
            _ => None,
        }
    }
}

fn main() -> Result<()> {
    // Default info level, overridable with RUST_LOG
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            use std::io::Write;
            let level_style = buf.default_level_style(record.level());
            writeln!(
                buf,
                "[{} {level_style}{}{level_style:#} {}:{}] {level_style}{}{level_style:#}",
                chrono::Local::now().format("%H:%M:%S"),
                record.level(),
                record.target(),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .init();

    let cli = Cli::parse();

    if let Commands::Genconfig { force } = cli.command {
        if let Err(e) = AppConfig::generate_config_file(force) {
            error!("Error: {}", e);
            std::process::exit(1);
        }
        return Ok(());
    }

    let app_config = load_app_config();
    let overrides = Overrides {
        project_dir: cli.project_dir,
        build_dir: cli.build_dir,
        partitions: cli.partitions,
        port: cli.port,
        baud: cli.baud,
        python: cli.python,
    };
    let flash_config =
        FlashConfig::resolve(&overrides, &Environment::from_process(), app_config.as_ref())?;

    match cli.command {
        Commands::Partitions { json } => {
            let entries = flash_config.partition_table()?.entries()?;
            print_partitions(&flash_config, &entries, json)?;
        }
        Commands::Ports => dualfs::serial::list(&flash_config.upload_port)?,
        Commands::Genconfig { .. } => {}
        command => {
            if let Some(target) = command.target()
                && !run_target(target, &flash_config, cli.dry_run)
            {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

/// Returns whether every slot of the target succeeded.
fn run_target(target: Target, flash_config: &FlashConfig, dry_run: bool) -> bool {
    let runner: &dyn Runner = if dry_run { &DryRunRunner } else { &SystemRunner };
    let report = target::run_target(target, flash_config, runner);
    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(slot) if slot.uploaded => info!(
                "{} partition {}: {} written at {}",
                report.target,
                outcome.slot,
                slot.image_path.display(),
                format_hex(slot.partition.offset)
            ),
            Ok(slot) => info!(
                "{} partition {}: {}",
                report.target,
                outcome.slot,
                slot.image_path.display()
            ),
            Err(_) => error!("{} partition {}: failed", report.target, outcome.slot),
        }
    }
    report.success()
}

fn load_app_config() -> Option<AppConfig> {
    let config_path = config::CONFIG_FILE;
    if !std::path::Path::new(config_path).exists() {
        return None;
    }
    match AppConfig::load_from_file(config_path) {
        Ok(cfg) => {
            let abs_path = std::fs::canonicalize(config_path)
                .unwrap_or_else(|_| PathBuf::from(config_path));
            info!("Using configuration file: {}", abs_path.display());
            Some(cfg)
        }
        Err(e) => {
            error!("Failed to load configuration file: {}, using defaults", e);
            None
        }
    }
}

fn print_partitions(config: &FlashConfig, entries: &[PartitionEntry], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(entries)?);
        return Ok(());
    }

    println!("Partition table: {}", config.partitions_csv.display());
    if entries.is_empty() {
        println!("No partitions found.");
        return Ok(());
    }
    for e in entries {
        let slot = Slot::ALL
            .into_iter()
            .find(|s| s.partition_name() == e.name)
            .map(|s| format!("  [slot {s}]"))
            .unwrap_or_default();
        println!(
            "{:<16} {:<5} {:<9} offset={:<10} size={}{}",
            e.name,
            e.kind,
            e.subtype,
            format_hex(e.offset),
            format_size(e.size),
            slot
        );
    }
    Ok(())
}
