//! # Phomemo CLI
//!
//! Command-line interface for rendering and printing label layouts.
//!
//! ## Usage
//!
//! ```bash
//! # Render a preview only (default)
//! phomemo render label.json
//!
//! # Render and print over Bluetooth
//! phomemo render --print --address DC:0D:30:AA:BB:CC label.json
//!
//! # Print through an already-bound serial device
//! phomemo render --print --device /dev/rfcomm0 label.json
//!
//! # Check a job document without rendering
//! phomemo validate label.json
//! ```
//!
//! Printer settings can also come from `PHOMEMO_PRINTER_ADDRESS`,
//! `PHOMEMO_PRINTER_CHANNEL` and `PHOMEMO_PRINTER_DEVICE`, including via a
//! `.env` file.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::{Value, json};

use phomemo_layout::{
    LayoutJobPipeline,
    document::LayoutValidator,
    pipeline::RunOptions,
    transport::PrinterTarget,
};

/// Phomemo - label layout renderer and printer
#[derive(Parser, Debug)]
#[command(name = "phomemo")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render a layout job, and optionally print it
    Render {
        /// Layout job JSON file
        job: PathBuf,

        /// Send to the printer (otherwise only a preview is rendered)
        #[arg(long)]
        print: bool,

        /// Never send, even with --print
        #[arg(long)]
        dry_run: bool,

        /// Printer Bluetooth MAC address
        #[arg(long, env = "PHOMEMO_PRINTER_ADDRESS")]
        address: Option<String>,

        /// RFCOMM channel
        #[arg(long, env = "PHOMEMO_PRINTER_CHANNEL", default_value_t = 1)]
        channel: u8,

        /// Bound serial device, used instead of the address
        #[arg(long, env = "PHOMEMO_PRINTER_DEVICE")]
        device: Option<PathBuf>,
    },

    /// Check a layout job against the schema
    Validate {
        /// Layout job JSON file
        job: PathBuf,
    },
}

fn main() -> ExitCode {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Render {
            job,
            print,
            dry_run,
            address,
            channel,
            device,
        } => {
            let target = match (device, address) {
                (Some(device), _) => Some(PrinterTarget::Device(device)),
                (None, Some(address)) => Some(PrinterTarget::Rfcomm { address, channel }),
                (None, None) => None,
            };
            let options = RunOptions {
                target,
                dry_run: dry_run || !print,
            };
            render(&job, &options)
        }
        Commands::Validate { job } => validate(&job),
    }
}

fn render(job: &Path, options: &RunOptions) -> ExitCode {
    if !job.is_file() {
        eprintln!("Error: job file not found: {}", job.display());
        return ExitCode::from(2);
    }

    match LayoutJobPipeline::default().run(job, options) {
        Ok(result) => match serde_json::to_value(&result) {
            Ok(value) => {
                print_json(&value);
                ExitCode::SUCCESS
            }
            Err(e) => {
                print_json(&json!({"info": {"error": e.to_string()}}));
                ExitCode::FAILURE
            }
        },
        Err(e) => {
            log::error!("{}", e);
            print_json(&json!({"info": {"error": e.to_string()}}));
            ExitCode::FAILURE
        }
    }
}

fn validate(job: &Path) -> ExitCode {
    let document: Value = match fs::read_to_string(job)
        .map_err(|e| e.to_string())
        .and_then(|raw| serde_json::from_str(&raw).map_err(|e| e.to_string()))
    {
        Ok(document) => document,
        Err(e) => {
            eprintln!("Error: cannot load {}: {}", job.display(), e);
            return ExitCode::from(2);
        }
    };

    let violations = LayoutValidator::shared().check(&document);
    if violations.is_empty() {
        println!("ok");
        return ExitCode::SUCCESS;
    }

    println!("layout job schema validation failed:");
    for violation in &violations {
        println!("{}", violation);
    }
    ExitCode::FAILURE
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(_) => println!("{}", value),
    }
}
