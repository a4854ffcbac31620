mod error;

use std::collections::HashMap;
use std::ffi::OsStr;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tapscript_core::action::{ActionResult, Recorder};
use tapscript_core::config::InterpreterConfig;
use tapscript_core::interpreter::{Collaborators, Interpreter};
use tapscript_core::parser::{parse_with, Script};
use tapscript_core::sink::ImageMatch;
use tapscript_core::validate::validate_commands;

use crate::error::AutoError;

#[derive(Parser)]
#[command(name = "tapscript-auto", about = "Runner for tapscript touch automation scripts")]
struct Cli {
    /// Interpreter config file (defaults to ~/.tapscript/config.json)
    #[arg(long, global = true, env = "TAPSCRIPT_CONFIG")]
    config: Option<PathBuf>,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a script against a recording device and print what it dispatched
    Run {
        /// Path to the script file (reads stdin if omitted)
        script: Option<PathBuf>,
        /// JSON object mapping template paths to image matches
        #[arg(long)]
        images: Option<PathBuf>,
        /// Append every recorded action to this JSON Lines file
        #[arg(long)]
        record: Option<PathBuf>,
        /// Skip the pause after each gesture
        #[arg(long)]
        no_settle: bool,
    },
    /// Report parse errors and validation warnings without running
    Check {
        /// Path to the script file (reads stdin if omitted)
        script: Option<PathBuf>,
    },
}

fn init_tracing(log_file: Option<&Path>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .unwrap_or_else(|| OsStr::new("tapscript-auto.log"));
            let file_appender = tracing_appender::rolling::never(dir, name);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(file_appender)
                .with_ansi(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_file.as_deref());

    let result = match cli.command {
        Command::Run {
            script,
            images,
            record,
            no_settle,
        } => {
            run_script(
                script,
                cli.config.as_deref(),
                images.as_deref(),
                record.as_deref(),
                no_settle,
            )
            .await
        }
        Command::Check { script } => check_script(script, cli.config.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(e.exit_code());
    }
}

fn load_config(path: Option<&Path>) -> Result<InterpreterConfig, AutoError> {
    match path {
        Some(path) => InterpreterConfig::load_from(path).map_err(|e| AutoError::Config {
            message: format!("{}: {}", path.display(), e),
        }),
        None => Ok(InterpreterConfig::load()),
    }
}

fn read_source(script_path: Option<&Path>) -> Result<String, AutoError> {
    match script_path {
        Some(path) => Ok(std::fs::read_to_string(path)?),
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        }
    }
}

fn load_images(path: &Path) -> Result<HashMap<String, ImageMatch>, AutoError> {
    let json = std::fs::read_to_string(path)?;
    serde_json::from_str(&json).map_err(|e| AutoError::Config {
        message: format!("invalid image map {}: {}", path.display(), e),
    })
}

fn parse_script(source: &str, config: &InterpreterConfig) -> Script {
    let script = parse_with(source, &config.parse_options());
    info!(
        commands = script.commands.len(),
        errors = script.errors.len(),
        "script parsed"
    );
    script
}

async fn run_script(
    script_path: Option<PathBuf>,
    config_path: Option<&Path>,
    images: Option<&Path>,
    record: Option<&Path>,
    no_settle: bool,
) -> Result<(), AutoError> {
    let mut config = load_config(config_path)?;
    if no_settle {
        config.settle_delay_ms = 0;
    }

    let source = read_source(script_path.as_deref())?;
    let script = parse_script(&source, &config);
    for e in &script.errors {
        eprintln!("warning: {}", e);
    }

    let mut recorder = Recorder::new();
    if let Some(path) = images {
        recorder = recorder.with_images(load_images(path)?);
    }
    if let Some(path) = record {
        recorder = recorder.with_log_file(path)?;
    }
    let device = Arc::new(recorder);
    let interpreter = Arc::new(Interpreter::new(Collaborators::from_device(device.clone()), config));

    let handle = interpreter.start(script.commands);

    let interrupt = {
        let interpreter = interpreter.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupted, cancelling run");
                interpreter.stop();
            }
        })
    };

    let report = handle.wait().await;
    interrupt.abort();
    let report = report?;

    for record in device.records() {
        match &record.result {
            ActionResult::Success => println!("{}", record.action),
            ActionResult::Failure(message) => println!("{} [failed: {}]", record.action, message),
        }
    }
    for e in &report.errors {
        eprintln!("error: {}", e);
    }
    println!(
        "{:?}: {} steps, {} actions, {} errors",
        report.outcome,
        report.steps,
        device.records().len(),
        report.errors.len()
    );

    Ok(())
}

fn check_script(script_path: Option<PathBuf>, config_path: Option<&Path>) -> Result<(), AutoError> {
    let config = load_config(config_path)?;
    let source = read_source(script_path.as_deref())?;
    let script = parse_script(&source, &config);
    let warnings = validate_commands(&script.commands);

    for e in &script.errors {
        println!("error: {}", e);
    }
    for w in &warnings {
        println!("warning: {}", w);
    }
    println!(
        "{} parse error(s), {} warning(s)",
        script.errors.len(),
        warnings.len()
    );

    if script.is_clean() {
        Ok(())
    } else {
        Err(AutoError::Parse {
            errors: script.errors.len(),
        })
    }
}
