use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgAction, Parser};
use log::LevelFilter;

use droidpatch::patcher::locator::LocatorKind;
use droidpatch::{resolve_config, ConfigOverrides, LogCollector, Orchestrator, OrchestratorError};

/// Patch a generated Android project so it builds with the extra
/// capabilities the app needs.
#[derive(Parser, Debug)]
#[command(name = "droidpatch", version, about)]
struct Cli {
    /// Generated Android project root
    #[arg(long, value_name = "DIR")]
    project: Option<PathBuf>,

    /// Config file (default: ./droidpatch.toml when present)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Launcher icon source directory
    #[arg(long, value_name = "DIR")]
    icons: Option<PathBuf>,

    /// Generator command to run before patching
    #[arg(long, value_name = "CMD")]
    generate: Option<String>,

    /// Compute every outcome without writing
    #[arg(long)]
    dry_run: bool,

    /// Brace matching strategy: raw or lexical
    #[arg(long, value_name = "KIND")]
    locator: Option<LocatorKind>,

    /// Persist logs to <DIR>/<timestamp>_droidpatch.log
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    /// More output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Print the run report as JSON on stdout
    #[arg(long)]
    print_report: bool,
}

fn level_for(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn run(cli: Cli) -> anyhow::Result<i32> {
    let cwd = std::env::current_dir().context("Failed to determine working directory")?;

    let (config, source) = resolve_config(cli.config.as_deref(), &cwd)?;
    let config = ConfigOverrides {
        project_root: cli.project,
        icon_source: cli.icons,
        generator_command: cli.generate,
        locator: cli.locator,
        log_dir: cli.log_dir,
        dry_run: cli.dry_run,
    }
    .apply(config);
    config.validate()?;

    let collector = LogCollector::new(config.log_dir.as_deref(), level_for(cli.verbose), true)
        .map_err(anyhow::Error::msg)?;
    if let Err(e) = collector.install() {
        eprintln!("[Main] WARNING: {}", e);
    }
    match &source {
        Some(path) => log::info!("[Main] config loaded from {}", path.display()),
        None => log::debug!("[Main] using built-in defaults"),
    }

    let result = Orchestrator::new(config, &cwd).run();
    let code = match result {
        Ok(report) => {
            if cli.print_report {
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            if let Some(reason) = &report.mandatory_failure {
                log::error!("[Main] mandatory step failed: {}", reason);
            }
            report.exit_code()
        }
        Err(e) => {
            log::error!("[Main] {}", e);
            e.exit_code()
        }
    };

    if let Err(e) = collector.wait_for_empty() {
        eprintln!("[Main] WARNING: Failed to flush logs: {}", e);
    }
    Ok(code)
}

fn main() {
    let cli = Cli::parse();
    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("droidpatch: {:#}", e);
            e.downcast_ref::<OrchestratorError>().map_or(1, |e| e.exit_code())
        }
    };
    std::process::exit(code);
}
