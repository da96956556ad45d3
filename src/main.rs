//! Zoom 1132 Reset - command line entry point

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use zoom_reset::core::reset::target_paths;
use zoom_reset::platform::{self, PathEnv, TargetOs};
use zoom_reset::{
    perform_reset_with, KillStatus, MoveOutcome, ResetConfig, ResetError, ResetOptions,
    ResetReport, ResetResult, ResetStep,
};

#[derive(Parser)]
#[command(name = "zoom-reset")]
#[command(about = "Reset Zoom data after a 1132 error", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    reset: ResetArgs,

    /// Config file (default: <config dir>/zoom-reset/config.toml)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Show debug logging on stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Args)]
struct ResetArgs {
    /// Show actions without executing them
    #[arg(long)]
    dry_run: bool,

    /// Do not attempt to terminate running Zoom processes
    #[arg(long)]
    skip_kill: bool,

    /// Directory to store backups (default: ~/.zoom-reset-backups)
    #[arg(long, value_name = "DIR")]
    backup_dir: Option<PathBuf>,
}

impl ResetArgs {
    fn merge(self, other: ResetArgs) -> ResetArgs {
        ResetArgs {
            dry_run: self.dry_run || other.dry_run,
            skip_kill: self.skip_kill || other.skip_kill,
            backup_dir: other.backup_dir.or(self.backup_dir),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Stop Zoom and back up its state (the default)
    Reset(ResetArgs),

    /// List the Zoom state locations for this system
    Paths,

    /// List running Zoom processes
    Processes,

    /// Show the effective configuration
    Config,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("zoom-reset: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> ResetResult<ExitCode> {
    let config = match &cli.config {
        Some(path) => ResetConfig::load(path)?,
        None => ResetConfig::load_or_default()?,
    };

    match cli.command {
        None => reset(&config, cli.reset),
        Some(Commands::Reset(args)) => reset(&config, cli.reset.merge(args)),

        Some(Commands::Paths) => {
            let os = TargetOs::detect()?;
            let env = PathEnv::from_system()?;
            println!("Zoom state locations ({}):", os);
            for path in target_paths(os, &env, &config) {
                let marker = if path.exists() { "present" } else { "absent " };
                println!("  [{}] {}", marker, path.display());
            }
            Ok(ExitCode::SUCCESS)
        }

        Some(Commands::Processes) => {
            let processes = platform::find_processes(&config.process_pattern)?;
            if processes.is_empty() {
                println!("No Zoom processes found");
            }
            for process in &processes {
                println!(
                    "{:>7}  {:24} {}",
                    process.pid,
                    process.name,
                    process.command.as_deref().unwrap_or("")
                );
            }
            Ok(ExitCode::SUCCESS)
        }

        Some(Commands::Config) => {
            let rendered = toml::to_string_pretty(&config).map_err(|e| ResetError::Config {
                path: cli.config.clone().unwrap_or_default(),
                message: e.to_string(),
            })?;
            if let Some(path) = cli.config.or_else(ResetConfig::default_path) {
                println!("# {}", path.display());
            }
            println!("{}", rendered);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn reset(config: &ResetConfig, args: ResetArgs) -> ResetResult<ExitCode> {
    let os = TargetOs::detect()?;
    let env = PathEnv::from_system()?;
    let options = ResetOptions::from_config(config, args.dry_run, args.skip_kill, args.backup_dir);

    if options.dry_run {
        println!("DRY RUN - No changes will be made");
    }

    let now = chrono::Local::now().naive_local();
    let mut handled = 0;
    let report = perform_reset_with(os, &env, config, &options, now, &mut |step| {
        print_step(step, &mut handled)
    })?;
    print_summary(&report, handled);

    if report.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

/// Print one progress line; `handled` counts backup lines shown so far.
fn print_step(step: ResetStep<'_>, handled: &mut usize) {
    match step {
        ResetStep::Detected(os) => println!("Detected system: {}", os),
        ResetStep::KillSkipped => println!("Skipping process termination step"),
        ResetStep::ProcessesFound([]) => println!("No Zoom processes found"),
        ResetStep::ProcessesFound(found) => {
            println!("Found {} running Zoom process(es)", found.len())
        }
        ResetStep::Killed(outcome) => {
            println!("{}", outcome);
            if matches!(outcome.status, KillStatus::PermissionDenied(_)) {
                println!(
                    "Could not stop PID {}; quit Zoom manually and retry",
                    outcome.process.pid
                );
            }
        }
        ResetStep::StillRunning(pids) => {
            println!("Still running after timeout: {:?}; continuing anyway", pids)
        }
        ResetStep::Backup(MoveOutcome::Skipped { .. }) => {}
        ResetStep::Backup(outcome) => {
            *handled += 1;
            println!("{}", outcome);
        }
    }
}

fn print_summary(report: &ResetReport, handled: usize) {
    if handled == 0 {
        println!("No Zoom data found to back up");
    } else if !report.dry_run {
        println!("Backup saved in {}", report.backup_dir.display());
    }

    if report.is_success() {
        println!("Reset complete. You can reopen Zoom and sign in again.");
    } else {
        println!(
            "Reset finished with {} error(s); see messages above.",
            report.failures().count()
        );
    }
}
