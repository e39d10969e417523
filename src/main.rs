// src/main.rs

use anyhow::{Context, Result};
use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use disposal::config::Config;
use disposal::scan::ScanSources;
use std::io;
use std::path::PathBuf;
use tracing::info;

/// Default location of the package cache
const DEFAULT_CACHE_PATH: &str = "/var/cache/disposal/packages.db";

#[derive(Parser)]
#[command(name = "disposal")]
#[command(author, version, about = "Compare installed packages with a from-scratch reinstall", long_about = None)]
struct Cli {
    /// Less diagnostic output; repeat to silence it
    #[arg(short, long, visible_alias = "silent", action = ArgAction::Count, global = true)]
    quiet: u8,

    /// Read configuration from this TOML file
    #[arg(short, long = "config-file", value_name = "FILE", global = true)]
    config_file: Option<PathBuf>,

    /// Override a configuration key, e.g. -o apt.install_recommends=false
    #[arg(short = 'o', long = "option", value_name = "KEY=VALUE", global = true)]
    option: Vec<String>,

    /// Trace mark operations
    #[arg(short = 'm', long, global = true)]
    debug_marker: bool,

    /// Trace dependency auto-installation
    #[arg(short = 'i', long, global = true)]
    debug_autoinstall: bool,

    /// Trace the problem resolver
    #[arg(short = 'p', long, global = true)]
    debug_problemresolver: bool,

    /// Trace the garbage sweep
    #[arg(short = 'r', long, global = true)]
    debug_autoremove: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare the installed system with a simulated clean reinstall
    Scan {
        /// Packages that must not be installed (default: no.txt)
        #[arg(long, value_name = "FILE")]
        no: Option<PathBuf>,

        /// Packages that must be installed (default: yes.txt)
        #[arg(long, value_name = "FILE")]
        yes: Option<PathBuf>,

        /// dpkg status file (default: /var/lib/dpkg/status)
        #[arg(long, value_name = "FILE")]
        status: Option<PathBuf>,

        /// Directory with APT Packages lists (default: /var/lib/apt/lists)
        #[arg(long, value_name = "DIR")]
        lists: Option<PathBuf>,

        /// Read package records from this cache instead of the lists
        #[arg(long, value_name = "DB")]
        cache: Option<PathBuf>,
    },
    /// Cache the package lists in SQLite
    ///
    /// Only index records are cached; scans always read the live dpkg status file.
    BuildCache {
        /// Database path (default: /var/cache/disposal/packages.db)
        #[arg(short, long)]
        db_path: Option<PathBuf>,

        /// Directory with APT Packages lists (default: /var/lib/apt/lists)
        #[arg(long, value_name = "DIR")]
        lists: Option<PathBuf>,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell type
        shell: Shell,
    },
}

/// Log to stderr so stdout carries only scan results
fn init_logging(quiet: u8, debug_targets: &[&str]) {
    let level = match quiet {
        0 => "warn",
        1 => "error",
        _ => "off",
    };
    let directives = std::iter::once(level.to_string())
        .chain(debug_targets.iter().map(|t| format!("{}=debug", t)))
        .collect::<Vec<_>>()
        .join(",");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(directives)),
        )
        .with_writer(io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config_file.as_deref())?;
    config.apply_options(&cli.option)?;
    config.debug.marker |= cli.debug_marker;
    config.debug.autoinstall |= cli.debug_autoinstall;
    config.debug.problem_resolver |= cli.debug_problemresolver;
    config.debug.autoremove |= cli.debug_autoremove;

    init_logging(cli.quiet, &config.debug.targets());

    match cli.command {
        Commands::Scan {
            no,
            yes,
            status,
            lists,
            cache,
        } => {
            let mut sources = ScanSources::from_config(&config);
            sources.no = no.unwrap_or(sources.no);
            sources.yes = yes.unwrap_or(sources.yes);
            sources.status = status.unwrap_or(sources.status);
            sources.lists = lists.unwrap_or(sources.lists);
            sources.cache = cache.or(sources.cache);

            let report = disposal::scan::scan(&config, &sources)?;
            disposal::scan::write_report(&report, &mut io::stdout().lock(), &mut io::stderr())?;
            Ok(())
        }
        Commands::BuildCache { db_path, lists } => {
            let db_path = db_path
                .or_else(|| config.cache.path.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_PATH));
            let lists = lists.unwrap_or_else(|| config.apt.lists.clone());
            info!("Building package cache at: {}", db_path.display());

            let records = disposal::repository::load_index_records(&lists)?;
            let mut conn = disposal::db::init(&db_path)
                .with_context(|| format!("Failed to initialize {}", db_path.display()))?;
            let stored = disposal::db::store_records(&mut conn, &records)?;

            println!("Cached {} package records in {}", stored, db_path.display());
            Ok(())
        }
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "disposal", &mut io::stdout());
            Ok(())
        }
    }
}
