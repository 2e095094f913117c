// SPDX-License-Identifier: GPL-3.0-or-later

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use licheck::cache::LicenseCache;
use licheck::config::ConfigManager;
use licheck::discover::{self, DiscoveryContext};
use licheck::licenses::builtin_vocabulary;
use licheck::matcher::LicenseMatcher;
use licheck::report::{json, terminal};
use licheck::validator::LicenseValidator;

#[derive(Parser)]
#[command(
    name = "licheck",
    about = "Audit third-party dependency licenses against your policy",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Check project dependencies against the license policy
    Check {
        /// Ecosystems to check (default: every detected ecosystem)
        #[arg(long = "lang")]
        langs: Vec<String>,

        /// Output format
        #[arg(long, default_value = "terminal")]
        format: ReportFormat,

        /// Bypass the license cache for this run
        #[arg(long)]
        no_cache: bool,

        /// Project directory to check
        #[arg(long, default_value = ".")]
        path: PathBuf,

        /// Explicit policy file (otherwise licheck.{toml,yaml} is searched)
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Inspect or prune the license lookup cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },

    /// List the built-in SPDX license vocabulary
    Licenses,
}

#[derive(Clone, clap::ValueEnum)]
enum ReportFormat {
    Terminal,
    Json,
}

#[derive(Subcommand)]
enum CacheCommands {
    /// Show entry counts and the cache file location
    Stats,

    /// Remove every cached entry
    Clear,

    /// Remove only expired entries
    ClearExpired,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        None => cmd_check(&CheckArgs::default()),
        Some(Commands::Check {
            langs,
            format,
            no_cache,
            path,
            config,
        }) => cmd_check(&CheckArgs {
            langs,
            format,
            no_cache,
            path,
            config,
        }),
        Some(Commands::Cache { command }) => cmd_cache(&command).map(|()| ExitCode::SUCCESS),
        Some(Commands::Licenses) => {
            cmd_licenses();
            Ok(ExitCode::SUCCESS)
        }
    }
}

struct CheckArgs {
    langs: Vec<String>,
    format: ReportFormat,
    no_cache: bool,
    path: PathBuf,
    config: Option<PathBuf>,
}

impl Default for CheckArgs {
    fn default() -> Self {
        Self {
            langs: Vec::new(),
            format: ReportFormat::Terminal,
            no_cache: false,
            path: PathBuf::from("."),
            config: None,
        }
    }
}

fn cmd_check(args: &CheckArgs) -> Result<ExitCode> {
    let cache = LicenseCache::open()?;
    let ctx = DiscoveryContext::new(
        LicenseMatcher::new(builtin_vocabulary()),
        cache,
        !args.no_cache,
    );

    let mut ecosystems = discover::active_ecosystems(&args.path, &ctx);

    if !args.langs.is_empty() {
        for lang in &args.langs {
            if !ecosystems.iter().any(|e| e.name() == lang) {
                eprintln!("Warning: no '{lang}' ecosystem detected in this project");
            }
        }
        ecosystems.retain(|e| args.langs.iter().any(|lang| lang == e.name()));
    }

    if ecosystems.is_empty() {
        eprintln!("No supported ecosystems detected in {}.", args.path.display());
        return Ok(ExitCode::SUCCESS);
    }

    let manager = ConfigManager::new(&args.path);
    let mut any_errors = false;

    for eco in &ecosystems {
        eprintln!("Checking {} dependencies...", eco.name());

        let dependencies = match eco.discover() {
            Ok(deps) => deps,
            Err(e) => {
                eprintln!("  Error discovering {} dependencies: {e}", eco.name());
                continue;
            }
        };

        // A broken policy aborts the whole run before any classification
        let policy = match &args.config {
            Some(path) => manager.load_policy_from(path)?,
            None => {
                let settings = eco
                    .load_settings()
                    .with_context(|| format!("Failed to load {} settings", eco.name()))?;
                manager.load_policy(settings)?
            }
        };

        let result = LicenseValidator::new(policy).validate(&dependencies);
        any_errors |= result.has_errors();

        match args.format {
            ReportFormat::Terminal => terminal::print_report(eco.name(), &dependencies, &result),
            ReportFormat::Json => json::print_json(eco.name(), &dependencies, &result)?,
        }
    }

    if any_errors {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn cmd_cache(command: &CacheCommands) -> Result<()> {
    let mut cache = LicenseCache::open()?;

    match command {
        CacheCommands::Stats => {
            let stats = cache.stats();
            println!("Cache file: {}", cache.cache_file().display());
            println!("Total entries:   {}", stats.total);
            println!("Valid entries:   {}", stats.valid);
            println!("Expired entries: {}", stats.expired);
        }
        CacheCommands::Clear => {
            cache.clear();
            eprintln!("Cache cleared: {}", cache.cache_file().display());
        }
        CacheCommands::ClearExpired => {
            let removed = cache.clear_expired();
            eprintln!("Removed {removed} expired entries");
        }
    }

    Ok(())
}

fn cmd_licenses() {
    for id in builtin_vocabulary() {
        println!("{id}");
    }
}
