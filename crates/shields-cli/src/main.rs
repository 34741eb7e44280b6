//! Shields CLI
//!
//! CLI tool for inspecting datasets, HTTPS-upgrade rules and host settings.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, Subcommand};
use log::debug;

use shields_core::engine::{FilterEngine, JsonRuleDatabase};
use shields_core::shields::{HostSettingsTable, ShieldsSettings};
use shields_core::{lookup_keys, BlockersConfig, DataDir, HttpsUpgrader, RuleSet};

#[derive(Parser)]
#[command(name = "shields-cli")]
#[command(about = "Shields dataset and HTTPS-upgrade rule tools")]
struct Cli {
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTPS upgrader over URLs
    Upgrade {
        /// Worker configuration (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Data directory holding the pointer files (overrides the config)
        #[arg(short, long)]
        data_dir: Option<PathBuf>,

        /// URLs to upgrade
        #[arg(required = true)]
        urls: Vec<String>,
    },

    /// Print the rule-database lookup keys for hosts
    Keys {
        #[arg(required = true)]
        hosts: Vec<String>,
    },

    /// Decode every rule set in a rule database blob
    ValidateRules {
        /// Rule database (JSON object of key -> rule groups)
        #[arg(short, long)]
        input: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect a persisted host-settings file
    Settings {
        /// Settings file (`host,settings;host,settings`)
        #[arg(short, long)]
        input: PathBuf,

        /// Only report this host's shields state
        #[arg(long)]
        host: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let result = match cli.command {
        Commands::Upgrade {
            config,
            data_dir,
            urls,
        } => cmd_upgrade(config, data_dir, &urls),
        Commands::Keys { hosts } => cmd_keys(&hosts),
        Commands::ValidateRules { input, json } => cmd_validate_rules(&input, json),
        Commands::Settings { input, host } => cmd_settings(&input, host.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn cmd_upgrade(
    config: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    urls: &[String],
) -> Result<(), String> {
    let mut config = match config {
        Some(path) => BlockersConfig::from_file(&path).map_err(|e| e.to_string())?,
        None => BlockersConfig::default(),
    };
    if let Some(data_dir) = data_dir {
        config.data_dir = data_dir;
    }
    debug!("Using data directory '{}'", config.data_dir.display());

    let resolver = Arc::new(DataDir::new(config.data_dir.clone(), config.datasets.clone()));
    let upgrader: HttpsUpgrader<JsonRuleDatabase> = HttpsUpgrader::new(resolver, &config);

    if !upgrader.ensure_loaded() {
        return Err(format!(
            "HTTPS rule database unavailable in '{}'",
            config.data_dir.display()
        ));
    }

    let start = Instant::now();
    for url in urls {
        let result = upgrader.upgrade(url);
        println!("{} -> {}", url, result);
    }
    let elapsed = start.elapsed();

    debug!(
        "Upgraded {} URLs in {:.1}ms ({} cached results)",
        urls.len(),
        elapsed.as_secs_f64() * 1000.0,
        upgrader.cached_results()
    );
    Ok(())
}

fn cmd_keys(hosts: &[String]) -> Result<(), String> {
    for host in hosts {
        let keys = lookup_keys(&host.to_ascii_lowercase());
        if keys.is_empty() {
            println!("{}: (no keys)", host);
        } else {
            println!("{}: {}", host, keys.join(" "));
        }
    }
    Ok(())
}

fn cmd_validate_rules(input: &Path, json: bool) -> Result<(), String> {
    let bytes = fs::read(input)
        .map_err(|e| format!("Failed to read '{}': {}", input.display(), e))?;

    let mut db = JsonRuleDatabase::default();
    if !db.deserialize(&bytes) {
        return Err(format!("'{}' is not a JSON object of rule sets", input.display()));
    }

    let mut groups = 0usize;
    let mut rules = 0usize;
    let mut skipped = 0usize;
    let mut rejected = Vec::new();

    for (key, value) in db.iter() {
        match RuleSet::decode(value) {
            Ok(set) => {
                groups += set.groups().len();
                rules += set.rule_count();
                skipped += set.skipped();
            }
            Err(e) => rejected.push(format!("{key}: {e}")),
        }
    }

    if json {
        let report = serde_json::json!({
            "input": input.display().to_string(),
            "keys": db.len(),
            "groups": groups,
            "rules": rules,
            "skipped": skipped,
            "rejected": rejected,
        });
        let text = serde_json::to_string_pretty(&report).map_err(|e| e.to_string())?;
        println!("{}", text);
        return Ok(());
    }

    println!("Rule database '{}'", input.display());
    println!("  Keys:     {}", db.len());
    println!("  Groups:   {}", groups);
    println!("  Rules:    {}", rules);
    println!("  Skipped:  {} malformed entries", skipped);
    println!("  Rejected: {} rule sets", rejected.len());
    for entry in &rejected {
        println!("    {}", entry);
    }

    Ok(())
}

fn cmd_settings(input: &Path, host: Option<&str>) -> Result<(), String> {
    let text = fs::read_to_string(input)
        .map_err(|e| format!("Failed to read '{}': {}", input.display(), e))?;
    let table = HostSettingsTable::parse(&text);

    if let Some(host) = host {
        let settings = table.host_settings(host);
        let state = if settings.shields_enabled() { "up" } else { "down" };
        println!("{}: shields {} (settings '{}')", host, state, settings);
        return Ok(());
    }

    println!("{} hosts", table.len());
    for (host, settings) in table.hosts() {
        let state = if settings.starts_with('0') { "down" } else { "up" };
        println!("  {:<40} {:<6} {}", host, state, settings);
    }
    Ok(())
}
