//! graphcache - Normalized graph cache maintenance
//!
//! Main entry point for the graphcache CLI. Every command works on a JSON
//! snapshot file produced by `InMemoryCache::extract`.

use clap::{Parser, Subcommand};
use graphcache::cache::InMemoryCache;
use graphcache::config::CacheConfig;
use graphcache::gc::{EvictSpec, GcOptions};
use graphcache::graph::RecordId;
use graphcache::storage::Snapshot;
use graphcache::CacheError;
use std::path::{Path, PathBuf};
use std::process;

/// graphcache - Inspect and compact normalized cache snapshots
#[derive(Parser, Debug)]
#[command(name = "graphcache")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: ~/.config/graphcache/config.yaml)
    #[arg(short, long, env = "GRAPHCACHE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Remove records unreachable from the roots and retained ids
    Gc {
        /// Snapshot file to read
        #[arg(short, long)]
        snapshot: PathBuf,

        /// Extra ids to keep alive (repeatable)
        #[arg(short, long)]
        retain: Vec<String>,

        /// Write the compacted snapshot here
        #[arg(short, long)]
        write: Option<PathBuf>,
    },

    /// Print the ids a collection would keep
    Reachable {
        /// Snapshot file to read
        #[arg(short, long)]
        snapshot: PathBuf,

        /// Extra ids to keep alive (repeatable)
        #[arg(short, long)]
        retain: Vec<String>,
    },

    /// Evict a record, or one field of a record
    Evict {
        /// Snapshot file to read
        #[arg(short, long)]
        snapshot: PathBuf,

        /// Record id
        #[arg(long)]
        id: String,

        /// Field name (evicts the whole record when omitted)
        #[arg(short, long)]
        field: Option<String>,

        /// Field arguments as a JSON object
        #[arg(short, long)]
        args: Option<String>,

        /// Write the resulting snapshot here
        #[arg(short, long)]
        write: Option<PathBuf>,
    },

    /// Show record, field, and dangling reference counts
    Stats {
        /// Snapshot file to read
        #[arg(short, long)]
        snapshot: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    // Initialize logging
    if let Err(e) = graphcache::logging::init() {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> graphcache::Result<()> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Gc {
            snapshot,
            retain,
            write,
        } => {
            let mut cache = open_cache(config, &snapshot, &retain)?;
            let mut removed = cache.gc(GcOptions::default());
            removed.sort();

            for id in &removed {
                println!("{}", id);
            }
            eprintln!("Removed {} record(s)", removed.len());

            if let Some(out) = write {
                cache.extract().save(&out)?;
            }
        }

        Commands::Reachable { snapshot, retain } => {
            let cache = open_cache(config, &snapshot, &retain)?;
            let mut ids: Vec<RecordId> = cache.reachable().into_iter().collect();
            ids.sort();
            for id in ids {
                println!("{}", id);
            }
        }

        Commands::Evict {
            snapshot,
            id,
            field,
            args,
            write,
        } => {
            let mut cache = open_cache(config, &snapshot, &[])?;
            let spec = build_evict_spec(id, field, args.as_deref())?;

            if cache.evict(&spec) {
                println!("Evicted");
            } else {
                println!("Nothing to evict");
            }

            if let Some(out) = write {
                cache.extract().save(&out)?;
            }
        }

        Commands::Stats { snapshot, json } => {
            let cache = open_cache(config, &snapshot, &[])?;
            let stats = cache.stats();
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("Records:             {}", stats.records);
                println!("Fields:              {}", stats.fields);
                println!("Dangling references: {}", stats.dangling_references);
            }
        }
    }

    Ok(())
}

/// Load the given config file, or the default one when it exists
fn load_config(path: Option<&Path>) -> graphcache::Result<CacheConfig> {
    match path {
        Some(path) => CacheConfig::load(path),
        None => match CacheConfig::load_default() {
            Ok(config) => Ok(config),
            Err(CacheError::Config(msg)) if msg.contains("Config file not found") => {
                tracing::debug!("No config file, using defaults");
                Ok(CacheConfig::default())
            }
            Err(e) => Err(e),
        },
    }
}

fn open_cache(config: CacheConfig, snapshot: &Path, retain: &[String]) -> graphcache::Result<InMemoryCache> {
    let mut cache = InMemoryCache::new(config)?;
    cache.restore(Snapshot::load(snapshot)?);
    for id in retain {
        cache.retain(id.as_str());
    }
    Ok(cache)
}

fn build_evict_spec(id: String, field: Option<String>, args: Option<&str>) -> graphcache::Result<EvictSpec> {
    let Some(field) = field else {
        if args.is_some() {
            return Err(CacheError::InvalidArgument(
                "--args requires --field".to_string(),
            ));
        }
        return Ok(EvictSpec::record(id));
    };

    let spec = EvictSpec::field(id, field);
    match args {
        None => Ok(spec),
        Some(raw) => match serde_json::from_str(raw)? {
            serde_json::Value::Object(map) => Ok(spec.with_args(map)),
            _ => Err(CacheError::InvalidArgument(
                "--args must be a JSON object".to_string(),
            )),
        },
    }
}
