//! Runner for the resdep engine
//!
//! Builds the resource model for a catalogue, prints it, creates the
//! ad-hoc seed individuals and applies structural mutations to each.
//!
//! Usage:
//!   cargo run -p resdep-engine --bin resdep-runner -- <catalogue.json> [OPTIONS]
//!
//! Options:
//!   --schema <FILE>   Database schema and snapshot as JSON
//!   --config <FILE>   Engine configuration as JSON
//!   --rounds <N>      Structural mutations per seed (default: 3)
//!   --seed <N>        Random seed, overriding the configuration

use log::info;
use resdep_catalog::{Catalogue, DbSchema, DbSnapshot};
use resdep_engine::{
    EngineConfig, EngineError, EngineResult, MutationOutcome, ResourceManager, StructureMutator,
};
use resdep_resource::ChainStatus;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
struct RunConfig {
    catalogue: Option<PathBuf>,
    schema: Option<PathBuf>,
    config: Option<PathBuf>,
    rounds: usize,
    seed: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct Database {
    schema: DbSchema,
    #[serde(default)]
    snapshot: DbSnapshot,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let run = parse_args(&args);
    let Some(catalogue) = run.catalogue.clone() else {
        eprintln!("Usage: resdep-runner <catalogue.json> [--schema FILE] [--config FILE] [--rounds N] [--seed N]");
        std::process::exit(2);
    };

    if let Err(e) = execute(&catalogue, &run) {
        eprintln!("ERROR: {}", e);
        std::process::exit(1);
    }
}

fn parse_args(args: &[String]) -> RunConfig {
    let mut config = RunConfig {
        catalogue: None,
        schema: None,
        config: None,
        rounds: 3,
        seed: None,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--schema" => {
                i += 1;
                if i < args.len() {
                    config.schema = Some(PathBuf::from(&args[i]));
                }
            }
            "--config" => {
                i += 1;
                if i < args.len() {
                    config.config = Some(PathBuf::from(&args[i]));
                }
            }
            "--rounds" => {
                i += 1;
                if i < args.len() {
                    config.rounds = args[i].parse().unwrap_or(3);
                }
            }
            "--seed" => {
                i += 1;
                if i < args.len() {
                    config.seed = args[i].parse().ok();
                }
            }
            other => {
                if config.catalogue.is_none() && !other.starts_with("--") {
                    config.catalogue = Some(PathBuf::from(other));
                } else {
                    eprintln!("Ignoring unknown argument: {}", other);
                }
            }
        }
        i += 1;
    }
    config
}

fn read(path: &Path) -> EngineResult<String> {
    fs::read_to_string(path)
        .map_err(|e| EngineError::invalid_config(format!("cannot read {}: {}", path.display(), e)))
}

fn execute(catalogue_path: &Path, run: &RunConfig) -> EngineResult<()> {
    let catalogue = Catalogue::from_json_str(&read(catalogue_path)?)?;
    let mut config = match &run.config {
        Some(path) => serde_json::from_str::<EngineConfig>(&read(path)?)?,
        None => EngineConfig::default(),
    };
    if let Some(seed) = run.seed {
        config = config.with_seed(seed);
    }
    let database = match &run.schema {
        Some(path) => {
            let db: Database = serde_json::from_str(&read(path)?)?;
            Some((db.schema, db.snapshot))
        }
        None => None,
    };

    let mut manager = ResourceManager::new(config.clone())?;
    manager.init_resources(&catalogue, database)?;

    println!("Resources");
    println!("=========");
    for resource in manager.cluster().resources() {
        let chain: Vec<String> = resource.creation.actions.iter().map(|a| a.name()).collect();
        let status = match &resource.creation.status {
            ChainStatus::Complete => "complete".to_string(),
            ChainStatus::Incomplete { unresolved } => format!("incomplete at {}", unresolved),
        };
        let templates: Vec<&str> = resource.templates.keys().map(String::as_str).collect();
        println!("{}", resource.key());
        println!("  chain:     [{}] ({})", chain.join(", "), status);
        println!("  templates: {}", templates.join(" "));
        for relation in manager.dependencies().relations_of(resource.key()) {
            println!("  relation:  {}", relation);
        }
    }
    println!();

    let mutator = StructureMutator::new(&config);
    let seeds = manager.create_ad_hoc_individuals(None)?;
    println!("Seeds ({})", seeds.len());
    println!("=========");
    let mut applied = 0;
    for (n, mut individual) in seeds.into_iter().enumerate() {
        println!("#{} {}", n, individual.action_names().join(" "));
        for _ in 0..run.rounds {
            match mutator.mutate(&mut manager, &mut individual)? {
                MutationOutcome::Applied { kind, positions } => {
                    applied += 1;
                    println!("  {} at {:?} -> {}", kind, positions, individual.action_names().join(" "));
                }
                MutationOutcome::NotApplicable { reason } => println!("  skipped: {}", reason),
            }
        }
    }
    info!("{} structural mutations applied", applied);
    Ok(())
}
