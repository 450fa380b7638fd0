//! cordis-kg: build and analyze the research-funding knowledge graph

use anyhow::{bail, Context, Result};
use clap::Parser;
use cordis_kg::engine::{GraphEngine, ReadQuery};
use cordis_kg::graph::{KeyValue, NodeKey};
use cordis_kg::{schema, EmbeddedEngine, Pipeline, PipelineConfig, PipelineError};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cordis-kg", version, about = "Research-funding knowledge graph pipeline")]
struct Cli {
    /// YAML configuration file
    #[arg(long, short, env = "CORDIS_KG_CONFIG")]
    config: Option<PathBuf>,

    /// Directory the configured input paths are relative to
    #[arg(long)]
    base_dir: Option<PathBuf>,

    /// Engine snapshot file
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Export keyphrase interchange files first
    #[arg(long)]
    extract: bool,

    /// Build the graph from the input files
    #[arg(long)]
    create: bool,

    /// Skip similarity, centrality and community detection
    #[arg(long)]
    skip_algorithms: bool,

    /// Train the link-prediction model
    #[arg(long)]
    link_prediction: bool,

    /// Print one node after the run, given as `Label=key`
    #[arg(long, value_name = "LABEL=KEY")]
    inspect: Vec<String>,

    /// Report format
    #[arg(long, value_enum, default_value = "table")]
    format: OutputFormat,
}

#[derive(Clone, clap::ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

/// Parse `Label=key` into the node's natural key
fn parse_inspect(arg: &str) -> Result<NodeKey> {
    let Some((label, key)) = arg.split_once('=') else {
        bail!("expected Label=key, got {:?}", arg);
    };
    let Some(property) = schema::key_property(label) else {
        bail!("{} is not an entity label", label);
    };
    let value = match label {
        schema::PROJECT | schema::DELIVERABLE => KeyValue::from(
            key.trim()
                .parse::<i64>()
                .with_context(|| format!("{} keys are integers", label))?,
        ),
        _ => KeyValue::from(key),
    };
    Ok(NodeKey::new(label, property, value))
}

fn inspect(engine: &EmbeddedEngine, key: &NodeKey) -> Result<()> {
    let rows = engine.execute_read(&ReadQuery::NodeByKey(key.clone()))?;
    let Some(row) = rows.into_iter().next() else {
        println!("{}: not found", key);
        return Ok(());
    };
    let object: serde_json::Map<String, serde_json::Value> =
        row.iter().map(|(k, v)| (k.clone(), v.to_json())).collect();
    println!("{}: {}", key, serde_json::to_string_pretty(&object)?);
    Ok(())
}

impl Cli {
    fn load_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
            None => PipelineConfig::default(),
        };

        if let Some(dir) = &self.base_dir {
            config.paths.base_dir = dir.clone();
        }
        if let Some(snapshot) = &self.snapshot {
            config.paths.snapshot = snapshot.clone();
        }
        let session = &mut config.session;
        session.extract_data |= self.extract;
        session.create |= self.create;
        session.link_prediction |= self.link_prediction;
        if self.skip_algorithms {
            session.run_algorithms = false;
        }
        config.validate()?;
        Ok(config)
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = cli.load_config()?;
    let inspected = cli
        .inspect
        .iter()
        .map(|arg| parse_inspect(arg))
        .collect::<Result<Vec<_>>>()?;
    let snapshot = config.paths.resolve(&config.paths.snapshot);

    let engine = match EmbeddedEngine::open(&snapshot) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("\t* The graph engine is unavailable: {}", e);
            eprintln!("\t* Check the snapshot at {} before running again.", snapshot.display());
            return Err(PipelineError::from(e).into());
        }
    };
    info!(snapshot = %snapshot.display(), "engine opened");

    let outcome = Pipeline::new(&engine, config).run();
    let inspection = if outcome.is_ok() {
        inspected.iter().map(|key| inspect(&engine, key)).collect()
    } else {
        Ok(())
    };
    // Persist whatever was written, even when a stage failed
    let closed = engine.close();

    let report = outcome?;
    inspection?;
    closed.context("saving engine snapshot")?;
    match cli.format {
        OutputFormat::Table => println!("{}", report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let connectivity = e
                .downcast_ref::<PipelineError>()
                .is_some_and(PipelineError::is_connectivity);
            error!(connectivity, "run failed: {:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
