//! Strata CLI - run pipelines against a hierarchical data store

mod config;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;
use strata::{
    CancelToken, FaultState, FilterRegistry, ObjectStore, Pipeline, PipelineNode,
};

use config::Config;

#[derive(Parser)]
#[command(name = "strata")]
#[command(about = "Hierarchical data-store pipeline engine", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List available filters
    List,

    /// Show the nodes of a pipeline file without running it
    Show {
        /// Pipeline file (JSON)
        pipeline: PathBuf,
    },

    /// Run a pipeline file
    Run {
        /// Pipeline file (JSON)
        pipeline: PathBuf,
        /// Validate every node without committing anything
        #[arg(long)]
        preflight: bool,
        /// Suppress per-node warning output
        #[arg(long)]
        quiet: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load();

    let mut registry = FilterRegistry::new();
    strata_filters::register_all(&mut registry);

    match cli.command {
        Commands::List => cmd_list(&registry),
        Commands::Show { pipeline } => cmd_show(&registry, &config, &pipeline),
        Commands::Run {
            pipeline,
            preflight,
            quiet,
        } => cmd_run(&registry, &config, &pipeline, preflight, quiet),
    }
}

fn cmd_list(registry: &FilterRegistry) -> Result<()> {
    println!("Available filters:\n");

    for filter in registry.filters() {
        let decl = filter.decl();
        println!("  {}", decl.id);
        if !decl.description.is_empty() {
            println!("    {}", decl.description);
        }
        let params: Vec<&str> = decl.parameters.iter().map(|p| p.key()).collect();
        println!("    parameters: {:?}", params);
        println!();
    }

    println!("Total: {} filters", registry.len());
    Ok(())
}

fn load_pipeline(
    registry: &FilterRegistry,
    config: &Config,
    path: &PathBuf,
) -> Result<Pipeline> {
    let path = config.resolve_pipeline(path);
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("Could not read pipeline file {}", path.display()))?;
    let json: serde_json::Value =
        serde_json::from_str(&contents).context("Pipeline file is not valid JSON")?;
    let (pipeline, warnings) =
        Pipeline::from_json(&json, registry).context("Could not load pipeline")?;
    for warning in warnings {
        eprintln!("warning: {}", warning);
    }
    Ok(pipeline)
}

fn cmd_show(registry: &FilterRegistry, config: &Config, path: &PathBuf) -> Result<()> {
    let pipeline = load_pipeline(registry, config, path)?;
    println!("Pipeline: {}", pipeline.name);
    print_nodes(&pipeline, 1);
    println!(
        "\n{} nodes, {} filters",
        pipeline.len(),
        pipeline.filter_count()
    );
    Ok(())
}

fn print_nodes(pipeline: &Pipeline, depth: usize) {
    for node in pipeline.nodes() {
        let indent = "  ".repeat(depth);
        match node {
            PipelineNode::Filter(bound) => {
                println!("{}{}", indent, bound.filter().decl().id);
            }
            PipelineNode::Nested(nested) => {
                println!("{}[{}]", indent, nested.name);
                print_nodes(nested, depth + 1);
            }
        }
    }
}

fn cmd_run(
    registry: &FilterRegistry,
    config: &Config,
    path: &PathBuf,
    preflight_only: bool,
    quiet: bool,
) -> Result<()> {
    let mut pipeline = load_pipeline(registry, config, path)?;
    let quiet = quiet || config.defaults.quiet;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg}").expect("static template"),
    );
    spinner.set_message(format!(
        "{} '{}' ({} filters)",
        if preflight_only { "Preflighting" } else { "Running" },
        pipeline.name,
        pipeline.filter_count()
    ));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let mut store = ObjectStore::new();
    let cancel = CancelToken::new();
    let result = pipeline.run(&mut store, preflight_only, &cancel);
    spinner.finish_and_clear();

    for outcome in &result.outcomes {
        let tag = match outcome.fault {
            FaultState::None => "ok",
            FaultState::Warnings => "warn",
            FaultState::Errors => "FAIL",
        };
        println!("[{:>4}] {}", tag, outcome.label);
        if !quiet {
            for warning in &outcome.warnings {
                println!("       warning: {}", warning);
            }
        }
        for error in &outcome.errors {
            println!("       error: {}", error);
        }
    }

    println!(
        "\n{} of {} filters ran; store holds {} objects",
        result.outcomes.len(),
        pipeline.filter_count(),
        store.len()
    );

    if !result.is_ok() {
        bail!("pipeline '{}' failed", pipeline.name);
    }
    Ok(())
}
