//! armgen CLI
//!
//! Loads a type model, prunes it to what the resources need and emits the
//! file plan plus `ToArm` declaration trees as JSON for the serializer.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use armgen::config::OutputFormat;
use armgen::model::{load_from_directory, load_from_file, validate_closed};
use armgen::{Definitions, GeneratorConfig, ReferenceGraph};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "armgen")]
#[command(about = "Generate kube-to-ARM conversion functions from a resource type model")]
struct Cli {
    /// Configuration file layered over the default locations
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate file plans and conversion functions
    Generate {
        /// Type model: a JSON file or a directory of JSON files
        #[arg(short, long)]
        model: PathBuf,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List reachable definitions with their depth
    Reachable {
        /// Type model: a JSON file or a directory of JSON files
        #[arg(short, long)]
        model: PathBuf,
    },

    /// Export the reference graph in DOT format
    Graph {
        /// Type model: a JSON file or a directory of JSON files
        #[arg(short, long)]
        model: PathBuf,

        /// Output file (defaults to references.dot)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("❌ Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref().and_then(Path::to_str);
    let config = GeneratorConfig::load_from(config_path).context("loading configuration")?;

    match cli.command {
        Command::Generate { model, output } => {
            let definitions = load_model(&model)?;
            let generated = armgen::generate(&definitions, &config)?;

            eprintln!("📦 Generated {} package(s)", generated.packages.len());
            eprintln!("  Files: {}", generated.file_count());
            eprintln!("  Conversion functions: {}", generated.function_count());
            eprintln!("  Test functions: {}", generated.test_count());
            eprintln!("  Reachable definitions: {}", generated.reachable.len());
            if !generated.diagnostics.is_empty() {
                eprintln!();
                eprint!("{}", generated.diagnostics);
            }

            write_json(&generated, config.output.format, output.as_deref())?;
        }
        Command::Reachable { model } => {
            let definitions = load_model(&model)?;
            let reachable = armgen::collect_reachable(&definitions, &config)?;

            for (name, depth) in reachable.iter() {
                println!("{:>3}  {}", depth, name);
            }
            eprintln!();
            eprintln!("📊 {} of {} definitions reachable", reachable.len(), definitions.len());
        }
        Command::Graph { model, output } => {
            let definitions = load_model(&model)?;
            let graph = ReferenceGraph::with_resources_as_roots(&definitions, &config.naming)?;

            eprintln!(
                "Graph loaded: {} nodes, {} edges, {} roots",
                graph.node_count(),
                graph.edge_count(),
                graph.roots().len()
            );
            for root in graph.roots() {
                eprintln!("  {} -> {} reference(s)", root, graph.references_of(root).len());
            }

            let output_path = output.unwrap_or_else(|| PathBuf::from("references.dot"));
            std::fs::write(&output_path, graph.to_dot())
                .with_context(|| format!("writing {}", output_path.display()))?;
            eprintln!("✅ Exported DOT to: {:?}", output_path);
        }
    }

    Ok(())
}

fn load_model(path: &Path) -> Result<Definitions> {
    eprintln!("Loading type model from: {:?}", path);
    let definitions = if path.is_dir() {
        load_from_directory(path)
    } else {
        load_from_file(path)
    }
    .with_context(|| format!("loading type model from {}", path.display()))?;

    validate_closed(&definitions)?;
    Ok(definitions)
}

fn write_json<T: Serialize>(value: &T, format: OutputFormat, output: Option<&Path>) -> Result<()> {
    let json = match format {
        OutputFormat::Pretty => serde_json::to_string_pretty(value)?,
        OutputFormat::Compact => serde_json::to_string(value)?,
    };

    match output {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
            eprintln!("✅ Wrote {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}
