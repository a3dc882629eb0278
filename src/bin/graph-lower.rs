use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::{
    fs,
    io::{self, Read, Write},
    path::{Path, PathBuf},
};

use graph_lower::{
    is_api_format, lower_graph, parse_graph,
    registry::{EmptyRegistry, NodeRegistry, StaticRegistry},
};
use serde_json::Value;

#[derive(Parser, Debug)]
#[command(name = "graph-lower", about = "Lower editor node graphs into flat API programs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert an editor workflow into API format.
    Convert(ConvertArgs),
    /// Report whether a document is editor format or already API format.
    Check(CheckArgs),
}

#[derive(Args, Debug)]
struct ConvertArgs {
    /// Workflow JSON to convert; use '-' for stdin.
    #[arg(long = "workflow")]
    workflow: PathBuf,
    /// Optional node-schema registry JSON.
    #[arg(long = "registry")]
    registry: Option<PathBuf>,
    /// Output path; stdout when omitted.
    #[arg(long = "out")]
    out: Option<PathBuf>,
    /// Pretty-print the emitted program.
    #[arg(long)]
    pretty: bool,
}

#[derive(Args, Debug)]
struct CheckArgs {
    /// Workflow JSON to inspect; use '-' for stdin.
    #[arg(long = "workflow")]
    workflow: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Convert(args) => convert(args),
        Commands::Check(args) => check(args),
    }
}

fn read_document(path: &Path) -> Result<Value> {
    let text = if path.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("read workflow from stdin")?;
        buf
    } else {
        fs::read_to_string(path)
            .with_context(|| format!("read workflow from {}", path.display()))?
    };
    serde_json::from_str(&text).context("workflow is not valid JSON")
}

fn convert(args: ConvertArgs) -> Result<()> {
    let doc = read_document(&args.workflow)?;
    let registry: Box<dyn NodeRegistry> = match &args.registry {
        Some(path) => Box::new(StaticRegistry::load_from_file(path)?),
        None => Box::new(EmptyRegistry),
    };
    // Serialize the typed program, not a Value round-trip: input order is
    // part of the output contract.
    let rendered = if is_api_format(&doc) {
        render(&doc, args.pretty)?
    } else {
        let program = lower_graph(parse_graph(&doc)?, registry.as_ref())?;
        render(&program, args.pretty)?
    };
    match &args.out {
        Some(path) => fs::write(path, rendered)
            .with_context(|| format!("write program to {}", path.display()))?,
        None => {
            let mut stdout = io::stdout();
            stdout.write_all(rendered.as_bytes())?;
            stdout.write_all(b"\n")?;
        }
    }
    Ok(())
}

fn render<T: serde::Serialize>(value: &T, pretty: bool) -> Result<String> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(rendered)
}

fn check(args: CheckArgs) -> Result<()> {
    let doc = read_document(&args.workflow)?;
    if is_api_format(&doc) {
        println!("api");
    } else if doc.get("nodes").is_some() {
        println!("editor");
    } else {
        anyhow::bail!("document is neither an editor graph nor an API program");
    }
    Ok(())
}
