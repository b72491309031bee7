//! Registry inspection CLI
//!
//! Builds the operation and schema registries from a document file and
//! answers the common questions: what operations exist, what does a key
//! resolve to, which schemas are cyclic, which are broken.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use api_registry::{
    DocumentStore, MethodCategory, OperationRegistry, RegistryConfig, SchemaDependencyGraph,
    SchemaRegistry,
};

#[derive(Parser)]
#[command(name = "api-inspect")]
#[command(about = "Inspect operation and schema registries built from an interface document")]
struct Cli {
    /// Path to the interface description document (JSON)
    #[arg(short, long)]
    document: PathBuf,

    /// Optional config file (registry.toml)
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all operations with their keys
    Operations,

    /// Show one operation record by key
    Lookup {
        key: String,
    },

    /// Find the operation for a method category and resource kind
    Find {
        /// get, list, create, update, or delete
        category: String,
        /// Resource kind name, matched case-insensitively
        kind: String,
    },

    /// Resolve one named schema and print it
    Schema {
        name: String,
    },

    /// Compile every schema in the pool and report failures
    Compile,

    /// Report cyclic schema groups and dangling references
    Cycles,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => RegistryConfig::load_from(Some(path))?,
        None => RegistryConfig::load().unwrap_or_default(),
    };
    let store = Arc::new(
        DocumentStore::from_file(&cli.document)
            .with_context(|| format!("loading {}", cli.document.display()))?,
    );

    match cli.command {
        Commands::Operations => {
            let registry = OperationRegistry::build_with(&store, &config)?;
            println!("📒 {} operations (document {})", registry.len(), short(registry.fingerprint().as_str()));
            for record in registry.iter() {
                println!(
                    "  {:<40} {:>7} {}",
                    record.operation_key,
                    record.method.to_uppercase(),
                    record.path_template
                );
            }
            Ok(())
        }

        Commands::Lookup { key } => {
            let registry = OperationRegistry::build_with(&store, &config)?;
            match registry.lookup(&key) {
                Some(record) => {
                    println!("{}", serde_json::to_string_pretty(record)?);
                    Ok(())
                }
                None => match registry.suggest(&key) {
                    Some(suggestion) => bail!("operation '{}' not found; did you mean '{}'?", key, suggestion),
                    None => bail!("operation '{}' not found", key),
                },
            }
        }

        Commands::Find { category, kind } => {
            let category: MethodCategory = category.parse()?;
            let registry = OperationRegistry::build_with(&store, &config)?;
            match registry.find_by_method_and_kind(category, &kind) {
                Some(key) => {
                    println!("{}", key);
                    Ok(())
                }
                None => bail!("no operation found for {:?} {}", category, kind),
            }
        }

        Commands::Schema { name } => {
            let registry = SchemaRegistry::new(store);
            let schema = registry
                .get(&name)
                .with_context(|| format!("resolving schema '{}'", name))?;
            println!("{}", serde_json::to_string_pretty(&*schema)?);
            Ok(())
        }

        Commands::Compile => {
            let registry = SchemaRegistry::new(store);
            let report = registry.compile_all();
            for name in &report.compiled {
                println!("  ✅ {}", name);
            }
            for (name, err) in &report.failures {
                println!("  ❌ {} - {}", name, err);
            }
            println!(
                "{} compiled, {} failed",
                report.compiled.len(),
                report.failures.len()
            );
            if !report.failures.is_empty() {
                std::process::exit(1);
            }
            Ok(())
        }

        Commands::Cycles => {
            let graph = SchemaDependencyGraph::from_store(&store);
            let cycles = graph.cycles();
            if cycles.is_empty() {
                println!("✅ no cyclic schema groups");
            } else {
                println!("🔁 {} cyclic group(s):", cycles.len());
                for group in cycles {
                    println!("  {}", group.join(" <-> "));
                }
            }
            for (from, target) in graph.dangling() {
                println!("  ⚠️  {} references missing schema '{}'", from, target);
            }
            Ok(())
        }
    }
}

fn short(fingerprint: &str) -> &str {
    &fingerprint[..12.min(fingerprint.len())]
}
