use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tessera::{compile_files, manifest::DEFAULT_MANIFEST, run_manifest, Builder, JsonBuilder, ManifestError, Params};

#[derive(Parser)]
#[command(name = "tessera")]
#[command(about = "Compile Tessera schemas and run the configured builders", long_about = None)]
struct Cli {
    /// Log compiler phases (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every enabled build of a manifest, printing each output to stdout
    Build {
        /// Manifest file
        #[arg(default_value = DEFAULT_MANIFEST)]
        manifest: PathBuf,
    },

    /// Compile schema files and report errors without running a builder
    Check {
        /// Input `.schema` files, merged in the given order
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Compile schema files and print the resolved graph as JSON
    Dump {
        /// Input `.schema` files, merged in the given order
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

fn main() -> Result<(), ManifestError> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Build { manifest } => {
            let outputs = run_manifest(manifest)?;
            info!(builds = outputs.len(), "manifest done");
            for output in outputs {
                println!("{}", output.output);
            }
            Ok(())
        }

        Commands::Check { files } => {
            let schema = compile_files(files)?;
            println!(
                "OK: {} models, {} messages, {} resources, {} services",
                schema.visit_models(true).len(),
                schema.visit_messages(true).len(),
                schema.resources().len(),
                schema.services().len()
            );
            Ok(())
        }

        Commands::Dump { files } => {
            let schema = compile_files(files)?;
            println!("{}", JsonBuilder.build(&schema, &Params::new())?);
            Ok(())
        }
    }
}
