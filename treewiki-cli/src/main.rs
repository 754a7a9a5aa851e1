//! # treewiki CLI
//!
//! Command-line interface for the treewiki publishing engine.

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "treewiki")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "treewiki.yml", env = "TREEWIKI_CONFIG")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new treewiki project
    Init {
        /// Target directory (defaults to current directory)
        path: Option<PathBuf>,
    },

    /// Publish one or every site
    Build {
        /// Only build this site
        #[arg(long)]
        site: Option<String>,

        /// Write the serialised tree back to the source file
        #[arg(long)]
        save_source: bool,
    },

    /// Start development server with rebuild on change
    Dev {
        /// Server port (defaults to server.port in the config)
        #[arg(long)]
        port: Option<u16>,

        /// Only build and serve this site
        #[arg(long)]
        site: Option<String>,
    },

    /// Look up a word in the built search index
    Search {
        /// Word to look up
        word: String,

        /// Only search this site
        #[arg(long)]
        site: Option<String>,

        /// Return JSON for machine consumption
        #[arg(long)]
        json: bool,
    },

    /// Print the page outline with output paths
    Tree {
        #[arg(long)]
        site: Option<String>,
    },

    /// Print a site's serialised source
    Source {
        #[arg(long)]
        site: String,
    },

    /// Parse and render every site without writing, then report diagnostics
    Verify {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(if cli.verbose {
                tracing::Level::DEBUG.into()
            } else {
                tracing::Level::INFO.into()
            }),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Init { path } => commands::init_project(path.as_deref()),
        Commands::Build { site, save_source } => {
            commands::build_sites(&cli.config, site.as_deref(), save_source)
        }
        Commands::Dev { port, site } => {
            commands::dev_server(&cli.config, port, site.as_deref()).await
        }
        Commands::Search { word, site, json } => {
            commands::search_sites(&cli.config, &word, site.as_deref(), json)
        }
        Commands::Tree { site } => commands::print_tree(&cli.config, site.as_deref()),
        Commands::Source { site } => commands::print_source(&cli.config, &site),
        Commands::Verify { json } => commands::verify_sites(&cli.config, json),
    }
}
