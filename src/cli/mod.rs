//! datalab CLI - browse configured and stored datasets
//!
//! Command-line interface over the provider registry. Every command prints
//! JSON on stdout; diagnostics go to stderr.

use std::{path::PathBuf, process::ExitCode, sync::Arc, time::Duration};

use clap::{Parser, Subcommand};

mod dataset;
pub mod logging;

use crate::{
    config::DatasetCatalog,
    error::{Error, Result},
    provider::ProviderRegistry,
    store::{LocalRowStore, RowStore},
};

/// datalab - one query contract over local and remote datasets
#[derive(Parser)]
#[command(name = "datalab")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Dataset catalog JSON file (defaults to the built-in demo catalog)
    #[arg(long, global = true, env = "DATALAB_CATALOG")]
    catalog: Option<PathBuf>,
    /// Directory of the local row store
    #[arg(long, global = true, env = "DATALAB_STORE", default_value = ".datalab")]
    store: PathBuf,
    /// Timeout for remote API requests, in seconds
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List configured datasets and datasets found in the store
    Datasets,
    /// Query one page of a dataset
    Query {
        /// Dataset slug
        slug: String,
        /// Raw query string, e.g. "page=2&price_min=10&sortField=price&sortDir=desc"
        #[arg(default_value = "")]
        query: String,
    },
    /// Show the filter options of a local dataset
    Facets {
        /// Dataset slug
        slug: String,
    },
    /// Filter, sort, and summarize a whole local dataset in memory
    View {
        /// Dataset slug
        slug: String,
        /// Raw client-filter query string, e.g. "year=2020&sortKey=population&sortDir=desc"
        #[arg(default_value = "")]
        query: String,
        /// Maximum number of rows to print
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
    /// Append rows from a JSON array of objects to a local dataset
    Load {
        /// Dataset slug
        slug: String,
        /// JSON file holding an array of objects
        input: PathBuf,
        /// Remove existing rows first
        #[arg(long)]
        replace: bool,
    },
}

/// Shared handles for one CLI invocation.
pub(crate) struct Context {
    pub registry: ProviderRegistry,
    pub store: Arc<dyn RowStore>,
    pub pretty: bool,
}

impl Context {
    fn open(cli: &Cli) -> Result<Self> {
        let catalog = match &cli.catalog {
            Some(path) => DatasetCatalog::from_path(path)?,
            None => DatasetCatalog::builtin(),
        };
        let store: Arc<dyn RowStore> = Arc::new(LocalRowStore::open(&cli.store)?);
        let catalog = Arc::new(catalog);
        let registry = match cli.timeout_secs {
            Some(secs) => ProviderRegistry::with_timeout(
                catalog,
                Arc::clone(&store),
                Duration::from_secs(secs),
            )?,
            None => ProviderRegistry::new(catalog, Arc::clone(&store))?,
        };
        Ok(Self {
            registry,
            store,
            pretty: cli.pretty,
        })
    }

    /// Writes a value as JSON on stdout.
    pub fn print<T: serde::Serialize>(&self, value: &T) -> Result<()> {
        let json = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        }
        .map_err(|e| Error::io_no_path(e.into()))?;
        println!("{json}");
        Ok(())
    }
}

async fn execute(cli: Cli) -> Result<()> {
    let ctx = Context::open(&cli)?;
    match cli.command {
        Commands::Datasets => dataset::cmd_datasets(&ctx).await,
        Commands::Query { slug, query } => dataset::cmd_query(&ctx, &slug, &query).await,
        Commands::Facets { slug } => dataset::cmd_facets(&ctx, &slug).await,
        Commands::View { slug, query, limit } => {
            dataset::cmd_view(&ctx, &slug, &query, limit).await
        }
        Commands::Load {
            slug,
            input,
            replace,
        } => dataset::cmd_load(&ctx, &slug, &input, replace).await,
    }
}

/// Run the datalab CLI.
pub fn run() -> ExitCode {
    logging::init();
    let cli = Cli::parse();

    let result = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(Error::io_no_path)
        .and_then(|runtime| runtime.block_on(execute(cli)));

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = ?e, "command failed");
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
