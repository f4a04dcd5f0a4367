//! Main application entry point

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use vq_core::{QueryController, SyncBus, SyncManager};
use vq_data::{AggregationBackend, DataFetcher, EngineConfig, HttpBackend, MemoryBackend};
use vq_views::{JsonMount, ViewerContext, Viewport};

mod dashboard;

use dashboard::Dashboard;

#[derive(Parser)]
#[command(name = "vizq")]
#[command(about = "Run dashboard views against an aggregation endpoint and print their configurations")]
#[command(version)]
struct Args {
    /// Engine configuration file (JSON)
    #[arg(long, env = "VIZQ_CONFIG")]
    config: Option<PathBuf>,

    /// Answer from a fixture file instead of the HTTP endpoint
    #[arg(long)]
    fixture: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Refresh every view of a dashboard once
    Run {
        /// Dashboard definition (JSON)
        #[arg(long)]
        dashboard: PathBuf,

        /// Extra filter clause, `field=value` or `or:field=value`
        #[arg(long = "filter")]
        filters: Vec<String>,

        /// Indent the printed configurations
        #[arg(long)]
        pretty: bool,
    },
    /// List distinct values of a field, for filter autocompletion
    FieldValues {
        #[arg(long)]
        resource: String,

        #[arg(long)]
        field: String,

        /// Prefix to search for
        #[arg(long, default_value = "")]
        term: String,

        #[arg(long, default_value = "1")]
        page: usize,
    },
    /// List the properties of a GeoJSON resource usable as map join keys
    Properties {
        #[arg(long)]
        map_resource: String,
    },
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let mut config = match path {
        Some(path) => EngineConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    config
        .apply_env_overrides()
        .context("Invalid environment override")?;
    Ok(config)
}

fn backend(config: &EngineConfig, fixture: Option<&Path>) -> Result<Arc<dyn AggregationBackend>> {
    let backend: Arc<dyn AggregationBackend> = match fixture {
        Some(path) => Arc::new(
            MemoryBackend::from_file(path)
                .with_context(|| format!("Failed to load fixture {}", path.display()))?,
        ),
        None => {
            info!("Using endpoint {}", config.endpoint.api_url);
            Arc::new(HttpBackend::new(config.endpoint.clone()).context("Failed to create HTTP client")?)
        }
    };
    Ok(backend)
}

async fn run_dashboard(
    config: EngineConfig,
    backend: Arc<dyn AggregationBackend>,
    path: &Path,
    extra_filters: &[String],
    pretty: bool,
) -> Result<()> {
    let dashboard = Dashboard::from_file(path)?;
    let chain = dashboard.filter_chain(extra_filters)?;

    let ctx = ViewerContext::new(
        DataFetcher::new(backend, &config),
        Arc::new(SyncManager::new(dashboard.resource_id.clone())),
        Arc::new(SyncBus::new()),
        tokio::runtime::Handle::current(),
        Arc::new(config),
    );

    let controller = QueryController::with_parts(
        dashboard.resource_id.clone(),
        ctx.sync_manager.clone(),
        ctx.event_bus.clone(),
    );
    controller.load(chain);
    info!("Query: {}", controller.snapshot().sql_string);

    let mount = JsonMount::new(std::io::stdout());
    let mount = Arc::new(if pretty { mount.pretty() } else { mount });

    let viewport = Viewport::new(ctx);
    for definition in &dashboard.views {
        let (view, settings) = definition.build()?;
        viewport.attach(view, mount.clone(), settings);
    }

    if viewport.is_empty() {
        warn!("Dashboard {} has no views", path.display());
        return Ok(());
    }

    for handle in viewport.refresh_all() {
        handle.await.context("View refresh panicked")?;
    }
    info!("Refreshed {} views", viewport.len());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;
    let backend = backend(&config, args.fixture.as_deref())?;

    match args.command {
        Commands::Run {
            dashboard,
            filters,
            pretty,
        } => run_dashboard(config, backend, &dashboard, &filters, pretty).await?,
        Commands::FieldValues {
            resource,
            field,
            term,
            page,
        } => {
            let fetcher = DataFetcher::new(backend, &config);
            let values = fetcher.field_values(&resource, &field, &term, page).await?;
            println!("{}", serde_json::to_string_pretty(&values)?);
        }
        Commands::Properties { map_resource } => {
            let fetcher = DataFetcher::new(backend, &config);
            let properties = fetcher.geojson_properties(&map_resource).await?;
            println!("{}", serde_json::to_string_pretty(&properties)?);
        }
    }

    Ok(())
}
