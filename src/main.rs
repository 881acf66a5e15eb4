use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::sync::Arc;

use spotlight::aggregator::{Aggregator, AggregatorSettings};
use spotlight::api::create_router;
use spotlight::config::CONFIG;
use spotlight::data_models::{ContentType, SearchOptions, SearchType};
use spotlight::exa::ExaClient;
use spotlight::options::parse_domain_list;

#[derive(Parser)]
#[command(name = "spotlight", about = "Search front-end over an answer/search/similar API")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API
    Serve {
        /// Overrides BIND_ADDR
        #[arg(long)]
        addr: Option<String>,
    },
    /// Run one aggregation and print it as JSON
    Query(QueryArgs),
}

#[derive(Args)]
struct QueryArgs {
    q: String,
    #[arg(long, default_value = "auto")]
    search_type: String,
    #[arg(long, default_value = "all")]
    content_type: String,
    #[arg(long, default_value_t = 10)]
    num_results: u32,
    #[arg(long, default_value_t = 0)]
    recency_days: u32,
    #[arg(long, default_value = "auto")]
    language: String,
    /// Comma-separated hostnames
    #[arg(long, default_value = "")]
    include_domains: String,
    /// Comma-separated hostnames
    #[arg(long, default_value = "")]
    exclude_domains: String,
}

impl QueryArgs {
    fn options(&self) -> SearchOptions {
        SearchOptions {
            search_type: SearchType::parse(&self.search_type).unwrap_or_default(),
            content_type: ContentType::parse(&self.content_type).unwrap_or_default(),
            num_results: self.num_results,
            recency_days: self.recency_days,
            language: self.language.clone(),
            include_domains: parse_domain_list(&self.include_domains),
            exclude_domains: parse_domain_list(&self.exclude_domains),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(CONFIG.log_level)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    // Bridge log crate -> tracing (so log::warn! etc. work)
    tracing_log::LogTracer::init()?;
    for warning in &CONFIG.invalid_env {
        tracing::warn!("{warning}");
    }

    let cli = Cli::parse();

    let backend = ExaClient::new(&CONFIG).context("failed to create search backend")?;
    let aggregator = Arc::new(Aggregator::new(
        Arc::new(backend),
        AggregatorSettings::from(&*CONFIG),
    ));
    tracing::info!(
        backend = aggregator.backend_name(),
        content_mode = ?aggregator.settings().content_mode,
        "aggregator ready"
    );

    match cli.command {
        Command::Serve { addr } => {
            let addr = addr.unwrap_or_else(|| CONFIG.bind_addr.clone());
            let app = create_router(aggregator, &CONFIG.static_dir);
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("failed to bind {addr}"))?;
            tracing::info!("listening on {addr}");
            axum::serve(listener, app).await?;
        }
        Command::Query(args) => {
            let response = aggregator.aggregate(&args.q, args.options()).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }
    Ok(())
}
