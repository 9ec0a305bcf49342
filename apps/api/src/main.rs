use clap::{Parser, Subcommand};
use log::info;
use pittari_wine_api::{
    app::Application,
    models::IngestionCursor,
    scripts::{fetch_catalog, index_catalog, FetchOptions},
    Config, Result,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "pittari-wine-api", version, about = "Wine catalog search and recommendations")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Import wines from the catalog source into the catalog store
    Fetch {
        #[arg(long, default_value = "ワイン")]
        keyword: String,
        #[arg(long, default_value = "510915")]
        genre_id: String,
        #[arg(long, default_value_t = 30)]
        hits: u32,
        #[arg(long, default_value_t = 10)]
        pages: u32,
    },
    /// Embed catalog rows into the vector index, resuming from a cursor
    Index {
        #[arg(long, default_value_t = 0)]
        offset: i64,
        /// Rows per batch; defaults to APP_INGEST_PAGE_SIZE
        #[arg(long)]
        page_size: Option<i64>,
        /// Stop after this many batches
        #[arg(long)]
        max_batches: Option<usize>,
    },
}

#[actix_web::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                // Default to info level if RUST_LOG is not set
                "pittari_wine_api=info,actix_web=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    info!("Loading configuration...");
    let config = Config::load()?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => Application::new(&config).run().await,
        Command::Fetch {
            keyword,
            genre_id,
            hits,
            pages,
        } => {
            let options = FetchOptions {
                keyword,
                genre_id: Some(genre_id).filter(|g| !g.is_empty()),
                hits_per_page: hits,
                pages,
            };
            fetch_catalog(&config, &options).await
        }
        Command::Index {
            offset,
            page_size,
            max_batches,
        } => {
            let start = IngestionCursor::new(offset, page_size.unwrap_or(config.ingest_page_size));
            index_catalog(&config, start, max_batches).await.map(|_| ())
        }
    }
}
