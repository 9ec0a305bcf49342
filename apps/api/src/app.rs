use crate::{
    config::Config,
    error::Result,
    handlers,
    models::{
        BatchReport, ErrorResponse, HealthResponse, IngestionCursor, RecommendationRequest,
        RecommendationResponse, SearchRequest, WineRecord, WineType,
    },
    routes::{api_routes, openapi_route},
    services::{
        CatalogSource, CatalogStore, CommentaryGenerator, GeminiClient, InMemoryCatalogStore,
        InMemoryVectorIndex, IngestionBatcher, LanguageModel, PgCatalogStore, PineconeClient,
        RakutenClient, RecommendationService, RetryPolicy, SentenceEncoder, TextEmbedder,
        VectorIndex, WineSearch, WorkersAiClient,
    },
};
use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use log::{info, warn};
use std::net::TcpListener;
use std::sync::Arc;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Pittari Wine API",
        description = "Wine catalog search and sommelier-style recommendations"
    ),
    paths(
        handlers::health::health_check,
        handlers::wines::list_wines,
        handlers::wines::search_wines,
        handlers::recommendations::get_recommendations,
        handlers::ingest::ingest_batch,
    ),
    components(schemas(
        WineRecord,
        WineType,
        SearchRequest,
        RecommendationRequest,
        RecommendationResponse,
        IngestionCursor,
        BatchReport,
        HealthResponse,
        ErrorResponse
    )),
    tags(
        (name = "System", description = "Health"),
        (name = "Wines", description = "Catalog listing and semantic search"),
        (name = "Recommendations", description = "Questionnaire based recommendations"),
        (name = "Ingestion", description = "Resumable vector indexing")
    )
)]
pub struct ApiDoc;

/// Catalog store from `APP_DATABASE_URL`, or an empty in-memory store.
pub async fn catalog_store(config: &Config) -> Result<Arc<dyn CatalogStore>> {
    match config.database_url.as_deref() {
        Some(url) if !url.trim().is_empty() => {
            let store = PgCatalogStore::connect(url, config.database_max_connections).await?;
            Ok(Arc::new(store))
        }
        _ => {
            warn!("APP_DATABASE_URL is not set, using an in-memory catalog");
            Ok(Arc::new(InMemoryCatalogStore::new()))
        }
    }
}

/// Pinecone index when its credentials are configured, else in-memory.
pub fn vector_index(config: &Config) -> Result<Arc<dyn VectorIndex>> {
    match (&config.pinecone_api_key, &config.pinecone_index_host) {
        (Some(api_key), Some(host)) => Ok(Arc::new(PineconeClient::new(
            api_key,
            host,
            config.pinecone_namespace.clone(),
            config.external_timeout(),
        )?)),
        _ => {
            warn!("Pinecone is not configured, using an in-memory vector index");
            Ok(Arc::new(InMemoryVectorIndex::new()))
        }
    }
}

pub fn text_embedder(config: &Config) -> Result<Arc<dyn TextEmbedder>> {
    let api_key = Config::require(&config.huggingface_api_key, "huggingface_api_key")?;
    Ok(Arc::new(SentenceEncoder::new(
        &config.huggingface_base_url,
        api_key,
        &config.embedding_model,
        config.external_timeout(),
    )?))
}

/// Missing credentials surface per call, not here.
pub fn classification_model(config: &Config) -> Result<Arc<dyn LanguageModel>> {
    let client = WorkersAiClient::new(
        &config.cloudflare_base_url,
        config.cloudflare_api_token.clone(),
        config.cloudflare_account_id.clone(),
        &config.classification_model,
        config.external_timeout(),
    )
    .map_err(|e| crate::error::ApiError::ExternalServiceError(e.to_string()))?;
    Ok(Arc::new(client))
}

pub fn commentary_model(config: &Config) -> Result<Arc<dyn LanguageModel>> {
    let client = GeminiClient::new(
        &config.gemini_base_url,
        config.gemini_api_key.clone(),
        &config.commentary_model,
        config.external_timeout(),
    )
    .map_err(|e| crate::error::ApiError::ExternalServiceError(e.to_string()))?;
    Ok(Arc::new(client))
}

pub fn catalog_source(config: &Config) -> Result<Arc<dyn CatalogSource>> {
    let application_id = Config::require(&config.rakuten_application_id, "rakuten_application_id")?;
    Ok(Arc::new(RakutenClient::new(
        &config.rakuten_base_url,
        application_id,
        config.external_timeout(),
    )?))
}

/// Everything the HTTP handlers need, wired once at startup.
#[derive(Clone)]
pub struct Services {
    pub store: Arc<dyn CatalogStore>,
    pub search: WineSearch,
    pub recommendations: RecommendationService,
    pub batcher: IngestionBatcher,
}

impl Services {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        embedder: Arc<dyn TextEmbedder>,
        index: Arc<dyn VectorIndex>,
        commentary_model: Arc<dyn LanguageModel>,
        config: &Config,
    ) -> Self {
        let search = WineSearch::new(embedder.clone(), index.clone(), store.clone());
        let commentary = CommentaryGenerator::new(
            commentary_model,
            RetryPolicy::new(config.commentary_max_attempts, config.retry_base_delay()),
        );
        Self {
            recommendations: RecommendationService::new(search.clone(), commentary),
            batcher: IngestionBatcher::new(
                store.clone(),
                embedder,
                index,
                config.embed_batch_size,
            ),
            search,
            store,
        }
    }

    pub async fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            catalog_store(config).await?,
            text_embedder(config)?,
            vector_index(config)?,
            commentary_model(config)?,
            config,
        ))
    }

    /// Register shared state and every route on an app or test service.
    pub fn register(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(web::Data::from(self.store.clone()))
            .app_data(web::Data::new(self.search.clone()))
            .app_data(web::Data::new(self.recommendations.clone()))
            .app_data(web::Data::new(self.batcher.clone()))
            .service(api_routes())
            .service(openapi_route());
    }
}

pub struct Application {
    port: u16,
    host: String,
    config: Config,
}

impl Application {
    /// Create a new application instance
    pub fn new(config: &Config) -> Self {
        Self {
            port: config.port,
            host: config.host.clone(),
            config: config.clone(),
        }
    }

    /// Build and run the server
    pub async fn run(&self) -> Result<()> {
        let bind_address = format!("{}:{}", self.host, self.port);
        let listener = TcpListener::bind(&bind_address)?;
        info!("Starting server at http://{}", bind_address);

        self.run_with_listener(listener).await
    }

    /// Run the server with a specific TCP listener
    pub async fn run_with_listener(&self, listener: TcpListener) -> Result<()> {
        let services = Services::from_config(&self.config).await?;

        HttpServer::new(move || {
            let cors = Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header();

            App::new()
                .wrap(cors)
                .wrap(Logger::default())
                .configure(|cfg| services.register(cfg))
        })
        .listen(listener)?
        .run()
        .await?;

        Ok(())
    }
}
