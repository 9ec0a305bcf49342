pub mod catalog_filter;
pub mod catalog_import;
pub mod catalog_store;
pub mod commentary;
pub mod gemini;
pub mod ingestion;
pub mod llm_output;
pub mod memory;
pub mod pinecone;
pub mod rakuten;
pub mod recommendation;
pub mod retry;
pub mod sentence_encoder;
pub mod traits;
pub mod wine_classifier;
pub mod wine_search;
pub mod workers_ai;

// Re-export public types
pub use catalog_import::{CatalogImporter, ImportSummary};
pub use catalog_store::PgCatalogStore;
pub use commentary::CommentaryGenerator;
pub use gemini::GeminiClient;
pub use ingestion::IngestionBatcher;
pub use memory::{InMemoryCatalogStore, InMemoryVectorIndex};
pub use pinecone::PineconeClient;
pub use rakuten::RakutenClient;
pub use recommendation::RecommendationService;
pub use retry::RetryPolicy;
pub use sentence_encoder::SentenceEncoder;
pub use traits::{CatalogQuery, CatalogSource, CatalogStore, LanguageModel, TextEmbedder, VectorIndex};
pub use wine_classifier::WineClassifier;
pub use wine_search::WineSearch;
pub use workers_ai::WorkersAiClient;
