pub mod health;
pub mod ingest;
pub mod recommendations;
pub mod wines;

pub use health::{health_check, health_options};
pub use ingest::ingest_config;
pub use recommendations::recommendations_config;
pub use wines::wines_config;
