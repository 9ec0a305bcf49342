pub mod fetch_catalog;
pub mod index_catalog;

pub use fetch_catalog::{fetch_catalog, FetchOptions};
pub use index_catalog::index_catalog;
