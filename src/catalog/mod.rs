pub mod loader;
pub mod models;
pub mod repository;

pub use loader::{seed_catalog, CatalogSources};
pub use models::{Player, ServerInfo};
pub use repository::{CatalogRepository, InMemoryCatalogRepository, PostgresCatalogRepository};
