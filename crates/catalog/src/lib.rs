pub mod schema;
pub mod client;
pub mod resolver;

pub use schema::{CatalogEntry, Category, ResolvedEntities};
pub use client::{CatalogClient, CatalogConfig, CatalogLookup};
pub use resolver::Resolver;
