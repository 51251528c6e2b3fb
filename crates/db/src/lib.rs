pub mod catalog;
pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod repositories;

pub use catalog::{Catalog, GameEstimateView, PriceTrendView, ProductDetail};
pub use connection::{connect_with_settings, DbPool};
pub use fixtures::{DemoCatalog, SeedCheck, SeedResult, VerificationResult};
pub use repositories::{
    ProductListing, ProductPage, ProductQuery, ProductSort, RepositoryError, SqlNarrativeCache,
};
