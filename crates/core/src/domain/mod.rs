pub mod price;
pub mod product;
pub mod query;
pub mod spec;

pub use price::{latest_price, PriceRecord};
pub use product::{Product, ProductId};
pub use query::{Budget, Priority, RecommendRequest, UsageKind};
pub use spec::{GpuTier, PanelType, ParsedSpec};
