//! Local persistence and auxiliary services: SQLite-backed credential and
//! draft storage, the operation progress tracker, and the best-effort
//! product page scraper.

pub mod content;
pub mod credentials;
pub mod progress;
pub mod scraper;

pub use content::ContentStore;
pub use credentials::CredentialStore;
pub use progress::ProgressTracker;
pub use scraper::{PriceEstimate, ProductInfo, ProductScraper};
