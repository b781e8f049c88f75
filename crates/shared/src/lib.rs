pub mod error;
pub mod progress;
pub mod types;

pub use error::{ApiError, ErrorCode};
pub use types::{ColorSettings, ContentData, ImageResult, PromotionType, Provider, TextResult};
