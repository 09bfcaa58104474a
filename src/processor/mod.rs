pub mod field_extractor;
pub mod genre_expander;
pub mod quality_filter;
pub mod record_merger;

pub use field_extractor::*;
pub use genre_expander::*;
pub use quality_filter::*;
pub use record_merger::*;
