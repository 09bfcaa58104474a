pub mod aggregator;
pub mod correlation;
pub mod feature_engine;
pub mod insights;
pub mod store;

pub use aggregator::*;
pub use correlation::*;
pub use feature_engine::*;
pub use insights::*;
pub use store::*;
