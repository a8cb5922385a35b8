pub mod error_classifier;
pub mod repair_loop;
pub mod retry_context;

pub use error_classifier::*;
pub use repair_loop::*;
pub use retry_context::*;
