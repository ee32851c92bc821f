// Application layer: use cases on top of the repository and the pure
// aggregation/comparison functions in `domain`.

pub mod config;
pub mod error;
pub mod reporting;
pub mod service;

pub use config::*;
pub use error::*;
pub use reporting::*;
pub use service::*;
