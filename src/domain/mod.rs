mod aggregate;
mod client;
mod compare;
mod entry;
mod metrics;
mod money;
mod month;
mod period;

pub use aggregate::*;
pub use client::*;
pub use compare::*;
pub use entry::*;
pub use metrics::*;
pub use money::*;
pub use month::*;
pub use period::*;
