pub mod metrics;
pub mod notice;
pub mod settle;

pub use metrics::*;
pub use notice::*;
pub use settle::*;
