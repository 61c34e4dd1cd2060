//! HTTP access to the FRA portal: claims, spatial layers, dashboards,
//! document and imagery analysis, and decision support.

pub mod batch;
pub mod client;
pub mod config;
pub mod error;
pub mod spatial;
pub mod upload;

pub use batch::{BatchItem, BatchProgress, BatchReport, ItemOutcome, run_batch};
pub use client::PortalClient;
pub use config::ApiConfig;
pub use error::ApiError;
pub use upload::{UploadFile, UploadKind};
