//! Typed wire contracts of the FRA portal services.

pub mod choice;
pub mod claims;
pub mod dashboard;
pub mod documents;
pub mod dss;
pub mod imagery;
pub mod records;
pub mod village;

pub use choice::*;
pub use claims::*;
pub use dashboard::*;
pub use documents::*;
pub use dss::*;
pub use imagery::*;
pub use records::*;
pub use village::*;

/// Response of `GET /states`.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StateList {
    #[serde(default)]
    pub states: Vec<String>,
}
