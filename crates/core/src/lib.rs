//! pegelwarte-core – Gemeinsame Typen und Fehlertypen
//!
//! Dieses Crate stellt die fundamentalen Bausteine bereit, die von allen
//! anderen Pegelwarte-Crates gemeinsam genutzt werden.

pub mod error;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use error::{PegelwarteError, Result};
pub use types::{KonsumentId, ProduzentId};
