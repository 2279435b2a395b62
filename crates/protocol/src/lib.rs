//! pegelwarte-protocol – Protokoll-Definitionen
//!
//! ## Module
//! - [`frame`] – binaeres Sensor-Frameformat (Hot Path, kein serde)
//! - [`control`] – Steuerkanal: Identifikation und Konfig-Updates (JSON)
//! - [`metrics`] – Messwert-Nachrichten an Dashboards (JSON)

pub mod control;
pub mod frame;
pub mod metrics;

pub use frame::{AudioFrame, FrameFehler, FrameHeader, SamplePuffer};
pub use metrics::MesswertNachricht;
