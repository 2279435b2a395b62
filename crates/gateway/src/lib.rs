//! pegelwarte-gateway – Echtzeit-Telemetrie-Gateway
//!
//! Nimmt genau eine Produzenten-Verbindung mit rohen Audio-Frames an,
//! rechnet pro Frame einen Messwert-Satz und verteilt ihn an beliebig
//! viele Dashboard-Verbindungen – jede mit eigener Queue, eigenem
//! Lebenszeichen und eigener Fehlerdomaene.
//!
//! ## Module
//! - [`registry`] – Mitgliederliste und Broadcast ueber Send-Queues
//! - [`gateway`] – Orchestrierung: dekodieren, analysieren, verteilen
//! - [`telemetry`] – Zaehlwerk und periodische Zusammenfassungen

pub mod gateway;
pub mod registry;
pub mod telemetry;

pub use gateway::{GatewayConfig, ProduzentEingang, ProduzentVerbindung, TelemetrieGateway};
pub use registry::VerbindungsRegistry;
