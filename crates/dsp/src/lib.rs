//! pegelwarte-dsp – Signal-Analyse
//!
//! Rechnet pro Frame die Messwerte die das Gateway an Dashboards
//! verteilt.
//!
//! ## Module
//! - [`analyzer`] – Messwert-Satz pro Frame, Pegel-Kalibrierung
//! - [`config`] – geteilte Analyzer-Konfiguration
//! - [`filter`] – einpolige Tiefpass/Hochpass-Filter
//! - [`spectrum`] – FFT-Zerlegung in 9 Frequenzbaender
//! - [`noise_floor`] – Rauschboden-Schaetzung fuer den SNR

pub mod analyzer;
pub mod config;
pub mod filter;
pub mod noise_floor;
pub mod spectrum;

pub use analyzer::{Messwerte, SignalAnalyzer};
pub use config::{AnalyzerConfig, FilterMode, KonfigHandle};
