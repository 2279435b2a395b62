//! Analyzer-Konfiguration
//!
//! Prozessweit geteilt, read-mostly. Jeder Analyse-Aufruf liest eine
//! Kopie; ein Konfigurations-Update ersetzt den Wert atomar und wirkt
//! ab dem naechsten Frame, nie rueckwirkend.

use parking_lot::RwLock;
use pegelwarte_protocol::control::KonfigUpdate;
use pegelwarte_protocol::metrics::BAND_ANZAHL;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Filtermodus fuer die optionale zweite Messwert-Reihe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    /// Kein Filter – nur Roh-Messwerte
    None,
    /// Einpoliger Tiefpass
    LowPass,
    /// Einpoliger Hochpass
    HighPass,
    /// Bandpass aus Tiefpass + Hochpass
    BandPass,
}

impl FilterMode {
    /// Parst die Wire-Darstellung aus einem Konfig-Update
    pub fn from_str(wert: &str) -> Option<Self> {
        match wert {
            "none" => Some(Self::None),
            "low_pass" => Some(Self::LowPass),
            "high_pass" => Some(Self::HighPass),
            "band_pass" => Some(Self::BandPass),
            _ => None,
        }
    }
}

/// Konfiguration des Signal-Analyzers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Filtermodus fuer die gefilterte Messwert-Reihe
    pub filter_modus: FilterMode,
    /// Untere Grenzfrequenz in Hz (Hochpass-Anteil)
    pub grenzfrequenz_tief: f32,
    /// Obere Grenzfrequenz in Hz (Tiefpass-Anteil)
    pub grenzfrequenz_hoch: f32,
    /// Verstaerkt die Sprachbaender (~500–2500 Hz) vor der SNR-Berechnung
    pub voice_boost: bool,
    /// Obergrenzen der 9 Frequenzbaender in Hz, aufsteigend;
    /// das erste Band beginnt bei 0 Hz
    pub band_grenzen: [f32; BAND_ANZAHL],
    /// Transformfenster in Samples
    pub fenster_groesse: usize,
    /// Abtastrate falls der Frame-Header keinen Hinweis traegt
    pub fallback_abtastrate: u32,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            filter_modus: FilterMode::None,
            grenzfrequenz_tief: 300.0,
            grenzfrequenz_hoch: 3_000.0,
            voice_boost: false,
            band_grenzen: [
                250.0, 500.0, 1_000.0, 1_500.0, 2_000.0, 2_500.0, 3_000.0, 4_000.0, 8_000.0,
            ],
            fenster_groesse: 128,
            fallback_abtastrate: 16_000,
        }
    }
}

/// Geteilter Zugriff auf die Analyzer-Konfiguration
///
/// Clone teilt den inneren Zustand (Arc). Der Write-Lock wird nur fuer
/// die Dauer des Austauschs gehalten, nie ueber einen Frame hinweg.
#[derive(Clone)]
pub struct KonfigHandle {
    inner: Arc<RwLock<AnalyzerConfig>>,
}

impl KonfigHandle {
    /// Erstellt ein Handle mit der gegebenen Startkonfiguration
    pub fn neu(konfig: AnalyzerConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(konfig)),
        }
    }

    /// Gibt eine Kopie der aktuellen Konfiguration zurueck
    pub fn lesen(&self) -> AnalyzerConfig {
        self.inner.read().clone()
    }

    /// Ersetzt die Konfiguration atomar
    pub fn ersetzen(&self, konfig: AnalyzerConfig) {
        *self.inner.write() = konfig;
    }

    /// Wendet ein Konfig-Update vom Steuerkanal an
    ///
    /// Nur gesetzte Felder ueberschreiben; unbekannte Filternamen werden
    /// geloggt und ignoriert statt die Session zu stoeren.
    pub fn update_anwenden(&self, update: &KonfigUpdate) {
        let mut konfig = self.inner.write();

        if let Some(filter) = update.filter.as_deref() {
            match FilterMode::from_str(filter) {
                Some(modus) => konfig.filter_modus = modus,
                None => {
                    tracing::warn!(filter = filter, "Unbekannter Filtermodus im Konfig-Update");
                }
            }
        }
        if let Some(tief) = update.cutoff_low {
            konfig.grenzfrequenz_tief = tief;
        }
        if let Some(hoch) = update.cutoff_high {
            konfig.grenzfrequenz_hoch = hoch;
        }
        if let Some(boost) = update.voice_boost {
            konfig.voice_boost = boost;
        }

        tracing::info!(
            filter = ?konfig.filter_modus,
            tief = konfig.grenzfrequenz_tief,
            hoch = konfig.grenzfrequenz_hoch,
            voice_boost = konfig.voice_boost,
            "Analyzer-Konfiguration ersetzt"
        );
    }
}

impl Default for KonfigHandle {
    fn default() -> Self {
        Self::neu(AnalyzerConfig::default())
    }
}
