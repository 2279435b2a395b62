//! Messwert-Nachrichten an Konsumenten
//!
//! Das Gateway serialisiert pro verarbeitetem Frame genau eine
//! `MesswertNachricht` und verteilt den fertigen JSON-String an alle
//! Dashboard-Verbindungen. Die Feldnamen sind camelCase, damit die
//! bestehenden Dashboards sie direkt lesen koennen.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Anzahl der Frequenzbaender in jeder Messwert-Nachricht
pub const BAND_ANZAHL: usize = 9;

// ---------------------------------------------------------------------------
// MesswertNachricht
// ---------------------------------------------------------------------------

/// Ein Messwert-Update wie es an Dashboards geht
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MesswertNachricht {
    /// Quellen-Kennung des Produzenten
    pub source: String,
    /// Lautstaerke 0–100
    pub volume: u8,
    /// Spitze-zu-Spitze-Amplitude
    pub peak_to_peak: u32,
    /// Energie der 9 Frequenzbaender (roh)
    pub bands: [f32; BAND_ANZAHL],
    /// Energie der 9 Frequenzbaender nach Filterung
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filtered_bands: Option<[f32; BAND_ANZAHL]>,
    /// Signal-Rausch-Abstand in dB (roh)
    pub snr: f32,
    /// Signal-Rausch-Abstand in dB nach Filterung
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filtered_snr: Option<f32>,
    /// Kleinster Sample-Wert im Frame
    pub min: i16,
    /// Groesster Sample-Wert im Frame
    pub max: i16,
    /// Mittelwert der Samples
    pub avg: f32,
    /// Produzenten-Zeitstempel aus dem Frame-Header
    pub timestamp: u32,
    /// Empfangszeitpunkt am Gateway (ISO 8601)
    pub received_at: DateTime<Utc>,
}

impl MesswertNachricht {
    /// Serialisiert die Nachricht als JSON-String
    pub fn als_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// ---------------------------------------------------------------------------
// InitialDaten
// ---------------------------------------------------------------------------

/// Nachgelieferte Historie fuer frisch verbundene Dashboards
///
/// Wird genau einmal direkt nach der Registrierung gesendet, bevor die
/// Live-Updates beginnen.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitialDaten {
    /// Nachrichtentyp-Kennung, immer `"initial_data"`
    #[serde(rename = "type")]
    pub typ: String,
    /// Juengste Messwerte, aelteste zuerst
    pub data: Vec<MesswertNachricht>,
}

impl InitialDaten {
    /// Baut die Initial-Nachricht aus den juengsten Messwerten
    pub fn neu(data: Vec<MesswertNachricht>) -> Self {
        Self {
            typ: "initial_data".into(),
            data,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
