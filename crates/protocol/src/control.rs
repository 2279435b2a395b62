//! Steuerkanal (Text/JSON)
//!
//! Neben den binaeren Audio-Frames schickt der Produzent kleine
//! JSON-Nachrichten: eine Identifikation beim Verbinden und optionale
//! Konfigurations-Updates fuer den Analyzer. Beides ist nicht
//! zeitkritisch und laeuft ueber serde.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identifikation
// ---------------------------------------------------------------------------

/// Identifikations-Nachricht des Produzenten beim Verbindungsaufbau
///
/// z.B. `{"source":"arduino","status":"connected","type":"audio_processor"}`.
/// Alle Felder sind optional – die Nachricht wird akzeptiert, ist aber
/// keine Voraussetzung fuer den Framestrom.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Identifikation {
    /// Quellen-Kennung (z.B. "arduino", "laptop_microphone")
    pub source: Option<String>,
    /// Verbindungsstatus aus Sicht des Senders
    pub status: Option<String>,
    /// Geraetetyp
    #[serde(rename = "type")]
    pub typ: Option<String>,
}

// ---------------------------------------------------------------------------
// Konfigurations-Update
// ---------------------------------------------------------------------------

/// Konfigurations-Update fuer den Signal-Analyzer
///
/// Nur gesetzte Felder ueberschreiben die laufende Konfiguration;
/// das Update wirkt ab dem naechsten Frame, nie rueckwirkend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KonfigUpdate {
    /// Filtermodus: "none", "low_pass", "high_pass", "band_pass"
    pub filter: Option<String>,
    /// Untere Grenzfrequenz in Hz (Hochpass-Anteil)
    pub cutoff_low: Option<f32>,
    /// Obere Grenzfrequenz in Hz (Tiefpass-Anteil)
    pub cutoff_high: Option<f32>,
    /// Verstaerkung der Sprachbaender vor der SNR-Berechnung
    pub voice_boost: Option<bool>,
}

// ---------------------------------------------------------------------------
// SteuerNachricht
// ---------------------------------------------------------------------------

/// Eingehende Textnachricht auf dem Steuerkanal
#[derive(Debug, Clone)]
pub enum SteuerNachricht {
    /// Identifikation des Geraets
    Identifikation(Identifikation),
    /// Analyzer-Konfiguration ersetzen
    Konfig(KonfigUpdate),
}

impl SteuerNachricht {
    /// Parst eine Textnachricht vom Steuerkanal
    ///
    /// Das Feld `type` entscheidet: `"config"` ist ein Konfigurations-Update,
    /// alles andere wird als Identifikation gelesen (Sensor-Geraete senden
    /// dort ihren Geraetetyp).
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        let wert: serde_json::Value = serde_json::from_str(text)?;
        if wert.get("type").and_then(|t| t.as_str()) == Some("config") {
            let update: KonfigUpdate = serde_json::from_value(wert)?;
            Ok(Self::Konfig(update))
        } else {
            let ident: Identifikation = serde_json::from_value(wert)?;
            Ok(Self::Identifikation(ident))
        }
    }
}

// ---------------------------------------------------------------------------
// Begruessung
// ---------------------------------------------------------------------------

/// Begruessungsnachricht an einen frisch verbundenen Produzenten
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Begruessung {
    pub status: String,
    pub message: String,
}

impl Begruessung {
    /// Standard-Begruessung des Gateways
    pub fn standard() -> Self {
        Self {
            status: "connected".into(),
            message: "Welcome!".into(),
        }
    }

    /// Serialisiert die Begruessung als JSON-String
    pub fn als_json(&self) -> String {
        // Struktur enthaelt nur Strings, Serialisierung kann nicht fehlschlagen
        serde_json::to_string(self).unwrap_or_else(|_| "{\"status\":\"connected\"}".into())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
