//! Signal-Analyzer – Messwerte pro Frame
//!
//! Konsumiert einen dekodierten Sample-Puffer und liefert einen
//! Messwert-Satz: Lautstaerke, Spitze-zu-Spitze, 9 Frequenzbaender,
//! Signal-Rausch-Abstand und optional dieselben Werte fuer eine
//! gefilterte Variante desselben Puffers.
//!
//! Bis auf den dokumentierten Rauschboden-Schaetzer ist jeder Aufruf
//! deterministisch aus Puffer und Konfiguration bestimmt.

use crate::config::{FilterMode, KonfigHandle};
use crate::filter::filter_anwenden;
use crate::noise_floor::{mittlere_energie, Rauschboden};
use crate::spectrum::{sprachband_verstaerken, BandZerleger};
use pegelwarte_protocol::frame::{FrameHeader, SamplePuffer};
use pegelwarte_protocol::metrics::BAND_ANZAHL;

// ---------------------------------------------------------------------------
// Pegel-Kalibrierung
// ---------------------------------------------------------------------------

/// Spitze-zu-Spitze-Werte bis hier gelten als Grundrauschen (Lautstaerke 0)
///
/// Zusammen mit [`PEGEL_DECKE`] auf den Dynamikbereich des Sensors
/// kalibriert; die Werte sind Vertragsbestandteil der Pegel-Abbildung
/// und duerfen nicht verschoben werden.
pub const RAUSCH_SCHWELLE: u32 = 100;

/// Spitze-zu-Spitze-Wert der auf Lautstaerke 100 abgebildet wird
pub const PEGEL_DECKE: u32 = 20_000;

/// Bildet eine Spitze-zu-Spitze-Amplitude linear auf 0–100 ab
///
/// Werte bis [`RAUSCH_SCHWELLE`] ergeben 0, ab [`PEGEL_DECKE`] wird auf
/// 100 geklemmt.
pub fn volumen_aus_spitze(spitze_zu_spitze: u32) -> u8 {
    if spitze_zu_spitze <= RAUSCH_SCHWELLE {
        return 0;
    }
    let begrenzt = spitze_zu_spitze.min(PEGEL_DECKE);
    ((begrenzt - RAUSCH_SCHWELLE) * 100 / (PEGEL_DECKE - RAUSCH_SCHWELLE)) as u8
}

// ---------------------------------------------------------------------------
// Messwerte
// ---------------------------------------------------------------------------

/// Messwert-Satz eines verarbeiteten Frames
///
/// Reiner Wert ohne Identitaet jenseits seines Zeitstempels; wird einmal
/// pro Frame erzeugt und danach nicht mehr veraendert.
#[derive(Debug, Clone, PartialEq)]
pub struct Messwerte {
    /// Lautstaerke 0–100
    pub volumen: u8,
    /// Spitze-zu-Spitze-Amplitude
    pub spitze_zu_spitze: u32,
    /// Energie der 9 Frequenzbaender
    pub baender: [f32; BAND_ANZAHL],
    /// Signal-Rausch-Abstand in dB
    pub snr_db: f32,
    /// Kleinster Sample-Wert
    pub min: i16,
    /// Groesster Sample-Wert
    pub max: i16,
    /// Mittelwert der Samples
    pub mittelwert: f32,
    /// Produzenten-Zeitstempel aus dem Frame-Header
    pub zeitstempel: u32,
    /// Messwerte der gefilterten Variante (nur bei aktivem Filter)
    pub gefiltert: Option<Box<Messwerte>>,
}

// ---------------------------------------------------------------------------
// SignalAnalyzer
// ---------------------------------------------------------------------------

/// Signal-Analyzer mit Rauschboden-Zustand pro logischem Kanal
pub struct SignalAnalyzer {
    konfig: KonfigHandle,
    zerleger: BandZerleger,
    rauschboden_roh: Rauschboden,
    rauschboden_gefiltert: Rauschboden,
}

impl SignalAnalyzer {
    /// Erstellt einen Analyzer mit geteilter Konfiguration
    pub fn neu(konfig: KonfigHandle) -> Self {
        Self {
            konfig,
            zerleger: BandZerleger::neu(),
            rauschboden_roh: Rauschboden::neu(),
            rauschboden_gefiltert: Rauschboden::neu(),
        }
    }

    /// Analysiert einen Sample-Puffer und liefert den Messwert-Satz
    ///
    /// Ein leerer Puffer ist gueltige Eingabe (Stille): Lautstaerke 0,
    /// Spitze-zu-Spitze 0, Baender leer.
    pub fn analysieren(&mut self, puffer: &SamplePuffer, header: &FrameHeader) -> Messwerte {
        let konfig = self.konfig.lesen();
        let abtastrate = if header.abtastrate > 0 {
            header.abtastrate
        } else {
            konfig.fallback_abtastrate
        };

        let samples = puffer.als_slice();
        let mut messwerte = Self::grundmesswerte(samples, header.zeitstempel);

        messwerte.baender = self.zerleger.berechnen(
            samples,
            abtastrate,
            konfig.fenster_groesse,
            &konfig.band_grenzen,
        );
        messwerte.snr_db =
            self.rauschboden_roh.snr_aktualisieren(mittlere_energie(samples)) as f32;

        if konfig.filter_modus != FilterMode::None {
            let gefiltert = filter_anwenden(
                konfig.filter_modus,
                konfig.grenzfrequenz_tief,
                konfig.grenzfrequenz_hoch,
                abtastrate as f32,
                samples,
            );

            let mut variante = Self::grundmesswerte(&gefiltert, header.zeitstempel);
            variante.baender = self.zerleger.berechnen(
                &gefiltert,
                abtastrate,
                konfig.fenster_groesse,
                &konfig.band_grenzen,
            );

            // Voice-Boost hebt die Sprachbaender an; der SNR der Variante
            // rechnet dann auf der verstaerkten Bandenergie
            let energie = if konfig.voice_boost {
                sprachband_verstaerken(&mut variante.baender, &konfig.band_grenzen);
                variante.baender.iter().map(|&b| b as f64).sum()
            } else {
                mittlere_energie(&gefiltert)
            };
            variante.snr_db = self.rauschboden_gefiltert.snr_aktualisieren(energie) as f32;

            messwerte.gefiltert = Some(Box::new(variante));
        }

        messwerte
    }

    /// Setzt den Rauschboden-Zustand zurueck (z.B. bei Produzentenwechsel)
    pub fn reset(&mut self) {
        self.rauschboden_roh.reset();
        self.rauschboden_gefiltert.reset();
    }

    /// Messwerte die direkt aus den Samples folgen (ohne Spektrum und SNR)
    fn grundmesswerte(samples: &[i16], zeitstempel: u32) -> Messwerte {
        let (min, max, summe) = samples.iter().fold(
            (i16::MAX, i16::MIN, 0i64),
            |(min, max, summe), &s| (min.min(s), max.max(s), summe + s as i64),
        );

        let (min, max) = if samples.is_empty() { (0, 0) } else { (min, max) };
        let spitze_zu_spitze = (max as i32 - min as i32) as u32;
        let mittelwert = if samples.is_empty() {
            0.0
        } else {
            summe as f32 / samples.len() as f32
        };

        Messwerte {
            volumen: volumen_aus_spitze(spitze_zu_spitze),
            spitze_zu_spitze,
            baender: [0.0; BAND_ANZAHL],
            snr_db: 0.0,
            min,
            max,
            mittelwert,
            zeitstempel,
            gefiltert: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
