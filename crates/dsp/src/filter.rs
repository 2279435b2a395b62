//! Einpolige Filter fuer die gefilterte Messwert-Reihe
//!
//! Tiefpass und Hochpass als klassische Einpol-Rekursionen; der Bandpass
//! entsteht durch Hintereinanderschalten beider. Der Filterzustand lebt
//! nur fuer die Dauer eines Frames – ueber Frames hinweg traegt der
//! Analyzer ausschliesslich den Rauschboden-Schaetzer.

use crate::config::FilterMode;

// ---------------------------------------------------------------------------
// Einpol-Tiefpass
// ---------------------------------------------------------------------------

/// Einpoliger Tiefpass (RC-Glied)
pub struct EinpolTiefpass {
    alpha: f32,
    zustand: f32,
}

impl EinpolTiefpass {
    /// Erstellt einen Tiefpass mit der gegebenen Grenzfrequenz
    pub fn neu(grenzfrequenz: f32, abtastrate: f32) -> Self {
        let rc = 1.0 / (2.0 * std::f32::consts::PI * grenzfrequenz.max(1.0));
        let dt = 1.0 / abtastrate.max(1.0);
        Self {
            alpha: dt / (rc + dt),
            zustand: 0.0,
        }
    }

    /// Verarbeitet einen Puffer in-place
    pub fn verarbeiten(&mut self, samples: &mut [f32]) {
        for sample in samples.iter_mut() {
            self.zustand += self.alpha * (*sample - self.zustand);
            *sample = self.zustand;
        }
    }
}

// ---------------------------------------------------------------------------
// Einpol-Hochpass
// ---------------------------------------------------------------------------

/// Einpoliger Hochpass (CR-Glied)
pub struct EinpolHochpass {
    beta: f32,
    vorher_eingang: f32,
    vorher_ausgang: f32,
}

impl EinpolHochpass {
    /// Erstellt einen Hochpass mit der gegebenen Grenzfrequenz
    pub fn neu(grenzfrequenz: f32, abtastrate: f32) -> Self {
        let rc = 1.0 / (2.0 * std::f32::consts::PI * grenzfrequenz.max(1.0));
        let dt = 1.0 / abtastrate.max(1.0);
        Self {
            beta: rc / (rc + dt),
            vorher_eingang: 0.0,
            vorher_ausgang: 0.0,
        }
    }

    /// Verarbeitet einen Puffer in-place
    pub fn verarbeiten(&mut self, samples: &mut [f32]) {
        for sample in samples.iter_mut() {
            let eingang = *sample;
            let ausgang = self.beta * (self.vorher_ausgang + eingang - self.vorher_eingang);
            self.vorher_eingang = eingang;
            self.vorher_ausgang = ausgang;
            *sample = ausgang;
        }
    }
}

// ---------------------------------------------------------------------------
// Filter-Anwendung
// ---------------------------------------------------------------------------

/// Wendet den konfigurierten Filter auf einen Sample-Puffer an
///
/// Gibt den gefilterten Puffer als neue i16-Folge zurueck; bei
/// `FilterMode::None` eine unveraenderte Kopie. Der Aufrufer rechnet auf
/// dem Ergebnis dieselben Messwerte wie auf dem Rohsignal.
pub fn filter_anwenden(
    modus: FilterMode,
    grenzfrequenz_tief: f32,
    grenzfrequenz_hoch: f32,
    abtastrate: f32,
    samples: &[i16],
) -> Vec<i16> {
    if modus == FilterMode::None {
        return samples.to_vec();
    }

    let mut puffer: Vec<f32> = samples.iter().map(|&s| s as f32).collect();

    match modus {
        FilterMode::None => {}
        FilterMode::LowPass => {
            EinpolTiefpass::neu(grenzfrequenz_hoch, abtastrate).verarbeiten(&mut puffer);
        }
        FilterMode::HighPass => {
            EinpolHochpass::neu(grenzfrequenz_tief, abtastrate).verarbeiten(&mut puffer);
        }
        FilterMode::BandPass => {
            // Bandpass = Tiefpass (obere Grenze) + Hochpass (untere Grenze)
            EinpolTiefpass::neu(grenzfrequenz_hoch, abtastrate).verarbeiten(&mut puffer);
            EinpolHochpass::neu(grenzfrequenz_tief, abtastrate).verarbeiten(&mut puffer);
        }
    }

    puffer
        .into_iter()
        .map(|s| s.round().clamp(i16::MIN as f32, i16::MAX as f32) as i16)
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
