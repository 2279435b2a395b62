//! Rauschboden-Schaetzung und SNR
//!
//! Der Rauschboden ist eine langsam nachgefuehrte Grundenergie: nach
//! unten folgt er dem Signal sofort (leisester juengster Zustand), nach
//! oben nur gedaempft. Das ist der einzige Analyzer-Zustand der Aufrufe
//! ueberdauert – eine Instanz pro logischem Kanal (roh, gefiltert).

/// Glaettungsfaktor fuer den Anstieg des Rauschbodens
const ANSTIEG_ALPHA: f64 = 0.02;

/// Untergrenze gegen log(0) und Division durch Null
const ENERGIE_MINIMUM: f64 = 1e-9;

/// Laufender Rauschboden-Schaetzer fuer einen logischen Kanal
#[derive(Debug, Clone)]
pub struct Rauschboden {
    boden: Option<f64>,
}

impl Rauschboden {
    /// Erstellt einen Schaetzer ohne Vorwissen
    pub fn neu() -> Self {
        Self { boden: None }
    }

    /// Aktualisiert den Boden mit der Frame-Energie und gibt den SNR in dB zurueck
    ///
    /// Faellt die Energie unter den Boden, springt der Boden sofort mit;
    /// steigt sie, folgt er nur mit `ANSTIEG_ALPHA`. So drueckt ein kurzer
    /// lauter Ausschlag den Boden nicht nach oben.
    pub fn snr_aktualisieren(&mut self, energie: f64) -> f64 {
        let energie = energie.max(ENERGIE_MINIMUM);

        let boden = match self.boden {
            None => energie,
            Some(boden) if energie < boden => energie,
            Some(boden) => boden + ANSTIEG_ALPHA * (energie - boden),
        };
        self.boden = Some(boden);

        10.0 * (energie / boden.max(ENERGIE_MINIMUM)).log10()
    }

    /// Gibt den aktuellen Boden zurueck (None vor dem ersten Frame)
    pub fn boden(&self) -> Option<f64> {
        self.boden
    }

    /// Setzt den Schaetzer zurueck (z.B. bei neuem Produzenten)
    pub fn reset(&mut self) {
        self.boden = None;
    }
}

impl Default for Rauschboden {
    fn default() -> Self {
        Self::neu()
    }
}

/// Mittlere Energie eines Sample-Puffers (mittleres Quadrat)
pub fn mittlere_energie(samples: &[i16]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let summe: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    summe / samples.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn erster_frame_setzt_boden() {
        let mut rb = Rauschboden::neu();
        let snr = rb.snr_aktualisieren(100.0);
        // Energie == Boden: SNR genau 0 dB
        assert!(snr.abs() < 1e-9);
        assert_eq!(rb.boden(), Some(100.0));
    }

    #[test]
    fn lautes_signal_ueber_leisem_boden_gibt_positiven_snr() {
        let mut rb = Rauschboden::neu();
        // Boden auf leisem Niveau einschwingen
        for _ in 0..10 {
            rb.snr_aktualisieren(10.0);
        }
        let snr = rb.snr_aktualisieren(10_000.0);
        // 30 dB Abstand, Boden steigt nur minimal mit
        assert!(snr > 25.0, "SNR sollte deutlich positiv sein, war {snr}");
    }

    #[test]
    fn boden_faellt_sofort() {
        let mut rb = Rauschboden::neu();
        rb.snr_aktualisieren(1_000.0);
        rb.snr_aktualisieren(10.0);
        assert_eq!(rb.boden(), Some(10.0));
    }

    #[test]
    fn boden_steigt_nur_gedaempft() {
        let mut rb = Rauschboden::neu();
        rb.snr_aktualisieren(10.0);
        rb.snr_aktualisieren(10_000.0);
        let boden = rb.boden().unwrap();
        assert!(boden < 300.0, "Ein Ausschlag darf den Boden kaum heben, war {boden}");
        assert!(boden > 10.0);
    }

    #[test]
    fn null_energie_ist_gueltig() {
        let mut rb = Rauschboden::neu();
        let snr = rb.snr_aktualisieren(0.0);
        assert!(snr.is_finite(), "Stille darf keinen NaN/Inf SNR erzeugen");
    }

    #[test]
    fn reset_vergisst_boden() {
        let mut rb = Rauschboden::neu();
        rb.snr_aktualisieren(42.0);
        rb.reset();
        assert!(rb.boden().is_none());
    }

    #[test]
    fn mittlere_energie_berechnung() {
        assert_eq!(mittlere_energie(&[]), 0.0);
        assert_eq!(mittlere_energie(&[0, 0, 0]), 0.0);
        // (100^2 + 100^2) / 2 = 10000
        assert_eq!(mittlere_energie(&[100, -100]), 10_000.0);
    }
}
