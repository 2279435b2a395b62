//! Frequenzband-Zerlegung
//!
//! Zerlegt die Spektralenergie eines Sample-Puffers in 9 zusammenhaengende,
//! nicht ueberlappende Baender von 0 Hz bis zur halben Abtastrate. Das
//! Transformfenster ist konfigurierbar; kuerzere Puffer werden mit Nullen
//! aufgefuellt, von laengeren zaehlt nur das juengste Fensterstueck.

use pegelwarte_protocol::metrics::BAND_ANZAHL;
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

/// Untere Grenze des Sprachbandes in Hz (Voice-Boost)
pub const SPRACHBAND_TIEF: f32 = 500.0;

/// Obere Grenze des Sprachbandes in Hz (Voice-Boost)
pub const SPRACHBAND_HOCH: f32 = 2_500.0;

/// Verstaerkungsfaktor fuer Baender im Sprachband
pub const SPRACHBAND_FAKTOR: f32 = 2.0;

/// Band-Zerleger mit wiederverwendetem FFT-Planner
///
/// Der Planner cached Transformplaene; eine Instanz pro Analyzer genuegt.
pub struct BandZerleger {
    planner: FftPlanner<f32>,
}

impl BandZerleger {
    /// Erstellt einen neuen Band-Zerleger
    pub fn neu() -> Self {
        Self {
            planner: FftPlanner::new(),
        }
    }

    /// Berechnet die Energie der 9 Frequenzbaender
    ///
    /// Jeder Bandwert ist die Summe der Betragsspektren aller Bins deren
    /// Frequenz in den Bandbereich faellt. Band `i` deckt
    /// `[grenzen[i-1], grenzen[i])` ab, das erste Band beginnt bei 0 Hz;
    /// Bins oberhalb der letzten Grenze zaehlen nicht.
    pub fn berechnen(
        &mut self,
        samples: &[i16],
        abtastrate: u32,
        fenster_groesse: usize,
        band_grenzen: &[f32; BAND_ANZAHL],
    ) -> [f32; BAND_ANZAHL] {
        let mut baender = [0.0f32; BAND_ANZAHL];
        if samples.is_empty() || fenster_groesse == 0 || abtastrate == 0 {
            return baender;
        }

        // Juengstes Fensterstueck waehlen, kuerzere Puffer mit Nullen fuellen
        let start = samples.len().saturating_sub(fenster_groesse);
        let fenster = &samples[start..];

        let mut puffer: Vec<Complex<f32>> = fenster
            .iter()
            .map(|&s| Complex::new(s as f32, 0.0))
            .chain(std::iter::repeat(Complex::new(0.0, 0.0)))
            .take(fenster_groesse)
            .collect();

        let fft = self.planner.plan_fft_forward(fenster_groesse);
        fft.process(&mut puffer);

        // Nur die erste Haelfte der Bins traegt Information (reelles Signal)
        let bin_breite = abtastrate as f32 / fenster_groesse as f32;
        for (k, bin) in puffer.iter().enumerate().take(fenster_groesse / 2 + 1) {
            let frequenz = k as f32 * bin_breite;
            if let Some(index) = band_index(frequenz, band_grenzen) {
                baender[index] += bin.norm();
            }
        }

        baender
    }
}

impl Default for BandZerleger {
    fn default() -> Self {
        Self::neu()
    }
}

/// Ordnet eine Frequenz ihrem Band zu
fn band_index(frequenz: f32, band_grenzen: &[f32; BAND_ANZAHL]) -> Option<usize> {
    band_grenzen.iter().position(|&grenze| frequenz < grenze)
}

/// Verstaerkt Baender deren Bereich das Sprachband schneidet
///
/// Band `i` deckt `[grenzen[i-1], grenzen[i])` ab; verstaerkt wird jedes
/// Band dessen Bereich sich mit 500–2500 Hz ueberschneidet.
pub fn sprachband_verstaerken(baender: &mut [f32; BAND_ANZAHL], band_grenzen: &[f32; BAND_ANZAHL]) {
    let mut untergrenze = 0.0f32;
    for (band, &obergrenze) in baender.iter_mut().zip(band_grenzen.iter()) {
        if untergrenze < SPRACHBAND_HOCH && obergrenze > SPRACHBAND_TIEF {
            *band *= SPRACHBAND_FAKTOR;
        }
        untergrenze = obergrenze;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const GRENZEN: [f32; BAND_ANZAHL] = [
        250.0, 500.0, 1_000.0, 1_500.0, 2_000.0, 2_500.0, 3_000.0, 4_000.0, 8_000.0,
    ];

    fn sinus(frequenz: f32, abtastrate: f32, laenge: usize) -> Vec<i16> {
        (0..laenge)
            .map(|n| {
                let t = n as f32 / abtastrate;
                (10_000.0 * (2.0 * std::f32::consts::PI * frequenz * t).sin()) as i16
            })
            .collect()
    }

    #[test]
    fn stille_ergibt_leere_baender() {
        let mut zerleger = BandZerleger::neu();
        let baender = zerleger.berechnen(&[0i16; 128], 16_000, 128, &GRENZEN);
        for band in baender {
            assert!(band.abs() < 1e-3, "Stille darf keine Bandenergie haben");
        }
    }

    #[test]
    fn leerer_puffer_ergibt_nullen() {
        let mut zerleger = BandZerleger::neu();
        let baender = zerleger.berechnen(&[], 16_000, 128, &GRENZEN);
        assert_eq!(baender, [0.0; BAND_ANZAHL]);
    }

    #[test]
    fn sinus_landet_im_richtigen_band() {
        // 1000 Hz bei 16 kHz und Fenster 128: Bin-Breite 125 Hz, Bin 8 exakt.
        // 1000 Hz liegt in Band 3 ([1000, 1500)).
        let mut zerleger = BandZerleger::neu();
        let samples = sinus(1_000.0, 16_000.0, 128);
        let baender = zerleger.berechnen(&samples, 16_000, 128, &GRENZEN);

        let staerkstes = baender
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(staerkstes, 3, "1 kHz gehoert in Band [1000, 1500)");
    }

    #[test]
    fn kurzer_puffer_wird_mit_nullen_gefuellt() {
        let mut zerleger = BandZerleger::neu();
        let samples = sinus(1_000.0, 16_000.0, 40);
        let baender = zerleger.berechnen(&samples, 16_000, 128, &GRENZEN);
        let energie: f32 = baender.iter().sum();
        assert!(energie > 0.0, "Auch kurze Puffer liefern Bandenergie");
    }

    #[test]
    fn langer_puffer_nutzt_juengstes_fenster() {
        // Erste Haelfte 500 Hz, zweite Haelfte 3500 Hz – nur die juengeren
        // Samples (3500 Hz) duerfen das Ergebnis bestimmen.
        let abtastrate = 16_000.0;
        let mut samples = sinus(500.0, abtastrate, 512);
        samples.extend(sinus(3_500.0, abtastrate, 512));

        let mut zerleger = BandZerleger::neu();
        let baender = zerleger.berechnen(&samples, 16_000, 128, &GRENZEN);

        let staerkstes = baender
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(staerkstes, 7, "3.5 kHz gehoert in Band [3000, 4000)");
    }

    #[test]
    fn band_index_randfaelle() {
        assert_eq!(band_index(0.0, &GRENZEN), Some(0));
        assert_eq!(band_index(249.9, &GRENZEN), Some(0));
        assert_eq!(band_index(250.0, &GRENZEN), Some(1));
        assert_eq!(band_index(7_999.0, &GRENZEN), Some(8));
        assert_eq!(band_index(8_000.0, &GRENZEN), None);
    }

    #[test]
    fn sprachband_verstaerkung_trifft_nur_sprachbaender() {
        let mut baender = [1.0f32; BAND_ANZAHL];
        sprachband_verstaerken(&mut baender, &GRENZEN);

        // Band 0 [0,250) und Band 1 [250,500) liegen unter dem Sprachband
        assert_eq!(baender[0], 1.0);
        assert_eq!(baender[1], 1.0);
        // Band 2 [500,1000) bis Band 5 [2000,2500) liegen im Sprachband
        for i in 2..=5 {
            assert_eq!(baender[i], SPRACHBAND_FAKTOR, "Band {} muss verstaerkt sein", i);
        }
        // Band 6 [2500,3000) beginnt auf der Obergrenze – keine Ueberschneidung
        assert_eq!(baender[6], 1.0);
        assert_eq!(baender[8], 1.0);
    }
}
