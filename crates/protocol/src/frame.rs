//! Sensor-Protokoll (binaer)
//!
//! Definiert die binaere Framestruktur fuer die Audio-Uebertragung vom
//! Sensor-Geraet. Die Samples kommen bereits digitalisiert an; der Server
//! dekodiert nur Header und Payload.
//!
//! ## Frameformat (Header = 8 Bytes, kein serde, little-endian)
//!
//! ```text
//! Offset  Len  Beschreibung
//! ------  ---  -----------
//!  0       1   Nachrichtentyp (0x01 = Audio-Frame)
//!  1       4   Zeitstempel (u32, monoton, wrappt bei 32 Bit)
//!  5       2   Abtastraten-Hinweis / 100 (u16)
//!  7       1   Chunk-Groessen-Hinweis / 64 (u8)
//!  8+      N   Interleaved signed 16-bit Samples (little-endian)
//! ```
//!
//! Die Payload bleibt beim Dekodieren ein `Bytes`-Slice auf den
//! Empfangspuffer (zero-copy); erst die Sample-Konvertierung allokiert.

use bytes::Bytes;
use thiserror::Error;

/// Nachrichtentyp-Tag fuer Audio-Frames
pub const NACHRICHTENTYP_AUDIO: u8 = 0x01;

/// Teiler fuer den Abtastraten-Hinweis im Header
pub const ABTASTRATE_TEILER: u32 = 100;

/// Teiler fuer den Chunk-Groessen-Hinweis im Header
pub const CHUNK_TEILER: u32 = 64;

// ---------------------------------------------------------------------------
// Fehler
// ---------------------------------------------------------------------------

/// Dekodierfehler fuer Sensor-Frames
///
/// Beide Varianten sind lokal: der Aufrufer verwirft das Frame und
/// verarbeitet weiter, statt die Session abzubrechen.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameFehler {
    /// Eingabe kuerzer als der 8-Byte-Header
    #[error("Frame zu kurz: {laenge} Bytes (Header erwartet {})", FrameHeader::SIZE)]
    FrameZuKurz { laenge: usize },

    /// Erstes Header-Byte ist kein bekannter Nachrichtentyp
    #[error("Unbekannter Nachrichtentyp: 0x{0:02x}")]
    UnbekannterNachrichtenTyp(u8),
}

// ---------------------------------------------------------------------------
// FrameHeader
// ---------------------------------------------------------------------------

/// 8-Byte Header eines Sensor-Frames
///
/// Direkte Byte-Serialisierung, kein serde (Hot Path).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Produzenten-Zeitstempel (monoton, wrappt bei 32 Bit)
    pub zeitstempel: u32,
    /// Abtastrate in Hz (im Header als Rate/100 uebertragen)
    pub abtastrate: u32,
    /// Chunk-Groesse in Samples (im Header als Groesse/64 uebertragen)
    pub chunk_groesse: u32,
}

impl FrameHeader {
    /// Header-Groesse in Bytes
    pub const SIZE: usize = 8;

    /// Erstellt einen neuen Header
    pub fn new(zeitstempel: u32, abtastrate: u32, chunk_groesse: u32) -> Self {
        Self {
            zeitstempel,
            abtastrate,
            chunk_groesse,
        }
    }

    /// Serialisiert den Header in ein 8-Byte-Array (little-endian)
    ///
    /// Abtastrate und Chunk-Groesse werden durch ihre Teiler komprimiert;
    /// Werte die nicht glatt teilbar sind verlieren den Rest.
    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0] = NACHRICHTENTYP_AUDIO;
        buf[1..5].copy_from_slice(&self.zeitstempel.to_le_bytes());
        buf[5..7].copy_from_slice(&((self.abtastrate / ABTASTRATE_TEILER) as u16).to_le_bytes());
        buf[7] = (self.chunk_groesse / CHUNK_TEILER) as u8;
        buf
    }

    /// Deserialisiert einen Header aus einem Byte-Slice
    ///
    /// # Fehler
    /// - `FrameZuKurz` wenn das Slice kuerzer als 8 Bytes ist
    /// - `UnbekannterNachrichtenTyp` bei fremdem Typ-Tag
    pub fn decode(buf: &[u8]) -> Result<Self, FrameFehler> {
        if buf.len() < Self::SIZE {
            return Err(FrameFehler::FrameZuKurz { laenge: buf.len() });
        }

        if buf[0] != NACHRICHTENTYP_AUDIO {
            return Err(FrameFehler::UnbekannterNachrichtenTyp(buf[0]));
        }

        let zeitstempel = u32::from_le_bytes([buf[1], buf[2], buf[3], buf[4]]);
        let abtastrate = u16::from_le_bytes([buf[5], buf[6]]) as u32 * ABTASTRATE_TEILER;
        let chunk_groesse = buf[7] as u32 * CHUNK_TEILER;

        Ok(Self {
            zeitstempel,
            abtastrate,
            chunk_groesse,
        })
    }
}

// ---------------------------------------------------------------------------
// SamplePuffer
// ---------------------------------------------------------------------------

/// Geordnete Folge signierter 16-Bit-Samples aus einem Frame
///
/// Nach der Konvertierung unveraenderlich; gehoert exklusiv dem
/// Analyse-Schritt der sie konsumiert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamplePuffer(Vec<i16>);

impl SamplePuffer {
    /// Erstellt einen Puffer aus bereits konvertierten Samples
    pub fn aus_samples(samples: Vec<i16>) -> Self {
        Self(samples)
    }

    /// Gibt die Samples als Slice zurueck
    pub fn als_slice(&self) -> &[i16] {
        &self.0
    }

    /// Anzahl der Samples
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Prueft ob der Puffer leer ist (Stille ist gueltige Eingabe)
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ---------------------------------------------------------------------------
// AudioFrame
// ---------------------------------------------------------------------------

/// Vollstaendiges Sensor-Frame (Header + rohe Sample-Bytes)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    /// 8-Byte Header
    pub header: FrameHeader,
    /// Rohe Sample-Bytes – Slice auf den Empfangspuffer (zero-copy)
    pub nutzdaten: Bytes,
}

impl AudioFrame {
    /// Dekodiert ein Frame aus einem Empfangspuffer
    ///
    /// Die Nutzdaten bleiben ein `Bytes`-Slice auf denselben Puffer;
    /// pro Frame wird hier nichts kopiert.
    ///
    /// # Fehler
    /// Header-Validierungsfehler (Laenge, Nachrichtentyp).
    pub fn decode(buf: &Bytes) -> Result<Self, FrameFehler> {
        let header = FrameHeader::decode(buf)?;
        let nutzdaten = buf.slice(FrameHeader::SIZE..);
        Ok(Self { header, nutzdaten })
    }

    /// Konvertiert die Nutzdaten in einen Sample-Puffer
    ///
    /// Byte-Paare werden little-endian zu i16 kombiniert. Ein ungerades
    /// letztes Byte wird stillschweigend verworfen – dokumentierter
    /// verlustbehafteter Randfall, kein Fehler.
    pub fn sample_puffer(&self) -> SamplePuffer {
        let samples = self
            .nutzdaten
            .chunks_exact(2)
            .map(|paar| i16::from_le_bytes([paar[0], paar[1]]))
            .collect();
        SamplePuffer(samples)
    }

    /// Serialisiert ein Frame aus Samples (fuer Tests und Sensor-Simulatoren)
    pub fn encode(header: FrameHeader, samples: &[i16]) -> Vec<u8> {
        let mut buf = Vec::with_capacity(FrameHeader::SIZE + samples.len() * 2);
        buf.extend_from_slice(&header.encode());
        for sample in samples {
            buf.extend_from_slice(&sample.to_le_bytes());
        }
        buf
    }

    /// Gesamtgroesse des Frames in Bytes
    pub fn groesse(&self) -> usize {
        FrameHeader::SIZE + self.nutzdaten.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn test_header(zeitstempel: u32) -> FrameHeader {
        FrameHeader::new(zeitstempel, 16_000, 1024)
    }

    #[test]
    fn header_encode_decode_round_trip() {
        let header = test_header(42);
        let encoded = header.encode();
        assert_eq!(encoded.len(), FrameHeader::SIZE);
        let decoded = FrameHeader::decode(&encoded).expect("Decode muss erfolgreich sein");
        assert_eq!(header, decoded);
    }

    #[test]
    fn header_little_endian_byte_reihenfolge() {
        let header = FrameHeader::new(0x0102_0304, 25_600, 128);
        let bytes = header.encode();
        // Typ-Tag bei Offset 0
        assert_eq!(bytes[0], NACHRICHTENTYP_AUDIO);
        // Zeitstempel bei Offset 1-4, little-endian
        assert_eq!(bytes[1], 0x04);
        assert_eq!(bytes[4], 0x01);
        // Abtastrate/100 = 256 bei Offset 5-6, little-endian
        assert_eq!(bytes[5], 0x00);
        assert_eq!(bytes[6], 0x01);
        // Chunk/64 = 2 bei Offset 7
        assert_eq!(bytes[7], 2);
    }

    #[test]
    fn header_decode_zu_kurz() {
        let bytes = [0u8; 4];
        let result = FrameHeader::decode(&bytes);
        assert_eq!(result, Err(FrameFehler::FrameZuKurz { laenge: 4 }));
    }

    #[test]
    fn header_decode_unbekannter_typ() {
        let mut bytes = test_header(0).encode();
        bytes[0] = 0x7F;
        let result = FrameHeader::decode(&bytes);
        assert_eq!(result, Err(FrameFehler::UnbekannterNachrichtenTyp(0x7F)));
    }

    #[test]
    fn frame_encode_decode_round_trip() {
        let samples: Vec<i16> = vec![0, 100, -100, i16::MAX, i16::MIN];
        let encoded = AudioFrame::encode(test_header(7), &samples);
        let frame =
            AudioFrame::decode(&Bytes::from(encoded)).expect("Decode muss erfolgreich sein");

        assert_eq!(frame.header.zeitstempel, 7);
        assert_eq!(frame.header.abtastrate, 16_000);
        assert_eq!(frame.sample_puffer().als_slice(), samples.as_slice());
    }

    #[test]
    fn frame_leere_nutzdaten_ok() {
        let encoded = AudioFrame::encode(test_header(0), &[]);
        let frame = AudioFrame::decode(&Bytes::from(encoded)).unwrap();
        assert!(frame.sample_puffer().is_empty());
        assert_eq!(frame.groesse(), FrameHeader::SIZE);
    }

    #[test]
    fn ungerades_letztes_byte_wird_verworfen() {
        let mut encoded = AudioFrame::encode(test_header(1), &[1000, -1000]);
        encoded.push(0xAB); // haengendes halbes Sample
        let frame = AudioFrame::decode(&Bytes::from(encoded)).unwrap();

        let puffer = frame.sample_puffer();
        assert_eq!(puffer.len(), 2, "Halbes Sample darf nicht mitzaehlen");
        assert_eq!(puffer.als_slice(), &[1000, -1000]);
    }

    #[test]
    fn nutzdaten_sind_slice_auf_empfangspuffer() {
        let encoded = Bytes::from(AudioFrame::encode(test_header(3), &[42; 16]));
        let frame = AudioFrame::decode(&encoded).unwrap();
        // Bytes::slice teilt die Allokation – gleicher Backing-Speicher
        assert_eq!(
            frame.nutzdaten.as_ptr(),
            encoded[FrameHeader::SIZE..].as_ptr()
        );
    }

    #[test]
    fn zeitstempel_wrap_bei_32_bit() {
        let header = FrameHeader::new(u32::MAX, 16_000, 1024);
        let decoded = FrameHeader::decode(&header.encode()).unwrap();
        assert_eq!(decoded.zeitstempel, u32::MAX);
    }
}
