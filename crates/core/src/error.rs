//! Fehlertypen fuer Pegelwarte
//!
//! Zentraler Fehler-Enum der alle moeglichen Fehlerzustaende abdeckt.
//! Untermodule koennen eigene Fehler definieren und via `#[from]` konvertieren.

use thiserror::Error;

/// Globaler Result-Alias fuer Pegelwarte
pub type Result<T> = std::result::Result<T, PegelwarteError>;

/// Alle moeglichen Fehler im Pegelwarte-System
#[derive(Debug, Error)]
pub enum PegelwarteError {
    // --- Verbindung & Netzwerk ---
    #[error("Verbindung fehlgeschlagen: {0}")]
    Verbindung(String),

    #[error("Verbindung getrennt: {0}")]
    Getrennt(String),

    #[error("Handshake-Zeitlimit ueberschritten nach {0} ms")]
    HandshakeZeitlimit(u64),

    // --- Produzenten-Session ---
    /// Ein neuer Produzent hat den alten abgeloest. Fuer den neuen
    /// Produzenten kein Fehler, nur ein Grund die alte Session zu beenden.
    #[error("Produzent abgeloest durch neue Verbindung")]
    ProduzentAbgeloest,

    #[error("Zu viele fehlerhafte Frames in Folge ({0}), Session wird geschlossen")]
    FrameFehlerSchwelle(u32),

    // --- Konsumenten ---
    /// Sendefehler an einen Konsumenten. Fuehrt nur zu dessen Entfernung,
    /// niemals zum Abbruch des Broadcasts.
    #[error("Sendefehler an Konsument: {0}")]
    KonsumentSendefehler(String),

    // --- Protokoll ---
    #[error("Ungueltige Nachricht: {0}")]
    UngueltigeNachricht(String),

    // --- Konfiguration ---
    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),

    // --- Intern ---
    #[error("Interner Fehler: {0}")]
    Intern(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl PegelwarteError {
    /// Erstellt einen internen Fehler aus einer beliebigen Nachricht
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }

    /// Gibt true zurueck wenn der Fehler nur die eine betroffene
    /// Verbindung schliesst und das Gateway weiterlaufen laesst
    pub fn ist_lokal(&self) -> bool {
        matches!(
            self,
            Self::Getrennt(_)
                | Self::HandshakeZeitlimit(_)
                | Self::ProduzentAbgeloest
                | Self::FrameFehlerSchwelle(_)
                | Self::KonsumentSendefehler(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fehler_anzeige() {
        let e = PegelwarteError::HandshakeZeitlimit(10_000);
        assert_eq!(
            e.to_string(),
            "Handshake-Zeitlimit ueberschritten nach 10000 ms"
        );
    }

    #[test]
    fn lokale_fehler_erkennung() {
        assert!(PegelwarteError::ProduzentAbgeloest.ist_lokal());
        assert!(PegelwarteError::KonsumentSendefehler("test".into()).ist_lokal());
        assert!(!PegelwarteError::Konfiguration("test".into()).ist_lokal());
    }

    #[test]
    fn schwellen_fehler_enthaelt_anzahl() {
        let e = PegelwarteError::FrameFehlerSchwelle(32);
        assert!(e.to_string().contains("32"));
    }
}
