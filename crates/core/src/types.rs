//! Gemeinsame Identifikationstypen fuer Pegelwarte
//!
//! Alle IDs verwenden das Newtype-Pattern um Verwechslungen zwischen
//! verschiedenen ID-Arten zur Compilezeit auszuschliessen.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Eindeutige ID einer Konsumenten-Verbindung (Dashboard)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KonsumentId(pub Uuid);

impl KonsumentId {
    /// Erstellt eine neue zufaellige KonsumentId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for KonsumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for KonsumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "konsument:{}", self.0)
    }
}

/// Eindeutige ID einer Produzenten-Session (Sensor-Verbindung)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProduzentId(pub Uuid);

impl ProduzentId {
    /// Erstellt eine neue zufaellige ProduzentId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }
}

impl Default for ProduzentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ProduzentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "produzent:{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn konsument_id_eindeutig() {
        let a = KonsumentId::new();
        let b = KonsumentId::new();
        assert_ne!(a, b, "Zwei neue KonsumentIds muessen verschieden sein");
    }

    #[test]
    fn produzent_id_eindeutig() {
        let a = ProduzentId::new();
        let b = ProduzentId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn produzent_id_display() {
        let id = ProduzentId(Uuid::nil());
        assert!(id.to_string().starts_with("produzent:"));
    }

    #[test]
    fn ids_sind_serde_kompatibel() {
        let kid = KonsumentId::new();
        let json = serde_json::to_string(&kid).unwrap();
        let kid2: KonsumentId = serde_json::from_str(&json).unwrap();
        assert_eq!(kid, kid2);
    }

}
