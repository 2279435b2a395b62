//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Server ohne Konfigurationsdatei
//! lauffaehig ist.

use pegelwarte_dsp::config::AnalyzerConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct ServerConfig {
    /// Allgemeine Server-Einstellungen
    pub server: ServerEinstellungen,
    /// Netzwerk-Einstellungen
    pub netzwerk: NetzwerkEinstellungen,
    /// Gateway-Einstellungen (Sessions, Queues, Liveness)
    pub gateway: GatewayEinstellungen,
    /// Signal-Analyse-Einstellungen
    pub analyse: AnalyzerConfig,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
}

/// Allgemeine Server-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerEinstellungen {
    /// Anzeigename des Servers
    pub name: String,
}

impl Default for ServerEinstellungen {
    fn default() -> Self {
        Self {
            name: "Pegelwarte Gateway".into(),
        }
    }
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    /// Bind-Adresse fuer den HTTP/WebSocket-Listener
    pub bind_adresse: String,
    /// Port fuer Produzenten-, Dashboard- und Health-Endpunkte
    pub port: u16,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            port: 8000,
        }
    }
}

/// Gateway-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayEinstellungen {
    /// Handshake-Zeitlimit fuer neue Produzenten in Millisekunden
    pub handshake_zeitlimit_ms: u64,
    /// So viele fehlerhafte Frames in Folge schliessen die Session
    pub frame_fehler_schwelle: u32,
    /// Ping-Intervall fuer Dashboards in Sekunden
    pub ping_intervall_s: u64,
    /// Vielfaches des Ping-Intervalls ohne Lebenszeichen bis zum Rauswurf
    pub ping_karenz_faktor: u32,
    /// Mindestabstand zwischen Broadcasts in Millisekunden (0 = jedes Frame)
    pub min_sende_intervall_ms: u64,
    /// Anzahl juengster Messwerte fuer neue Dashboards
    pub initial_daten_anzahl: usize,
    /// Groesse der Send-Queue pro Dashboard (Nachrichten)
    pub send_queue_groesse: usize,
}

impl Default for GatewayEinstellungen {
    fn default() -> Self {
        Self {
            handshake_zeitlimit_ms: 10_000,
            frame_fehler_schwelle: 32,
            ping_intervall_s: 15,
            ping_karenz_faktor: 3,
            min_sende_intervall_ms: 0,
            initial_daten_anzahl: 10,
            send_queue_groesse: 64,
        }
    }
}

impl GatewayEinstellungen {
    /// Uebersetzt die TOML-Einstellungen in die Gateway-Konfiguration
    pub fn als_gateway_config(&self) -> pegelwarte_gateway::GatewayConfig {
        pegelwarte_gateway::GatewayConfig {
            handshake_zeitlimit: Duration::from_millis(self.handshake_zeitlimit_ms),
            frame_fehler_schwelle: self.frame_fehler_schwelle,
            ping_intervall: Duration::from_secs(self.ping_intervall_s),
            ping_karenz_faktor: self.ping_karenz_faktor,
            min_sende_intervall: Duration::from_millis(self.min_sende_intervall_ms),
            initial_daten_anzahl: self.initial_daten_anzahl,
            send_queue_groesse: self.send_queue_groesse,
        }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let config: Self = toml::from_str(&inhalt)
                    .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    /// Gibt die vollstaendige Bind-Adresse zurueck
    pub fn bind_adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.port)
    }
}
