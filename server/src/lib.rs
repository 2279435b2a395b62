//! pegelwarte-server – Bibliotheks-Root
//!
//! Deklariert die Server-Module und stellt den oeffentlichen
//! Einstiegspunkt fuer Integrationstests bereit.

pub mod config;
pub mod ws;

use anyhow::Result;
use config::ServerConfig;
use pegelwarte_dsp::config::KonfigHandle;
use pegelwarte_gateway::TelemetrieGateway;

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Startet das Gateway und laeuft bis zum Shutdown-Signal
    ///
    /// Reihenfolge:
    /// 1. Gateway mit Registry und Analyzer-Konfiguration bauen
    /// 2. Wartungs-Task starten (Liveness-Sweep, Telemetrie)
    /// 3. HTTP/WebSocket-Listener binden
    /// 4. Auf Ctrl-C warten, dann Verbindungen abraeumen
    pub async fn starten(self) -> Result<()> {
        let analyse_konfig = KonfigHandle::neu(self.config.analyse.clone());
        let gateway =
            TelemetrieGateway::neu(self.config.gateway.als_gateway_config(), analyse_konfig);

        let wartung = gateway.wartung_starten();
        let app = ws::router(gateway.clone());

        let adresse = self.config.bind_adresse();
        let listener = tokio::net::TcpListener::bind(&adresse).await?;
        tracing::info!(
            server_name = %self.config.server.name,
            adresse = %adresse,
            "Gateway lauscht"
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Shutdown-Signal empfangen, Server wird beendet");
        wartung.abort();
        gateway.herunterfahren();

        Ok(())
    }
}

/// Wartet auf Ctrl-C / SIGTERM
async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
