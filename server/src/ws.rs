//! WebSocket-Transport – duenne Schicht zwischen Axum und dem Gateway
//!
//! Das Gateway selbst kennt keine Sockets; hier werden die beiden
//! Endpunkt-Rollen verdrahtet:
//! - `/ws` – genau ein autoritativer Produzent (Sensor-Geraet)
//! - `/ws-dashboard` – beliebig viele Konsumenten (Dashboards)
//! - `/health` – Statusauskunft
//!
//! Pro Verbindung laeuft eine Task; Sendefehler oder Stille schliessen
//! nur die betroffene Verbindung.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
    routing::get,
    Json, Router,
};
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use pegelwarte_gateway::{ProduzentEingang, ProduzentVerbindung, TelemetrieGateway};

/// Queue-Groesse zwischen Socket-Task und Produzenten-Session
const PRODUZENT_EINGANG_GROESSE: usize = 64;

/// Baut den Axum-Router mit allen Gateway-Endpunkten
pub fn router(gateway: TelemetrieGateway) -> Router {
    Router::new()
        .route("/ws", get(produzent_upgrade))
        .route("/ws-dashboard", get(dashboard_upgrade))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(gateway)
}

// ---------------------------------------------------------------------------
// Produzent
// ---------------------------------------------------------------------------

async fn produzent_upgrade(
    ws: WebSocketUpgrade,
    State(gateway): State<TelemetrieGateway>,
) -> Response {
    ws.on_upgrade(move |socket| produzent_socket(socket, gateway))
}

/// Pumpt einen Produzenten-Socket in die Gateway-Session
async fn produzent_socket(socket: WebSocket, gateway: TelemetrieGateway) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let (eingang_tx, eingang_rx) = mpsc::channel(PRODUZENT_EINGANG_GROESSE);
    let (ausgang_tx, mut ausgang_rx) = mpsc::channel(8);
    let id = gateway.produzent_annehmen(ProduzentVerbindung {
        eingang: eingang_rx,
        ausgang: ausgang_tx,
        quelle: "produzent".into(),
    });

    // Sende-Task: Steuerkanal-Antworten (Begruessung)
    let sende_task = tokio::spawn(async move {
        while let Some(text) = ausgang_rx.recv().await {
            if ws_tx.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    while let Some(nachricht) = ws_rx.next().await {
        let eingang = match nachricht {
            Ok(Message::Binary(daten)) => ProduzentEingang::Binaer(Bytes::from(daten)),
            Ok(Message::Text(text)) => ProduzentEingang::Text(text),
            Ok(Message::Close(_)) | Err(_) => break,
            // Ping/Pong beantwortet Axum selbst
            Ok(_) => continue,
        };

        // Send schlaegt fehl wenn die Session beendet wurde (z.B. abgeloest)
        if eingang_tx.send(eingang).await.is_err() {
            break;
        }
    }

    // Kanal schliessen beendet die Session (falls sie noch lebt)
    drop(eingang_tx);
    sende_task.abort();
    tracing::info!(produzent = %id, "Produzenten-Socket geschlossen");
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

async fn dashboard_upgrade(
    ws: WebSocketUpgrade,
    State(gateway): State<TelemetrieGateway>,
) -> Response {
    ws.on_upgrade(move |socket| dashboard_socket(socket, gateway))
}

/// Pumpt die Broadcast-Queue eines Dashboards auf seinen Socket
async fn dashboard_socket(socket: WebSocket, gateway: TelemetrieGateway) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let (id, mut queue) = gateway.konsument_annehmen();

    let mut ping = tokio::time::interval(gateway.konfig().ping_intervall);
    ping.tick().await; // erster Tick feuert sofort

    loop {
        tokio::select! {
            nachricht = queue.recv() => match nachricht {
                Some(text) => {
                    if ws_tx.send(Message::Text(text.to_string())).await.is_err() {
                        // Sendefehler trifft nur dieses Dashboard
                        break;
                    }
                }
                // Registry hat uns entfernt (Ueberlauf oder Liveness-Sweep)
                None => break,
            },

            _ = ping.tick() => {
                if ws_tx.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }

            eingehend = ws_rx.next() => match eingehend {
                Some(Ok(Message::Pong(_))) | Some(Ok(Message::Text(_))) => {
                    gateway.konsument_aktiv(&id);
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            }
        }
    }

    gateway.konsument_trennen(&id);
    tracing::info!(konsument = %id, "Dashboard-Socket geschlossen");
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

/// Statusauskunft fuer Monitoring und Dashboards
async fn health(State(gateway): State<TelemetrieGateway>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "active_connections": gateway.registry().konsument_anzahl(),
        "producer_connected": gateway.registry().produzent_id().is_some(),
        "frames_total": gateway.telemetrie().frames_gesamt(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pegelwarte_dsp::config::KonfigHandle;
    use pegelwarte_gateway::GatewayConfig;

    #[tokio::test]
    async fn router_laesst_sich_bauen() {
        let gateway = TelemetrieGateway::neu(GatewayConfig::default(), KonfigHandle::default());
        let _router = router(gateway);
    }
}
