//! Gateway-Telemetrie – Zaehler und periodische Zusammenfassungen
//!
//! Akkumuliert Frame- und Zustell-Zaehler und erstellt in festen
//! Intervallen einen Snapshot, der geloggt und ueber ein
//! Broadcast-Interface fuer Observability-Systeme exportiert wird.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Intervall fuer periodische Telemetrie-Snapshots
pub const TELEMETRIE_INTERVALL: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Periodischer Telemetrie-Snapshot des Gateways
#[derive(Debug, Clone)]
pub struct GatewaySnapshot {
    /// Erfassungszeitraum
    pub zeitraum: Duration,
    /// Verarbeitete Frames im Zeitraum
    pub frames_verarbeitet: u64,
    /// Fehlerhafte (verworfene) Frames im Zeitraum
    pub frames_fehlerhaft: u64,
    /// Ausgefuehrte Broadcasts im Zeitraum
    pub broadcasts: u64,
    /// Erfolgreich eingereihte Nachrichten im Zeitraum
    pub nachrichten_zugestellt: u64,
    /// Wegen voller Queues verworfene Nachrichten im Zeitraum
    pub nachrichten_verworfen: u64,
    /// Aktive Konsumenten zum Snapshot-Zeitpunkt
    pub konsumenten_aktiv: usize,
}

impl GatewaySnapshot {
    /// Gibt eine lesbare Zusammenfassung zurueck
    pub fn zusammenfassung(&self) -> String {
        format!(
            "Frames={} (fehlerhaft={}) Broadcasts={} Zugestellt={} Verworfen={} Konsumenten={}",
            self.frames_verarbeitet,
            self.frames_fehlerhaft,
            self.broadcasts,
            self.nachrichten_zugestellt,
            self.nachrichten_verworfen,
            self.konsumenten_aktiv,
        )
    }
}

// ---------------------------------------------------------------------------
// GatewayTelemetrie
// ---------------------------------------------------------------------------

/// Zaehlwerk des Gateways
///
/// Thread-safe via Atomics + Arc. Der Export-Task laeuft separat via
/// `starten()`.
#[derive(Clone)]
pub struct GatewayTelemetrie {
    inner: Arc<TelemetrieInner>,
}

struct TelemetrieInner {
    frames_verarbeitet: AtomicU64,
    frames_fehlerhaft: AtomicU64,
    /// Frames seit Prozessstart, wird nie resettet (Health-Endpunkt)
    frames_gesamt: AtomicU64,
    broadcasts: AtomicU64,
    nachrichten_zugestellt: AtomicU64,
    nachrichten_verworfen: AtomicU64,
    zeitraum_start: Mutex<Instant>,
    /// Kanal fuer Snapshot-Export
    export_tx: tokio::sync::broadcast::Sender<GatewaySnapshot>,
}

impl GatewayTelemetrie {
    /// Erstellt ein neues Telemetrie-System
    ///
    /// Gibt auch den Broadcast-Receiver zurueck, ueber den Snapshots
    /// empfangen werden.
    pub fn neu() -> (Self, tokio::sync::broadcast::Receiver<GatewaySnapshot>) {
        let (tx, rx) = tokio::sync::broadcast::channel(16);
        let telemetrie = Self {
            inner: Arc::new(TelemetrieInner {
                frames_verarbeitet: AtomicU64::new(0),
                frames_fehlerhaft: AtomicU64::new(0),
                frames_gesamt: AtomicU64::new(0),
                broadcasts: AtomicU64::new(0),
                nachrichten_zugestellt: AtomicU64::new(0),
                nachrichten_verworfen: AtomicU64::new(0),
                zeitraum_start: Mutex::new(Instant::now()),
                export_tx: tx,
            }),
        };
        (telemetrie, rx)
    }

    /// Meldet ein erfolgreich verarbeitetes Frame
    pub fn frame_verarbeitet(&self) {
        self.inner.frames_verarbeitet.fetch_add(1, Ordering::Relaxed);
        self.inner.frames_gesamt.fetch_add(1, Ordering::Relaxed);
    }

    /// Meldet ein fehlerhaftes (verworfenes) Frame
    pub fn frame_fehlerhaft(&self) {
        self.inner.frames_fehlerhaft.fetch_add(1, Ordering::Relaxed);
        self.inner.frames_gesamt.fetch_add(1, Ordering::Relaxed);
    }

    /// Meldet einen Broadcast mit Zustell- und Verwurf-Zahlen
    pub fn broadcast_gemeldet(&self, zugestellt: usize, verworfen: usize) {
        self.inner.broadcasts.fetch_add(1, Ordering::Relaxed);
        self.inner
            .nachrichten_zugestellt
            .fetch_add(zugestellt as u64, Ordering::Relaxed);
        self.inner
            .nachrichten_verworfen
            .fetch_add(verworfen as u64, Ordering::Relaxed);
    }

    /// Gesamtzahl verarbeiteter Frames seit Start (nicht zeitraumgebunden)
    ///
    /// Wird vom Health-Endpunkt gelesen; der periodische Snapshot resettet
    /// diesen Zaehler nicht.
    pub fn frames_gesamt(&self) -> u64 {
        self.inner.frames_gesamt.load(Ordering::Relaxed)
    }

    /// Erstellt sofort einen Snapshot, sendet ihn und resettet die Zaehler
    pub fn snapshot_erstellen(&self, konsumenten_aktiv: usize) -> GatewaySnapshot {
        let zeitraum = {
            let mut start = self.inner.zeitraum_start.lock();
            let vergangen = start.elapsed();
            *start = Instant::now();
            vergangen
        };

        let snapshot = GatewaySnapshot {
            zeitraum,
            frames_verarbeitet: self.inner.frames_verarbeitet.swap(0, Ordering::Relaxed),
            frames_fehlerhaft: self.inner.frames_fehlerhaft.swap(0, Ordering::Relaxed),
            broadcasts: self.inner.broadcasts.swap(0, Ordering::Relaxed),
            nachrichten_zugestellt: self.inner.nachrichten_zugestellt.swap(0, Ordering::Relaxed),
            nachrichten_verworfen: self.inner.nachrichten_verworfen.swap(0, Ordering::Relaxed),
            konsumenten_aktiv,
        };

        // An Subscriber senden (Fehler ignorieren wenn keine Subscriber)
        let _ = self.inner.export_tx.send(snapshot.clone());
        snapshot
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
