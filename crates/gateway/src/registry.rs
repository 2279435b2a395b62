//! Verbindungs-Registry – Mitgliederliste aller Gateway-Verbindungen
//!
//! Verwaltet die Send-Queues aller Dashboards und den einen autoritativen
//! Produzenten-Slot. Broadcast reiht nicht-blockierend in jede Queue ein;
//! ein langsames Dashboard verzoegert die anderen nie.
//!
//! ## Design-Entscheidungen
//! - DashMap fuer lock-free concurrent access auf die Konsumentenliste
//! - Tokio mpsc-Queues pro Konsument (kein direktes Socket-Schreiben hier)
//! - Produzenten-Slot als explizites Feld hinter einem Mutex; der Wechsel
//!   passiert atomar und der Lock wird nie ueber ein Await gehalten

use dashmap::DashMap;
use parking_lot::Mutex;
use pegelwarte_core::types::{KonsumentId, ProduzentId};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};

// ---------------------------------------------------------------------------
// Konfiguration
// ---------------------------------------------------------------------------

/// Standard-Groesse der Send-Queue pro Konsument (Nachrichten)
pub const SEND_QUEUE_GROESSE: usize = 64;

/// So viele volle Queues in Folge werfen einen Konsumenten raus
pub const UEBERLAUF_SCHWELLE: u32 = 32;

// ---------------------------------------------------------------------------
// KonsumentHandle
// ---------------------------------------------------------------------------

/// Zustand eines registrierten Dashboards
///
/// Gehoert exklusiv der Registry; andere Komponenten halten nur die
/// `KonsumentId`.
struct KonsumentHandle {
    /// Send-Queue: fertig serialisierte Nachrichten, geteilt via Arc
    tx: mpsc::Sender<Arc<str>>,
    /// Volle Queues in Folge (Reset bei jeder Zustellung)
    ueberlauf_in_folge: AtomicU32,
    /// Zeitpunkt des letzten Lebenszeichens (Pong oder Nachricht)
    letzte_aktivitaet: Mutex<Instant>,
}

// ---------------------------------------------------------------------------
// ProduzentHandle
// ---------------------------------------------------------------------------

/// Handle auf die eine autoritative Produzenten-Session
pub struct ProduzentHandle {
    /// Session-ID
    pub id: ProduzentId,
    /// Beendet die Session-Task beim Abloesen
    beenden_tx: oneshot::Sender<()>,
}

impl ProduzentHandle {
    /// Erstellt ein Handle; der Receiver gehoert der Session-Task
    pub fn neu(id: ProduzentId) -> (Self, oneshot::Receiver<()>) {
        let (beenden_tx, beenden_rx) = oneshot::channel();
        (Self { id, beenden_tx }, beenden_rx)
    }

    /// Signalisiert der Session-Task das Ende (genau einmal)
    pub fn schliessen(self) {
        // Fehler heisst: Session-Task ist bereits weg
        let _ = self.beenden_tx.send(());
    }
}

// ---------------------------------------------------------------------------
// BroadcastErgebnis
// ---------------------------------------------------------------------------

/// Ergebnis eines Broadcasts ueber alle Konsumenten
#[derive(Debug, Default, PartialEq, Eq)]
pub struct BroadcastErgebnis {
    /// Erfolgreich eingereihte Nachrichten
    pub zugestellt: usize,
    /// Wegen voller Queue verworfene Nachrichten
    pub verworfen: usize,
    /// Dabei entfernte Konsumenten (Queue geschlossen oder Ueberlauf)
    pub entfernt: usize,
}

// ---------------------------------------------------------------------------
// VerbindungsRegistry
// ---------------------------------------------------------------------------

/// Zentrale Registry aller Gateway-Verbindungen
///
/// Thread-safe und `Clone`-faehig (innerer Arc).
#[derive(Clone)]
pub struct VerbindungsRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    /// Konsumenten, indexiert nach KonsumentId
    konsumenten: DashMap<KonsumentId, KonsumentHandle>,
    /// Der eine autoritative Produzent (None = Leerlauf)
    produzent: Mutex<Option<ProduzentHandle>>,
    /// Queue-Groesse fuer neue Konsumenten
    send_queue_groesse: usize,
}

impl VerbindungsRegistry {
    /// Erstellt eine leere Registry mit der gegebenen Queue-Groesse
    pub fn neu(send_queue_groesse: usize) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                konsumenten: DashMap::new(),
                produzent: Mutex::new(None),
                send_queue_groesse,
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Konsumenten
    // -----------------------------------------------------------------------

    /// Registriert ein Dashboard und gibt seine Empfangs-Queue zurueck
    ///
    /// Die Verbindung ist ab sofort fuer Broadcasts sichtbar. Die
    /// Transport-Schicht liest aus der Queue und schreibt auf den Socket.
    pub fn registrieren(&self) -> (KonsumentId, mpsc::Receiver<Arc<str>>) {
        let id = KonsumentId::new();
        let (tx, rx) = mpsc::channel(self.inner.send_queue_groesse);
        self.inner.konsumenten.insert(
            id,
            KonsumentHandle {
                tx,
                ueberlauf_in_folge: AtomicU32::new(0),
                letzte_aktivitaet: Mutex::new(Instant::now()),
            },
        );
        tracing::info!(konsument = %id, gesamt = self.konsument_anzahl(), "Dashboard registriert");
        (id, rx)
    }

    /// Entfernt ein Dashboard
    ///
    /// Sicher parallel zu laufenden Broadcasts: bereits eingereihte
    /// Nachrichten werden noch zugestellt oder verfallen mit der Queue.
    pub fn entfernen(&self, id: &KonsumentId) -> bool {
        let entfernt = self.inner.konsumenten.remove(id).is_some();
        if entfernt {
            tracing::info!(konsument = %id, gesamt = self.konsument_anzahl(), "Dashboard entfernt");
        }
        entfernt
    }

    /// Sendet eine Nachricht an genau einen Konsumenten (z.B. Initial-Daten)
    pub fn an_konsument_senden(&self, id: &KonsumentId, nachricht: Arc<str>) -> bool {
        match self.inner.konsumenten.get(id) {
            Some(handle) => handle.tx.try_send(nachricht).is_ok(),
            None => false,
        }
    }

    /// Verteilt eine fertig serialisierte Nachricht an alle Konsumenten
    ///
    /// Nicht-blockierend: volle Queues verwerfen die Nachricht, zu oft
    /// volle Queues werfen den Konsumenten raus, geschlossene Queues
    /// raeumen ihn sofort ab. Kein Fall bricht den Broadcast fuer die
    /// uebrigen Konsumenten ab.
    pub fn broadcast(&self, nachricht: Arc<str>) -> BroadcastErgebnis {
        let mut ergebnis = BroadcastErgebnis::default();
        let mut zu_entfernen: Vec<KonsumentId> = Vec::new();

        self.inner.konsumenten.iter().for_each(|entry| {
            match entry.tx.try_send(Arc::clone(&nachricht)) {
                Ok(()) => {
                    entry.ueberlauf_in_folge.store(0, Ordering::Relaxed);
                    ergebnis.zugestellt += 1;
                }
                Err(mpsc::error::TrySendError::Full(_)) => {
                    ergebnis.verworfen += 1;
                    let in_folge = entry.ueberlauf_in_folge.fetch_add(1, Ordering::Relaxed) + 1;
                    if in_folge >= UEBERLAUF_SCHWELLE {
                        tracing::warn!(
                            konsument = %entry.key(),
                            in_folge,
                            "Send-Queue dauerhaft voll – Konsument wird entfernt"
                        );
                        zu_entfernen.push(*entry.key());
                    } else {
                        tracing::debug!(konsument = %entry.key(), "Send-Queue voll – Nachricht verworfen");
                    }
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    tracing::debug!(konsument = %entry.key(), "Send-Queue geschlossen (Dashboard getrennt)");
                    zu_entfernen.push(*entry.key());
                }
            }
        });

        // Entfernen erst nach der Iteration (DashMap-Shard-Locks)
        for id in &zu_entfernen {
            self.entfernen(id);
        }
        ergebnis.entfernt = zu_entfernen.len();
        ergebnis
    }

    /// Meldet ein Lebenszeichen eines Konsumenten (Pong oder Nachricht)
    pub fn aktivitaet_melden(&self, id: &KonsumentId) {
        if let Some(handle) = self.inner.konsumenten.get(id) {
            *handle.letzte_aktivitaet.lock() = Instant::now();
        }
    }

    /// Entfernt Konsumenten ohne Lebenszeichen seit `timeout`
    ///
    /// Gibt die Liste der entfernten IDs zurueck.
    pub fn inaktive_bereinigen(&self, timeout: Duration) -> Vec<KonsumentId> {
        let inaktive: Vec<KonsumentId> = self
            .inner
            .konsumenten
            .iter()
            .filter(|entry| entry.letzte_aktivitaet.lock().elapsed() > timeout)
            .map(|entry| *entry.key())
            .collect();

        for id in &inaktive {
            self.entfernen(id);
            tracing::warn!(konsument = %id, "Inaktives Dashboard entfernt (Timeout)");
        }
        inaktive
    }

    /// Gibt die Anzahl der registrierten Konsumenten zurueck
    pub fn konsument_anzahl(&self) -> usize {
        self.inner.konsumenten.len()
    }

    /// Prueft ob ein Konsument registriert ist
    pub fn ist_registriert(&self, id: &KonsumentId) -> bool {
        self.inner.konsumenten.contains_key(id)
    }

    // -----------------------------------------------------------------------
    // Produzent
    // -----------------------------------------------------------------------

    /// Setzt den autoritativen Produzenten und gibt den abgeloesten zurueck
    ///
    /// Der Tausch ist atomar unter dem Slot-Lock; der Aufrufer schliesst
    /// das zurueckgegebene Handle (genau einmal), damit kein Frame der
    /// alten Session die neue ueberholt.
    pub fn produzent_setzen(&self, handle: ProduzentHandle) -> Option<ProduzentHandle> {
        let mut slot = self.inner.produzent.lock();
        let vorher = slot.replace(handle);
        if let Some(alt) = &vorher {
            tracing::info!(alt = %alt.id, "Produzent wird abgeloest");
        }
        vorher
    }

    /// Leert den Produzenten-Slot, aber nur wenn er noch `id` gehoert
    ///
    /// Eine abgeloeste Session darf beim Aufraeumen nicht den Slot der
    /// Nachfolger-Session leeren.
    pub fn produzent_leeren(&self, id: &ProduzentId) -> bool {
        let mut slot = self.inner.produzent.lock();
        if slot.as_ref().map(|h| h.id) == Some(*id) {
            *slot = None;
            tracing::info!(produzent = %id, "Produzenten-Slot geleert");
            true
        } else {
            false
        }
    }

    /// Gibt die ID des aktiven Produzenten zurueck
    pub fn produzent_id(&self) -> Option<ProduzentId> {
        self.inner.produzent.lock().as_ref().map(|h| h.id)
    }

    /// Schliesst den aktiven Produzenten und leert den Slot (Shutdown)
    pub fn produzent_schliessen(&self) {
        if let Some(handle) = self.inner.produzent.lock().take() {
            handle.schliessen();
        }
    }

    /// Entfernt alle Konsumenten und schliesst den Produzenten (Shutdown)
    pub fn alle_entfernen(&self) {
        self.produzent_schliessen();
        self.inner.konsumenten.clear();
    }
}

impl Default for VerbindungsRegistry {
    fn default() -> Self {
        Self::neu(SEND_QUEUE_GROESSE)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
