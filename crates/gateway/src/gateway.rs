//! Telemetrie-Gateway – Orchestrierung von Dekodierung, Analyse und Broadcast
//!
//! Verdrahtet die Bausteine: pro eingehendem Produzenten-Frame
//! dekodieren, analysieren und den Messwert-Satz an alle registrierten
//! Dashboards verteilen. Die Transport-Schicht (WebSocket o.ae.) liefert
//! Verbindungen ueber `produzent_annehmen`/`konsument_annehmen` an und
//! bleibt ausserhalb dieses Crates.
//!
//! ## Produzenten-Session
//!
//! ```text
//! Leerlauf -> Handshake -> Streaming -> Geschlossen
//! ```
//! - Handshake: wartet begrenzt auf das erste gueltige Frame oder eine
//!   Identifikation; Zeitueberschreitung schliesst die Verbindung
//! - Streaming: jedes gueltige Frame wird dekodiert, analysiert und
//!   verteilt; fehlerhafte Frames werden gezaehlt und uebersprungen,
//!   zu viele in Folge schliessen die Session
//! - Geschlossen: Slot geleert, das Gateway nimmt den naechsten
//!   Produzenten an

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use pegelwarte_core::error::PegelwarteError;
use pegelwarte_core::types::{KonsumentId, ProduzentId};
use pegelwarte_dsp::analyzer::{Messwerte, SignalAnalyzer};
use pegelwarte_dsp::config::KonfigHandle;
use pegelwarte_protocol::control::{Begruessung, SteuerNachricht};
use pegelwarte_protocol::frame::AudioFrame;
use pegelwarte_protocol::metrics::{InitialDaten, MesswertNachricht};

use crate::registry::{ProduzentHandle, VerbindungsRegistry};
use crate::telemetry::GatewayTelemetrie;

// ---------------------------------------------------------------------------
// Konfiguration
// ---------------------------------------------------------------------------

/// Konfiguration des Telemetrie-Gateways
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Zeitlimit fuer den Handshake einer neuen Produzenten-Verbindung
    pub handshake_zeitlimit: Duration,
    /// So viele fehlerhafte Frames in Folge schliessen die Session
    pub frame_fehler_schwelle: u32,
    /// Ping-Intervall fuer Konsumenten-Verbindungen
    pub ping_intervall: Duration,
    /// Vielfaches des Ping-Intervalls ohne Lebenszeichen bis zum Rauswurf
    pub ping_karenz_faktor: u32,
    /// Mindestabstand zwischen Broadcasts (0 = jedes Frame)
    pub min_sende_intervall: Duration,
    /// Anzahl juengster Messwerte fuer neue Dashboards
    pub initial_daten_anzahl: usize,
    /// Groesse der Send-Queue pro Konsument
    pub send_queue_groesse: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            handshake_zeitlimit: Duration::from_secs(10),
            frame_fehler_schwelle: 32,
            ping_intervall: Duration::from_secs(15),
            ping_karenz_faktor: 3,
            min_sende_intervall: Duration::ZERO,
            initial_daten_anzahl: 10,
            send_queue_groesse: crate::registry::SEND_QUEUE_GROESSE,
        }
    }
}

// ---------------------------------------------------------------------------
// Produzenten-Verbindung
// ---------------------------------------------------------------------------

/// Eingehende Nachricht einer Produzenten-Verbindung
#[derive(Debug)]
pub enum ProduzentEingang {
    /// Binaeres Sensor-Frame
    Binaer(Bytes),
    /// Textnachricht auf dem Steuerkanal (Identifikation, Konfig)
    Text(String),
}

/// Kanalpaar einer angenommenen Produzenten-Verbindung
///
/// Die Transport-Schicht fuettert `eingang` und leert `ausgang`; das
/// Gateway sieht nie den Socket selbst.
pub struct ProduzentVerbindung {
    /// Nachrichten vom Geraet
    pub eingang: mpsc::Receiver<ProduzentEingang>,
    /// Textnachrichten an das Geraet (Begruessung)
    pub ausgang: mpsc::Sender<String>,
    /// Herkunfts-Kennung fuer Logs und Messwert-Nachrichten
    pub quelle: String,
}

/// Zustand einer Produzenten-Session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProduzentZustand {
    Handshake,
    Streaming,
}

// ---------------------------------------------------------------------------
// TelemetrieGateway
// ---------------------------------------------------------------------------

/// Zentrales Telemetrie-Gateway
///
/// Thread-safe und `Clone`-faehig (innerer Arc). Die Transport-Schicht
/// haelt einen Clone pro Endpunkt.
#[derive(Clone)]
pub struct TelemetrieGateway {
    inner: Arc<GatewayInner>,
}

struct GatewayInner {
    konfig: GatewayConfig,
    registry: VerbindungsRegistry,
    analyse_konfig: KonfigHandle,
    telemetrie: GatewayTelemetrie,
    /// Ring der juengsten Broadcasts fuer die Initial-Daten neuer Dashboards
    letzte_messwerte: Mutex<VecDeque<MesswertNachricht>>,
    /// Zeitpunkt des letzten Broadcasts (Drosselung)
    letzter_broadcast: Mutex<Option<Instant>>,
}

impl TelemetrieGateway {
    /// Erstellt ein Gateway mit eigener Registry und Telemetrie
    pub fn neu(konfig: GatewayConfig, analyse_konfig: KonfigHandle) -> Self {
        let (telemetrie, _rx) = GatewayTelemetrie::neu();
        let registry = VerbindungsRegistry::neu(konfig.send_queue_groesse);
        Self {
            inner: Arc::new(GatewayInner {
                konfig,
                registry,
                analyse_konfig,
                telemetrie,
                letzte_messwerte: Mutex::new(VecDeque::new()),
                letzter_broadcast: Mutex::new(None),
            }),
        }
    }

    /// Gibt die Registry zurueck (Transport-Schicht, Tests)
    pub fn registry(&self) -> &VerbindungsRegistry {
        &self.inner.registry
    }

    /// Gibt die Telemetrie zurueck (Health-Endpunkt)
    pub fn telemetrie(&self) -> &GatewayTelemetrie {
        &self.inner.telemetrie
    }

    /// Gibt das geteilte Analyzer-Konfig-Handle zurueck
    pub fn analyse_konfig(&self) -> &KonfigHandle {
        &self.inner.analyse_konfig
    }

    /// Gibt die Gateway-Konfiguration zurueck
    pub fn konfig(&self) -> &GatewayConfig {
        &self.inner.konfig
    }

    // -----------------------------------------------------------------------
    // Konsumenten
    // -----------------------------------------------------------------------

    /// Nimmt eine Dashboard-Verbindung an
    ///
    /// Registriert sie fuer Broadcasts und reiht die juengsten Messwerte
    /// als `initial_data`-Nachricht ein, bevor Live-Updates beginnen.
    /// Die Transport-Schicht liest aus der Queue und schreibt den Socket.
    pub fn konsument_annehmen(&self) -> (KonsumentId, mpsc::Receiver<Arc<str>>) {
        let (id, rx) = self.inner.registry.registrieren();

        let letzte: Vec<MesswertNachricht> =
            self.inner.letzte_messwerte.lock().iter().cloned().collect();
        if !letzte.is_empty() {
            match serde_json::to_string(&InitialDaten::neu(letzte)) {
                Ok(json) => {
                    self.inner.registry.an_konsument_senden(&id, Arc::from(json));
                }
                Err(fehler) => {
                    tracing::error!(fehler = %fehler, "Initial-Daten nicht serialisierbar");
                }
            }
        }

        (id, rx)
    }

    /// Trennt eine Dashboard-Verbindung (expliziter Disconnect, Sendefehler)
    pub fn konsument_trennen(&self, id: &KonsumentId) {
        self.inner.registry.entfernen(id);
    }

    /// Meldet ein Lebenszeichen eines Dashboards (Pong, Nachricht)
    pub fn konsument_aktiv(&self, id: &KonsumentId) {
        self.inner.registry.aktivitaet_melden(id);
    }

    // -----------------------------------------------------------------------
    // Produzent
    // -----------------------------------------------------------------------

    /// Nimmt eine Produzenten-Verbindung an und startet ihre Session-Task
    ///
    /// Ein bereits aktiver Produzent wird atomar abgeloest und genau
    /// einmal geschlossen; seine restlichen Frames erreichen die
    /// Dashboards nicht mehr.
    pub fn produzent_annehmen(&self, verbindung: ProduzentVerbindung) -> ProduzentId {
        let id = ProduzentId::new();
        let (handle, beenden_rx) = ProduzentHandle::neu(id);

        if let Some(abgeloest) = self.inner.registry.produzent_setzen(handle) {
            abgeloest.schliessen();
        }

        // Begruessung an das Geraet einreihen
        let _ = verbindung.ausgang.try_send(Begruessung::standard().als_json());

        tracing::info!(produzent = %id, quelle = %verbindung.quelle, "Produzent verbunden");

        let gateway = self.clone();
        tokio::spawn(async move {
            gateway.produzent_session(id, verbindung, beenden_rx).await;
        });

        id
    }

    /// Session-Loop eines Produzenten (eine Task pro Verbindung)
    async fn produzent_session(
        &self,
        id: ProduzentId,
        mut verbindung: ProduzentVerbindung,
        mut beenden_rx: tokio::sync::oneshot::Receiver<()>,
    ) {
        let konfig = &self.inner.konfig;
        // Rauschboden-Zustand ist pro Session frisch
        let mut analyzer = SignalAnalyzer::neu(self.inner.analyse_konfig.clone());
        let mut zustand = ProduzentZustand::Handshake;
        let mut quelle = verbindung.quelle.clone();
        let mut fehler_in_folge: u32 = 0;

        let handshake_frist = tokio::time::sleep(konfig.handshake_zeitlimit);
        tokio::pin!(handshake_frist);

        let ende = loop {
            tokio::select! {
                // Abloesung und Zeitlimit gewinnen gegen bereits
                // eingereihte Frames: kein Nachzuegler ueberholt den
                // neuen Produzenten
                biased;

                // Abloesung durch neuen Produzenten
                _ = &mut beenden_rx => {
                    break PegelwarteError::ProduzentAbgeloest;
                }

                // Handshake-Zeitlimit (nur solange kein gueltiger Verkehr kam)
                _ = &mut handshake_frist, if zustand == ProduzentZustand::Handshake => {
                    break PegelwarteError::HandshakeZeitlimit(
                        konfig.handshake_zeitlimit.as_millis() as u64,
                    );
                }

                nachricht = verbindung.eingang.recv() => {
                    match nachricht {
                        None => break PegelwarteError::Getrennt("Eingangskanal geschlossen".into()),

                        Some(ProduzentEingang::Binaer(daten)) => {
                            match AudioFrame::decode(&daten) {
                                Ok(frame) => {
                                    if zustand == ProduzentZustand::Handshake {
                                        zustand = ProduzentZustand::Streaming;
                                        tracing::info!(produzent = %id, "Streaming beginnt");
                                    }
                                    fehler_in_folge = 0;
                                    self.frame_verarbeiten(&mut analyzer, &frame, &quelle);
                                }
                                Err(fehler) => {
                                    // Lokaler Fehler: Frame verwerfen, Session laeuft weiter
                                    self.inner.telemetrie.frame_fehlerhaft();
                                    fehler_in_folge += 1;
                                    tracing::debug!(
                                        produzent = %id,
                                        fehler = %fehler,
                                        in_folge = fehler_in_folge,
                                        "Fehlerhaftes Frame verworfen"
                                    );
                                    if fehler_in_folge >= konfig.frame_fehler_schwelle {
                                        break PegelwarteError::FrameFehlerSchwelle(fehler_in_folge);
                                    }
                                }
                            }
                        }

                        Some(ProduzentEingang::Text(text)) => {
                            match SteuerNachricht::parse(&text) {
                                Ok(SteuerNachricht::Identifikation(ident)) => {
                                    if let Some(source) = ident.source {
                                        quelle = source;
                                    }
                                    if zustand == ProduzentZustand::Handshake {
                                        zustand = ProduzentZustand::Streaming;
                                        tracing::info!(
                                            produzent = %id,
                                            quelle = %quelle,
                                            "Produzent identifiziert"
                                        );
                                    }
                                }
                                Ok(SteuerNachricht::Konfig(update)) => {
                                    self.inner.analyse_konfig.update_anwenden(&update);
                                }
                                Err(fehler) => {
                                    tracing::warn!(
                                        produzent = %id,
                                        fehler = %fehler,
                                        "Ungueltige Steuernachricht ignoriert"
                                    );
                                }
                            }
                        }
                    }
                }
            }
        };

        // Aufraeumen: Slot nur leeren wenn er noch dieser Session gehoert
        // (eine abgeloeste Session darf den Slot des Nachfolgers nicht anfassen)
        let slot_geleert = self.inner.registry.produzent_leeren(&id);
        match &ende {
            PegelwarteError::Getrennt(_) | PegelwarteError::ProduzentAbgeloest => {
                tracing::info!(produzent = %id, grund = %ende, slot_geleert, "Produzenten-Session beendet");
            }
            _ => {
                tracing::warn!(produzent = %id, grund = %ende, slot_geleert, "Produzenten-Session beendet");
            }
        }
    }

    /// Dekodiertes Frame analysieren und verteilen (synchron, Hot Path)
    fn frame_verarbeiten(&self, analyzer: &mut SignalAnalyzer, frame: &AudioFrame, quelle: &str) {
        if frame.nutzdaten.len() % 2 == 1 {
            tracing::debug!(
                zeitstempel = frame.header.zeitstempel,
                "Ungerades letztes Byte im Frame verworfen"
            );
        }
        let puffer = frame.sample_puffer();
        let messwerte = analyzer.analysieren(&puffer, &frame.header);
        self.inner.telemetrie.frame_verarbeitet();

        if !self.broadcast_faellig() {
            return;
        }

        let nachricht = als_nachricht(quelle, &messwerte);
        let json = match nachricht.als_json() {
            Ok(json) => json,
            Err(fehler) => {
                tracing::error!(fehler = %fehler, "Messwert-Nachricht nicht serialisierbar");
                return;
            }
        };

        // Einmal serialisieren, als Arc an alle Queues
        let ergebnis = self.inner.registry.broadcast(Arc::from(json));
        self.inner
            .telemetrie
            .broadcast_gemeldet(ergebnis.zugestellt, ergebnis.verworfen);

        let mut ring = self.inner.letzte_messwerte.lock();
        if ring.len() >= self.inner.konfig.initial_daten_anzahl {
            ring.pop_front();
        }
        ring.push_back(nachricht);
    }

    /// Prueft die Broadcast-Drosselung und merkt sich den Zeitpunkt
    fn broadcast_faellig(&self) -> bool {
        let intervall = self.inner.konfig.min_sende_intervall;
        let mut letzter = self.inner.letzter_broadcast.lock();
        if intervall.is_zero()
            || letzter.map_or(true, |zeitpunkt| zeitpunkt.elapsed() >= intervall)
        {
            *letzter = Some(Instant::now());
            true
        } else {
            false
        }
    }

    // -----------------------------------------------------------------------
    // Wartung & Shutdown
    // -----------------------------------------------------------------------

    /// Startet die periodische Wartung: Liveness-Sweep und Telemetrie
    ///
    /// Gibt ein `JoinHandle` zurueck; der Aufrufer bricht die Task beim
    /// Shutdown ab.
    pub fn wartung_starten(&self) -> tokio::task::JoinHandle<()> {
        let gateway = self.clone();
        tokio::spawn(async move {
            let konfig = gateway.inner.konfig.clone();
            let karenz = konfig.ping_intervall * konfig.ping_karenz_faktor;
            let mut sweep = tokio::time::interval(konfig.ping_intervall);
            let mut telemetrie = tokio::time::interval(crate::telemetry::TELEMETRIE_INTERVALL);
            sweep.tick().await;
            telemetrie.tick().await;

            loop {
                tokio::select! {
                    _ = sweep.tick() => {
                        let entfernt = gateway.inner.registry.inaktive_bereinigen(karenz);
                        if !entfernt.is_empty() {
                            tracing::info!(anzahl = entfernt.len(), "Liveness-Sweep");
                        }
                    }
                    _ = telemetrie.tick() => {
                        let snapshot = gateway
                            .inner
                            .telemetrie
                            .snapshot_erstellen(gateway.inner.registry.konsument_anzahl());
                        tracing::info!("{}", snapshot.zusammenfassung());
                    }
                }
            }
        })
    }

    /// Faehrt das Gateway herunter: Produzent schliessen, Registry leeren
    pub fn herunterfahren(&self) {
        self.inner.registry.alle_entfernen();
        tracing::info!("Gateway heruntergefahren");
    }
}

/// Uebersetzt einen Messwert-Satz in die Dashboard-Nachricht
fn als_nachricht(quelle: &str, messwerte: &Messwerte) -> MesswertNachricht {
    MesswertNachricht {
        source: quelle.to_string(),
        volume: messwerte.volumen,
        peak_to_peak: messwerte.spitze_zu_spitze,
        bands: messwerte.baender,
        filtered_bands: messwerte.gefiltert.as_ref().map(|g| g.baender),
        snr: messwerte.snr_db,
        filtered_snr: messwerte.gefiltert.as_ref().map(|g| g.snr_db),
        min: messwerte.min,
        max: messwerte.max,
        avg: messwerte.mittelwert,
        timestamp: messwerte.zeitstempel,
        received_at: chrono::Utc::now(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pegelwarte_protocol::frame::FrameHeader;

    /// Gateway mit kurzen Zeitlimits fuer Tests
    fn test_gateway() -> TelemetrieGateway {
        TelemetrieGateway::neu(
            GatewayConfig {
                handshake_zeitlimit: Duration::from_secs(5),
                frame_fehler_schwelle: 5,
                ..Default::default()
            },
            KonfigHandle::default(),
        )
    }

    /// Simulierte Produzenten-Verbindung: Sender fuer den Test, Kanalpaar
    /// fuer das Gateway
    fn test_verbindung() -> (
        mpsc::Sender<ProduzentEingang>,
        mpsc::Receiver<String>,
        ProduzentVerbindung,
    ) {
        let (eingang_tx, eingang_rx) = mpsc::channel(32);
        let (ausgang_tx, ausgang_rx) = mpsc::channel(8);
        let verbindung = ProduzentVerbindung {
            eingang: eingang_rx,
            ausgang: ausgang_tx,
            quelle: "test".into(),
        };
        (eingang_tx, ausgang_rx, verbindung)
    }

    fn test_frame(zeitstempel: u32, samples: &[i16]) -> ProduzentEingang {
        ProduzentEingang::Binaer(Bytes::from(AudioFrame::encode(
            FrameHeader::new(zeitstempel, 16_000, 1024),
            samples,
        )))
    }

    async fn kurz_warten() {
        tokio::time::sleep(Duration::from_millis(30)).await;
    }

    #[tokio::test]
    async fn frame_erreicht_konsument() {
        let gateway = test_gateway();
        let (_id, mut rx) = gateway.konsument_annehmen();

        let (tx, mut ausgang, verbindung) = test_verbindung();
        gateway.produzent_annehmen(verbindung);

        // Begruessung an den Produzenten
        let begruessung = ausgang.recv().await.expect("Begruessung erwartet");
        assert!(begruessung.contains("connected"));

        tx.send(test_frame(1, &[0, 20_000])).await.unwrap();
        kurz_warten().await;

        let json = rx.try_recv().expect("Messwert-Nachricht erwartet");
        let wert: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(wert["peakToPeak"], 20_000);
        assert_eq!(wert["volume"], 100);
        assert_eq!(wert["timestamp"], 1);
        assert_eq!(wert["source"], "test");
    }

    #[tokio::test]
    async fn identifikation_setzt_quelle() {
        let gateway = test_gateway();
        let (_id, mut rx) = gateway.konsument_annehmen();

        let (tx, _ausgang, verbindung) = test_verbindung();
        gateway.produzent_annehmen(verbindung);

        tx.send(ProduzentEingang::Text(
            r#"{"source":"arduino","status":"connected","type":"audio_processor"}"#.into(),
        ))
        .await
        .unwrap();
        tx.send(test_frame(1, &[0, 500])).await.unwrap();
        kurz_warten().await;

        let json = rx.try_recv().expect("Messwert-Nachricht erwartet");
        let wert: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(wert["source"], "arduino");
    }

    #[tokio::test]
    async fn fehlerhafte_frames_werden_uebersprungen() {
        let gateway = test_gateway();
        let (_id, mut rx) = gateway.konsument_annehmen();

        let (tx, _ausgang, verbindung) = test_verbindung();
        let produzent = gateway.produzent_annehmen(verbindung);
        kurz_warten().await;

        // Unterhalb der Schwelle: Session ueberlebt, nichts wird verteilt
        for _ in 0..3 {
            tx.send(ProduzentEingang::Binaer(Bytes::from_static(&[0xFF; 16])))
                .await
                .unwrap();
        }
        kurz_warten().await;

        assert!(rx.try_recv().is_err(), "Fehlerhafte Frames werden nicht verteilt");
        assert_eq!(gateway.registry().produzent_id(), Some(produzent));

        // Ein gueltiges Frame resettet den Zaehler und wird verteilt
        tx.send(test_frame(2, &[0, 300])).await.unwrap();
        kurz_warten().await;
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn fehler_schwelle_schliesst_session() {
        let gateway = test_gateway();
        let (tx, _ausgang, verbindung) = test_verbindung();
        gateway.produzent_annehmen(verbindung);
        kurz_warten().await;

        // Schwelle im Test-Gateway: 5 fehlerhafte Frames in Folge
        for _ in 0..5 {
            tx.send(ProduzentEingang::Binaer(Bytes::from_static(&[0xFF; 16])))
                .await
                .unwrap();
        }
        kurz_warten().await;

        assert_eq!(
            gateway.registry().produzent_id(),
            None,
            "Session muss nach der Fehler-Schwelle geschlossen sein"
        );
    }

    #[tokio::test]
    async fn handshake_zeitlimit_schliesst_verbindung() {
        let gateway = TelemetrieGateway::neu(
            GatewayConfig {
                handshake_zeitlimit: Duration::from_millis(100),
                ..Default::default()
            },
            KonfigHandle::default(),
        );
        let (_tx, _ausgang, verbindung) = test_verbindung();
        gateway.produzent_annehmen(verbindung);
        kurz_warten().await;

        assert!(gateway.registry().produzent_id().is_some());

        // Zeitlimit im Test-Gateway: 100 ms ohne erste Nachricht
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(gateway.registry().produzent_id(), None);
    }

    #[tokio::test]
    async fn neuer_produzent_loest_alten_ab() {
        let gateway = test_gateway();
        let (_id, mut rx) = gateway.konsument_annehmen();

        let (tx_alt, _ausgang_alt, verbindung_alt) = test_verbindung();
        let alt = gateway.produzent_annehmen(verbindung_alt);
        tx_alt.send(test_frame(10, &[0, 500])).await.unwrap();
        kurz_warten().await;
        let _ = rx.try_recv();

        let (tx_neu, _ausgang_neu, verbindung_neu) = test_verbindung();
        let neu = gateway.produzent_annehmen(verbindung_neu);
        kurz_warten().await;

        assert_ne!(alt, neu);
        assert_eq!(gateway.registry().produzent_id(), Some(neu));

        // Frames des neuen Produzenten kommen mit seinen Zeitstempeln an
        for zeitstempel in [20u32, 21, 22] {
            tx_neu.send(test_frame(zeitstempel, &[0, 500])).await.unwrap();
        }
        kurz_warten().await;

        let mut zeitstempel_gesehen = Vec::new();
        while let Ok(json) = rx.try_recv() {
            let wert: serde_json::Value = serde_json::from_str(&json).unwrap();
            zeitstempel_gesehen.push(wert["timestamp"].as_u64().unwrap());
        }
        assert_eq!(zeitstempel_gesehen, vec![20, 21, 22]);

        // Die alte Session ist beendet; ihre Frames verpuffen
        let _ = tx_alt.send(test_frame(99, &[0, 500])).await;
        kurz_warten().await;
        assert!(rx.try_recv().is_err(), "Alte Session darf nichts mehr verteilen");
    }

    #[tokio::test]
    async fn frames_in_ankunftsreihenfolge() {
        let gateway = test_gateway();
        let (_id, mut rx) = gateway.konsument_annehmen();

        let (tx, _ausgang, verbindung) = test_verbindung();
        gateway.produzent_annehmen(verbindung);

        for zeitstempel in 0..10u32 {
            tx.send(test_frame(zeitstempel, &[0, 500])).await.unwrap();
        }
        kurz_warten().await;

        let mut vorher = None;
        while let Ok(json) = rx.try_recv() {
            let wert: serde_json::Value = serde_json::from_str(&json).unwrap();
            let zeitstempel = wert["timestamp"].as_u64().unwrap();
            if let Some(v) = vorher {
                assert!(zeitstempel > v, "Reihenfolge muss erhalten bleiben");
            }
            vorher = Some(zeitstempel);
        }
        assert_eq!(vorher, Some(9));
    }

    #[tokio::test]
    async fn initial_daten_fuer_neues_dashboard() {
        let gateway = test_gateway();

        let (tx, _ausgang, verbindung) = test_verbindung();
        gateway.produzent_annehmen(verbindung);
        tx.send(test_frame(5, &[0, 500])).await.unwrap();
        kurz_warten().await;

        // Dashboard verbindet sich nach dem ersten Frame
        let (_id, mut rx) = gateway.konsument_annehmen();
        let json = rx.try_recv().expect("Initial-Daten erwartet");
        let wert: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(wert["type"], "initial_data");
        assert_eq!(wert["data"][0]["timestamp"], 5);
    }

    #[tokio::test]
    async fn konfig_update_aktiviert_filter() {
        let gateway = test_gateway();
        let (_id, mut rx) = gateway.konsument_annehmen();

        let (tx, _ausgang, verbindung) = test_verbindung();
        gateway.produzent_annehmen(verbindung);

        tx.send(test_frame(1, &[0, 500])).await.unwrap();
        kurz_warten().await;
        let json = rx.try_recv().unwrap();
        assert!(!json.contains("filteredSnr"), "Ohne Filter keine Variante");

        tx.send(ProduzentEingang::Text(
            r#"{"type":"config","filter":"low_pass"}"#.into(),
        ))
        .await
        .unwrap();
        tx.send(test_frame(2, &[0, 500])).await.unwrap();
        kurz_warten().await;

        let json = rx.try_recv().unwrap();
        assert!(json.contains("filteredSnr"), "Update wirkt ab dem naechsten Frame");
    }

    #[tokio::test]
    async fn drosselung_begrenzt_broadcasts() {
        let gateway = TelemetrieGateway::neu(
            GatewayConfig {
                min_sende_intervall: Duration::from_secs(60),
                ..Default::default()
            },
            KonfigHandle::default(),
        );
        let (_id, mut rx) = gateway.konsument_annehmen();

        let (tx, _ausgang, verbindung) = test_verbindung();
        gateway.produzent_annehmen(verbindung);

        for zeitstempel in 0..5u32 {
            tx.send(test_frame(zeitstempel, &[0, 500])).await.unwrap();
        }
        kurz_warten().await;

        assert!(rx.try_recv().is_ok(), "Das erste Frame wird verteilt");
        assert!(rx.try_recv().is_err(), "Der Rest ist gedrosselt");
    }

    #[tokio::test]
    async fn herunterfahren_leert_registry() {
        let gateway = test_gateway();
        let (_id, _rx) = gateway.konsument_annehmen();
        let (_tx, _ausgang, verbindung) = test_verbindung();
        gateway.produzent_annehmen(verbindung);
        kurz_warten().await;

        gateway.herunterfahren();
        assert_eq!(gateway.registry().konsument_anzahl(), 0);
        kurz_warten().await;
        assert_eq!(gateway.registry().produzent_id(), None);
    }
}
