//! Scripted broker and counting recorder shared by the integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mqbridge_core::Recorder;
use mqbridge_runtime::delivery::{
    BrokerConnector, BrokerLink, BrokerOutbox, BrokerSession, LinkError, LinkEvent, Qos,
};
use tokio::sync::{Semaphore, mpsc};

type EventSender = mpsc::UnboundedSender<Result<LinkEvent, LinkError>>;

/// How the fake broker answers a new session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectMode {
    /// CONNACK immediately
    Accept,
    /// Fail the session with this reason
    Refuse(String),
    /// Never answer
    Hang,
}

/// A publish the fake broker received
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub topic: String,
    pub qos: Qos,
    pub retain: bool,
    pub payload: Vec<u8>,
}

/// In-memory broker. Each `open` starts a new session whose link replays
/// what a real transport would report.
pub struct FakeBroker {
    mode: Mutex<ConnectMode>,
    refuse_first: AtomicU32,
    auto_ack: Arc<AtomicBool>,
    opened: AtomicU32,
    disconnects: Arc<AtomicU32>,
    published: Arc<Mutex<Vec<Published>>>,
    current: Mutex<Option<EventSender>>,
    request_capacity: Mutex<Option<usize>>,
    current_slots: Mutex<Option<Arc<Semaphore>>>,
}

impl FakeBroker {
    pub fn new(mode: ConnectMode) -> Arc<Self> {
        Arc::new(Self {
            mode: Mutex::new(mode),
            refuse_first: AtomicU32::new(0),
            auto_ack: Arc::new(AtomicBool::new(true)),
            opened: AtomicU32::new(0),
            disconnects: Arc::new(AtomicU32::new(0)),
            published: Arc::new(Mutex::new(Vec::new())),
            current: Mutex::new(None),
            request_capacity: Mutex::new(None),
            current_slots: Mutex::new(None),
        })
    }

    pub fn accepting() -> Arc<Self> {
        Self::new(ConnectMode::Accept)
    }

    pub fn set_mode(&self, mode: ConnectMode) {
        *self.mode.lock().unwrap() = mode;
    }

    /// Refuse the next `n` sessions before applying the mode
    pub fn refuse_first(&self, n: u32) {
        self.refuse_first.store(n, Ordering::SeqCst);
    }

    /// Whether QoS 1/2 publishes are acknowledged
    pub fn set_auto_ack(&self, ack: bool) {
        self.auto_ack.store(ack, Ordering::SeqCst);
    }

    /// Bound each new session's request queue; `None` is unbounded.
    /// A slot frees up when the link reports the request as sent.
    pub fn set_request_capacity(&self, capacity: Option<usize>) {
        *self.request_capacity.lock().unwrap() = capacity;
    }

    /// Open `n` more request slots on the current session
    pub fn release_requests(&self, n: usize) {
        if let Some(slots) = self.current_slots.lock().unwrap().as_ref() {
            slots.add_permits(n);
        }
    }

    pub fn sessions_opened(&self) -> u32 {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn disconnects(&self) -> u32 {
        self.disconnects.load(Ordering::SeqCst)
    }

    pub fn published(&self) -> Vec<Published> {
        self.published.lock().unwrap().clone()
    }

    /// Kill the current session's transport
    pub fn drop_connection(&self) {
        if let Some(tx) = self.current.lock().unwrap().take() {
            let _ = tx.send(Err(LinkError("connection reset by peer".to_string())));
        }
    }
}

impl BrokerConnector for FakeBroker {
    fn open(&self) -> Result<BrokerSession, LinkError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::unbounded_channel();

        let refused = self
            .refuse_first
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        let mode = if refused {
            ConnectMode::Refuse("connection refused".to_string())
        } else {
            self.mode.lock().unwrap().clone()
        };
        match mode {
            ConnectMode::Accept => {
                let _ = tx.send(Ok(LinkEvent::ConnAck));
            }
            ConnectMode::Refuse(reason) => {
                let _ = tx.send(Err(LinkError(reason)));
            }
            ConnectMode::Hang => {}
        }

        *self.current.lock().unwrap() = Some(tx.clone());
        let slots = self
            .request_capacity
            .lock()
            .unwrap()
            .map(|capacity| Arc::new(Semaphore::new(capacity)));
        *self.current_slots.lock().unwrap() = slots.clone();
        Ok(BrokerSession {
            outbox: Arc::new(FakeOutbox {
                tx,
                slots: slots.clone(),
                auto_ack: Arc::clone(&self.auto_ack),
                next_pkid: AtomicU16::new(1),
                published: Arc::clone(&self.published),
                disconnects: Arc::clone(&self.disconnects),
            }),
            link: Box::new(FakeLink { rx, slots }),
        })
    }
}

struct FakeOutbox {
    tx: EventSender,
    slots: Option<Arc<Semaphore>>,
    auto_ack: Arc<AtomicBool>,
    next_pkid: AtomicU16,
    published: Arc<Mutex<Vec<Published>>>,
    disconnects: Arc<AtomicU32>,
}

#[async_trait]
impl BrokerOutbox for FakeOutbox {
    async fn publish(
        &self,
        topic: &str,
        qos: Qos,
        retain: bool,
        payload: Vec<u8>,
    ) -> Result<(), LinkError> {
        if let Some(slots) = &self.slots {
            slots
                .acquire()
                .await
                .map_err(|_| LinkError("session closed".to_string()))?
                .forget();
        }
        self.published.lock().unwrap().push(Published {
            topic: topic.to_string(),
            qos,
            retain,
            payload,
        });
        let pkid = if qos.is_acknowledged() {
            self.next_pkid.fetch_add(1, Ordering::SeqCst)
        } else {
            0
        };
        self.tx
            .send(Ok(LinkEvent::Sent { pkid }))
            .map_err(|_| LinkError("session closed".to_string()))?;
        if qos.is_acknowledged() && self.auto_ack.load(Ordering::SeqCst) {
            let _ = self.tx.send(Ok(LinkEvent::Acked { pkid }));
        }
        Ok(())
    }

    fn try_disconnect(&self) -> Result<(), LinkError> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        let _ = self.tx.send(Err(LinkError("disconnected".to_string())));
        Ok(())
    }
}

struct FakeLink {
    rx: mpsc::UnboundedReceiver<Result<LinkEvent, LinkError>>,
    slots: Option<Arc<Semaphore>>,
}

#[async_trait]
impl BrokerLink for FakeLink {
    async fn poll(&mut self) -> Result<LinkEvent, LinkError> {
        let event = match self.rx.recv().await {
            Some(event) => event,
            None => std::future::pending().await,
        };
        if let (Ok(LinkEvent::Sent { .. }), Some(slots)) = (&event, &self.slots) {
            slots.add_permits(1);
        }
        event
    }
}

/// Recorder that counts what it is told
#[derive(Default)]
pub struct CountingRecorder {
    pub transforms_ok: AtomicUsize,
    pub transforms_failed: AtomicUsize,
    pub transform_durations: AtomicUsize,
    pub input_sizes: AtomicUsize,
    pub output_sizes: AtomicUsize,
    pub template_errors: AtomicUsize,
    pub publish_attempts: AtomicUsize,
    pub publish_failures: AtomicUsize,
    pub publish_durations: AtomicUsize,
    pub reconnections: AtomicUsize,
    pub connected: AtomicBool,
    pub active_rules: AtomicUsize,
}

impl CountingRecorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

impl Recorder for CountingRecorder {
    fn inc_transforms(&self, _rule_id: &str, success: bool) {
        if success {
            self.transforms_ok.fetch_add(1, Ordering::SeqCst);
        } else {
            self.transforms_failed.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn observe_transform_duration(&self, _rule_id: &str, _seconds: f64) {
        self.transform_durations.fetch_add(1, Ordering::SeqCst);
    }

    fn observe_transform_input_size(&self, _rule_id: &str, _bytes: usize) {
        self.input_sizes.fetch_add(1, Ordering::SeqCst);
    }

    fn observe_transform_output_size(&self, _rule_id: &str, _bytes: usize) {
        self.output_sizes.fetch_add(1, Ordering::SeqCst);
    }

    fn inc_template_errors(&self, _rule_id: &str) {
        self.template_errors.fetch_add(1, Ordering::SeqCst);
    }

    fn set_connection_status(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    fn inc_publish_attempts(&self, _topic: &str) {
        self.publish_attempts.fetch_add(1, Ordering::SeqCst);
    }

    fn inc_publish_failures(&self, _topic: &str) {
        self.publish_failures.fetch_add(1, Ordering::SeqCst);
    }

    fn observe_publish_duration(&self, _topic: &str, _seconds: f64) {
        self.publish_durations.fetch_add(1, Ordering::SeqCst);
    }

    fn inc_reconnections(&self) {
        self.reconnections.fetch_add(1, Ordering::SeqCst);
    }

    fn set_active_rules(&self, count: usize) {
        self.active_rules.store(count, Ordering::SeqCst);
    }
}
