//! MQTT delivery client
//!
//! One long-lived connection shared by every request. The initial connect
//! retries a bounded number of times; after that, a lost connection is
//! retried forever with backoff until the client is closed. Publishes are
//! refused while the connection is not up and never wait for a reconnect.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use mqbridge_core::Recorder;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::link::{BrokerConnector, BrokerLink, BrokerOutbox, BrokerSession, LinkEvent};
use super::{
    Backoff, ConnectionEvent, ConnectionState, DeliverySettings, MqttConnector, Qos,
    ReconnectPolicy,
};
use crate::error::DeliveryError;

/// How long a publish waits for the broker to take it
pub const PUBLISH_TIMEOUT: Duration = Duration::from_secs(10);

/// How long `close` lets the transport flush a DISCONNECT
const DISCONNECT_GRACE: Duration = Duration::from_millis(250);

type Reply = oneshot::Sender<Result<(), DeliveryError>>;

struct Pending {
    qos: Qos,
    reply: Reply,
}

/// Publishes handed to the transport and not yet completed
#[derive(Default)]
struct Outstanding {
    outbox: Option<Arc<dyn BrokerOutbox>>,
    /// In request order; matched against `Sent` events
    awaiting_send: VecDeque<Pending>,
    /// QoS 1/2 publishes keyed by packet id
    awaiting_ack: HashMap<u16, Reply>,
}

impl Outstanding {
    fn fail_all(&mut self, reason: &str) {
        let error = DeliveryError::Broker(reason.to_string());
        for pending in self.awaiting_send.drain(..) {
            let _ = pending.reply.send(Err(error.clone()));
        }
        for (_, reply) in self.awaiting_ack.drain() {
            let _ = reply.send(Err(error.clone()));
        }
    }
}

struct Shared {
    recorder: Arc<dyn Recorder>,
    state: watch::Sender<ConnectionState>,
    outstanding: Mutex<Outstanding>,
    /// Held from queueing a `Pending` until the transport takes the request
    send_order: tokio::sync::Mutex<()>,
}

impl Shared {
    fn apply(&self, event: ConnectionEvent) -> ConnectionState {
        let mut change = None;
        self.state.send_if_modified(|state| {
            let next = state.on(event);
            if next == *state {
                return false;
            }
            change = Some((*state, next));
            *state = next;
            true
        });
        if let Some((from, to)) = change {
            debug!(from = %from, to = %to, "MQTT connection state changed");
        }
        self.current()
    }

    fn current(&self) -> ConnectionState {
        *self.state.borrow()
    }

    fn outstanding(&self) -> MutexGuard<'_, Outstanding> {
        self.outstanding.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn attach(&self, outbox: Arc<dyn BrokerOutbox>) {
        self.outstanding().outbox = Some(outbox);
        self.apply(ConnectionEvent::ConnAckReceived);
        self.recorder.set_connection_status(true);
    }

    fn detach(&self, reason: &str) {
        let mut outstanding = self.outstanding();
        outstanding.outbox = None;
        outstanding.fail_all(reason);
    }

    fn on_link_event(&self, event: LinkEvent) {
        match event {
            LinkEvent::Sent { pkid } => {
                let mut outstanding = self.outstanding();
                let Some(pending) = outstanding.awaiting_send.pop_front() else {
                    return;
                };
                if !pending.qos.is_acknowledged() {
                    let _ = pending.reply.send(Ok(()));
                } else if !pending.reply.is_closed() {
                    outstanding.awaiting_ack.insert(pkid, pending.reply);
                }
            }
            LinkEvent::Acked { pkid } => {
                if let Some(reply) = self.outstanding().awaiting_ack.remove(&pkid) {
                    let _ = reply.send(Ok(()));
                }
            }
            LinkEvent::ConnAck | LinkEvent::Other => {}
        }
    }
}

/// Removes a queued `Pending` whose request never reached the transport.
/// Only valid while `send_order` is held, so the entry is the newest one.
struct Unsent<'a> {
    shared: &'a Shared,
    armed: bool,
}

impl Drop for Unsent<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.shared.outstanding().awaiting_send.pop_back();
        }
    }
}

/// Open a session and wait up to `wait` for the broker to accept it
async fn open_session(
    connector: &dyn BrokerConnector,
    wait: Duration,
) -> Result<BrokerSession, String> {
    let mut session = connector.open().map_err(|e| e.to_string())?;
    match tokio::time::timeout(wait, wait_for_connack(session.link.as_mut())).await {
        Ok(Ok(())) => Ok(session),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err(format!("connection timeout after {wait:?}")),
    }
}

async fn wait_for_connack(link: &mut dyn BrokerLink) -> Result<(), super::LinkError> {
    loop {
        if link.poll().await? == LinkEvent::ConnAck {
            return Ok(());
        }
    }
}

/// Shared MQTT publisher
pub struct DeliveryClient {
    shared: Arc<Shared>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl DeliveryClient {
    /// Connect to the broker described by `settings`
    pub async fn connect(
        settings: &DeliverySettings,
        recorder: Arc<dyn Recorder>,
    ) -> Result<Self, DeliveryError> {
        info!(
            host = %settings.address.host,
            port = settings.address.port,
            client_id = %settings.client_id,
            tls = settings.tls.is_some(),
            "Connecting to MQTT broker"
        );
        let connector = MqttConnector::new(settings)?;
        Self::connect_with(Arc::new(connector), settings.reconnect, recorder).await
    }

    /// Connect through any transport.
    ///
    /// Each attempt waits up to `policy.initial` for the broker to accept.
    /// After `policy.max_retries` further failures the last reason is
    /// returned in [`DeliveryError::RetriesExhausted`].
    pub async fn connect_with(
        connector: Arc<dyn BrokerConnector>,
        policy: ReconnectPolicy,
        recorder: Arc<dyn Recorder>,
    ) -> Result<Self, DeliveryError> {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        let shared = Arc::new(Shared {
            recorder,
            state,
            outstanding: Mutex::new(Outstanding::default()),
            send_order: tokio::sync::Mutex::new(()),
        });
        shared.apply(ConnectionEvent::ConnectRequested);

        let mut retries = 0u32;
        let session = loop {
            match open_session(connector.as_ref(), policy.initial).await {
                Ok(session) => break session,
                Err(reason) => {
                    shared.recorder.set_connection_status(false);
                    if retries >= policy.max_retries {
                        shared.apply(ConnectionEvent::AttemptFailed {
                            retries_remaining: 0,
                        });
                        return Err(DeliveryError::RetriesExhausted { retries, reason });
                    }
                    shared.apply(ConnectionEvent::AttemptFailed {
                        retries_remaining: policy.max_retries - retries,
                    });
                    retries += 1;
                    warn!(
                        error = %reason,
                        retry = retries,
                        max_retries = policy.max_retries,
                        "Failed to connect to MQTT broker, retrying"
                    );
                    tokio::time::sleep(policy.initial).await;
                }
            }
        };

        let BrokerSession { outbox, link } = session;
        shared.attach(outbox);
        info!("MQTT connected successfully");

        let task = tokio::spawn(run_event_loop(
            Arc::clone(&shared),
            connector,
            link,
            policy,
        ));
        Ok(Self {
            shared,
            task: Mutex::new(Some(task)),
        })
    }

    /// Publish `payload` and wait for the broker according to `qos`.
    ///
    /// QoS 0 completes once the publish leaves the client; QoS 1 and 2 wait
    /// for the broker's acknowledgement. Waiting for room in the transport's
    /// request queue and for the broker together is bounded by
    /// [`PUBLISH_TIMEOUT`].
    pub async fn publish(
        &self,
        topic: &str,
        qos: i32,
        retain: bool,
        payload: Vec<u8>,
    ) -> Result<(), DeliveryError> {
        let started = Instant::now();
        self.shared.recorder.inc_publish_attempts(topic);

        let result = self.send(topic, qos, retain, payload).await;
        match &result {
            Ok(()) => {
                self.shared
                    .recorder
                    .observe_publish_duration(topic, started.elapsed().as_secs_f64());
                debug!(topic, qos, retain, "Message published");
            }
            Err(e) => {
                self.shared.recorder.inc_publish_failures(topic);
                warn!(topic, qos, error = %e, "Publish failed");
            }
        }
        result
    }

    async fn send(
        &self,
        topic: &str,
        qos: i32,
        retain: bool,
        payload: Vec<u8>,
    ) -> Result<(), DeliveryError> {
        let qos = Qos::try_from(qos)?;
        let state = self.shared.current();
        if !state.is_connected() {
            return Err(DeliveryError::NotConnected(state));
        }
        let delivery = self.enqueue_and_wait(topic, qos, retain, payload);
        match tokio::time::timeout(PUBLISH_TIMEOUT, delivery).await {
            Ok(result) => result,
            Err(_) => Err(DeliveryError::Timeout(PUBLISH_TIMEOUT)),
        }
    }

    async fn enqueue_and_wait(
        &self,
        topic: &str,
        qos: Qos,
        retain: bool,
        payload: Vec<u8>,
    ) -> Result<(), DeliveryError> {
        let receiver = {
            // `awaiting_send` must stay in the order requests reach the transport
            let _order = self.shared.send_order.lock().await;
            let (outbox, receiver) = {
                let mut outstanding = self.shared.outstanding();
                let Some(outbox) = outstanding.outbox.clone() else {
                    return Err(DeliveryError::NotConnected(self.shared.current()));
                };
                let (reply, receiver) = oneshot::channel();
                outstanding.awaiting_send.push_back(Pending { qos, reply });
                (outbox, receiver)
            };
            let mut unsent = Unsent {
                shared: &self.shared,
                armed: true,
            };
            outbox
                .publish(topic, qos, retain, payload)
                .await
                .map_err(|e| DeliveryError::Broker(e.to_string()))?;
            unsent.armed = false;
            receiver
        };

        match receiver.await {
            Ok(result) => result,
            Err(_) => Err(DeliveryError::Broker("delivery client closed".to_string())),
        }
    }

    /// Whether the broker connection is up; refreshes the status gauge
    pub fn is_connected(&self) -> bool {
        let connected = self.shared.current().is_connected();
        self.shared.recorder.set_connection_status(connected);
        connected
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        self.shared.current()
    }

    /// Watch connection state changes
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// Disconnect and stop reconnecting. Safe to call more than once.
    pub async fn close(&self) {
        let previous = self.shared.current();
        if previous == ConnectionState::Closed {
            return;
        }
        self.shared.apply(ConnectionEvent::CloseRequested);

        let outbox = {
            let mut outstanding = self.shared.outstanding();
            outstanding.fail_all("delivery client closed");
            outstanding.outbox.take()
        };
        if let Some(outbox) = outbox
            && previous.is_connected()
            && let Err(e) = outbox.try_disconnect()
        {
            debug!(error = %e, "Failed to queue MQTT disconnect");
        }

        let task = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(mut task) = task {
            if tokio::time::timeout(DISCONNECT_GRACE, &mut task).await.is_err() {
                task.abort();
            }
        }

        self.shared.recorder.set_connection_status(false);
        info!("MQTT connection closed");
    }
}

impl Drop for DeliveryClient {
    fn drop(&mut self) {
        if let Some(task) = self
            .task
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
    }
}

async fn run_event_loop(
    shared: Arc<Shared>,
    connector: Arc<dyn BrokerConnector>,
    mut link: Box<dyn BrokerLink>,
    policy: ReconnectPolicy,
) {
    let mut backoff = Backoff::new(&policy);
    loop {
        match link.poll().await {
            Ok(event) => shared.on_link_event(event),
            Err(e) => {
                if shared.current() == ConnectionState::Closed {
                    return;
                }
                warn!(error = %e, "MQTT connection lost");
                shared.apply(ConnectionEvent::TransportLost);
                shared.recorder.set_connection_status(false);
                shared.detach("connection lost");

                match reconnect(&shared, connector.as_ref(), &policy, &mut backoff).await {
                    Some(next) => link = next,
                    None => return,
                }
            }
        }
    }
}

/// Retry until a session is accepted; `None` once the client is closed
async fn reconnect(
    shared: &Shared,
    connector: &dyn BrokerConnector,
    policy: &ReconnectPolicy,
    backoff: &mut Backoff,
) -> Option<Box<dyn BrokerLink>> {
    loop {
        let delay = backoff.next_delay();
        tokio::time::sleep(delay).await;
        if shared.current() == ConnectionState::Closed {
            return None;
        }

        shared.recorder.inc_reconnections();
        info!(delay = ?delay, "Attempting MQTT reconnection");
        match open_session(connector, policy.initial).await {
            Ok(BrokerSession { outbox, link }) => {
                if shared.current() == ConnectionState::Closed {
                    let _ = outbox.try_disconnect();
                    return None;
                }
                shared.attach(outbox);
                backoff.reset();
                info!("MQTT reconnected");
                return Some(link);
            }
            Err(reason) => {
                shared.apply(ConnectionEvent::AttemptFailed {
                    retries_remaining: 0,
                });
                warn!(error = %reason, "MQTT reconnection failed");
            }
        }
    }
}
