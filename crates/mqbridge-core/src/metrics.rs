//! Metrics port
//!
//! The runtime reports through a [`Recorder`]; a deployment plugs in its
//! metrics backend by implementing it. Every method defaults to a no-op so
//! implementations only override what they export.

/// Sink for transform, delivery and request metrics
pub trait Recorder: Send + Sync {
    /// An inbound request finished
    fn observe_request(&self, _path: &str, _method: &str, _status: u16, _seconds: f64) {}

    /// A transform attempt finished
    fn inc_transforms(&self, _rule_id: &str, _success: bool) {}

    /// Time spent in one transform attempt
    fn observe_transform_duration(&self, _rule_id: &str, _seconds: f64) {}

    /// Size of a transform's input
    fn observe_transform_input_size(&self, _rule_id: &str, _bytes: usize) {}

    /// Size of a successful transform's output
    fn observe_transform_output_size(&self, _rule_id: &str, _bytes: usize) {}

    /// A template failed to compile or execute
    fn inc_template_errors(&self, _rule_id: &str) {}

    /// Broker connection gauge
    fn set_connection_status(&self, _connected: bool) {}

    /// A publish was attempted
    fn inc_publish_attempts(&self, _topic: &str) {}

    /// A publish failed
    fn inc_publish_failures(&self, _topic: &str) {}

    /// Time until a publish was acknowledged
    fn observe_publish_duration(&self, _topic: &str, _seconds: f64) {}

    /// A reconnect attempt was made
    fn inc_reconnections(&self) {}

    /// Number of loaded rules
    fn set_active_rules(&self, _count: usize) {}
}

/// Recorder that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRecorder;

impl Recorder for NoopRecorder {}

/// Recorder that emits each measurement as a `trace` event on the
/// `mqbridge::metrics` target
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingRecorder;

/// Tracing target of [`TracingRecorder`] events
pub const METRICS_TARGET: &str = "mqbridge::metrics";

impl Recorder for TracingRecorder {
    fn observe_request(&self, path: &str, method: &str, status: u16, seconds: f64) {
        tracing::trace!(target: METRICS_TARGET, path, method, status, seconds, "request");
    }

    fn inc_transforms(&self, rule_id: &str, success: bool) {
        tracing::trace!(target: METRICS_TARGET, rule_id, success, "transform");
    }

    fn observe_transform_duration(&self, rule_id: &str, seconds: f64) {
        tracing::trace!(target: METRICS_TARGET, rule_id, seconds, "transform duration");
    }

    fn observe_transform_input_size(&self, rule_id: &str, bytes: usize) {
        tracing::trace!(target: METRICS_TARGET, rule_id, bytes, "transform input size");
    }

    fn observe_transform_output_size(&self, rule_id: &str, bytes: usize) {
        tracing::trace!(target: METRICS_TARGET, rule_id, bytes, "transform output size");
    }

    fn inc_template_errors(&self, rule_id: &str) {
        tracing::trace!(target: METRICS_TARGET, rule_id, "template error");
    }

    fn set_connection_status(&self, connected: bool) {
        tracing::trace!(target: METRICS_TARGET, connected, "connection status");
    }

    fn inc_publish_attempts(&self, topic: &str) {
        tracing::trace!(target: METRICS_TARGET, topic, "publish attempt");
    }

    fn inc_publish_failures(&self, topic: &str) {
        tracing::trace!(target: METRICS_TARGET, topic, "publish failure");
    }

    fn observe_publish_duration(&self, topic: &str, seconds: f64) {
        tracing::trace!(target: METRICS_TARGET, topic, seconds, "publish duration");
    }

    fn inc_reconnections(&self) {
        tracing::trace!(target: METRICS_TARGET, "reconnection");
    }

    fn set_active_rules(&self, count: usize) {
        tracing::trace!(target: METRICS_TARGET, count, "active rules");
    }
}
