//! Runtime error types
//!
//! Every per-request error carries the rule id (transform) or topic
//! (delivery) it belongs to, and maps to a [`FailureClass`] the routing
//! layer uses to pick a response.

use std::time::Duration;

use thiserror::Error;

use crate::delivery::ConnectionState;

/// How a request failed, from the caller's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// The request body is not a usable JSON document
    MalformedInput,
    /// The rule could not turn the document into a payload
    TransformFailure,
    /// The payload could not be delivered to the broker
    DeliveryFailure,
}

impl FailureClass {
    /// Whether resending the same request may succeed
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::DeliveryFailure)
    }

    /// HTTP status for this class
    pub fn http_status(self) -> u16 {
        match self {
            Self::MalformedInput => 400,
            Self::TransformFailure => 422,
            Self::DeliveryFailure => 503,
        }
    }
}

/// Errors from the transformation executor
#[derive(Error, Debug)]
pub enum TransformError {
    /// No compiled template is registered under the rule id
    #[error("template not found: no template for rule {rule_id}")]
    TemplateNotFound {
        /// Requested rule id
        rule_id: String,
    },

    /// The request body is not a JSON object
    #[error("failed to parse input data for rule {rule_id}: {message}")]
    InputParse {
        /// Rule id
        rule_id: String,
        /// Decoder message
        message: String,
    },

    /// Rendering faulted on the input document
    #[error("failed to execute template for rule {rule_id}: {source}")]
    TemplateExecution {
        /// Rule id
        rule_id: String,
        /// Template error
        #[source]
        source: mqbridge_template::Error,
    },

    /// The rendered bytes are not well-formed JSON
    #[error("template output is not valid JSON for rule {rule_id}: {message}")]
    InvalidOutput {
        /// Rule id
        rule_id: String,
        /// Validator message
        message: String,
    },

    /// A template added at runtime does not compile
    #[error("failed to compile template for rule {rule_id}: {source}")]
    TemplateCompile {
        /// Rule id
        rule_id: String,
        /// Template error
        #[source]
        source: mqbridge_template::Error,
    },

    /// A rule registered at runtime failed validation
    #[error("{source}")]
    InvalidRule {
        /// Rule id
        rule_id: String,
        /// Validation failure
        #[source]
        source: mqbridge_core::Error,
    },
}

impl TransformError {
    /// Rule id the error belongs to
    pub fn rule_id(&self) -> &str {
        match self {
            Self::TemplateNotFound { rule_id }
            | Self::InputParse { rule_id, .. }
            | Self::TemplateExecution { rule_id, .. }
            | Self::InvalidOutput { rule_id, .. }
            | Self::TemplateCompile { rule_id, .. }
            | Self::InvalidRule { rule_id, .. } => rule_id,
        }
    }

    /// Failure classification
    pub fn class(&self) -> FailureClass {
        match self {
            Self::InputParse { .. } => FailureClass::MalformedInput,
            _ => FailureClass::TransformFailure,
        }
    }
}

/// Errors from the delivery client
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// The broker did not acknowledge in time
    #[error("publish timeout: no acknowledgment within {0:?}")]
    Timeout(Duration),

    /// The broker or transport reported a failure
    #[error("broker error: {0}")]
    Broker(String),

    /// Publish was called while the client was not connected
    #[error("not connected to broker (state: {0})")]
    NotConnected(ConnectionState),

    /// Initial connect gave up
    #[error("failed to connect after {retries} retries: {reason}")]
    RetriesExhausted {
        /// Failed attempts after the first
        retries: u32,
        /// Last failure
        reason: String,
    },

    /// The connection could not be set up from the configuration
    #[error("connection setup failed: {0}")]
    Setup(String),

    /// TLS material could not be loaded or applied
    #[error("TLS configuration error: {0}")]
    Tls(String),

    /// QoS outside 0-2
    #[error("invalid QoS level: {0}, must be between 0 and 2")]
    InvalidQos(i32),
}

/// Errors from [`crate::Pipeline::process`]
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Transformation failed
    #[error(transparent)]
    Transform(#[from] TransformError),

    /// Publishing failed
    #[error("failed to publish to {topic}: {source}")]
    Delivery {
        /// Target topic
        topic: String,
        /// Delivery error
        #[source]
        source: DeliveryError,
    },
}

impl PipelineError {
    /// Failure classification
    pub fn class(&self) -> FailureClass {
        match self {
            Self::Transform(e) => e.class(),
            Self::Delivery { .. } => FailureClass::DeliveryFailure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(FailureClass::MalformedInput, 400, false)]
    #[case(FailureClass::TransformFailure, 422, false)]
    #[case(FailureClass::DeliveryFailure, 503, true)]
    fn test_failure_class(#[case] class: FailureClass, #[case] status: u16, #[case] retry: bool) {
        assert_eq!(class.http_status(), status);
        assert_eq!(class.is_retryable(), retry);
    }

    #[test]
    fn test_transform_error_class() {
        let err = TransformError::InputParse {
            rule_id: "r".into(),
            message: "eof".into(),
        };
        assert_eq!(err.class(), FailureClass::MalformedInput);
        assert_eq!(err.rule_id(), "r");

        let err = TransformError::TemplateNotFound { rule_id: "x".into() };
        assert_eq!(err.class(), FailureClass::TransformFailure);
        assert!(err.to_string().contains("x"));
    }

    #[test]
    fn test_pipeline_error_class() {
        let err = PipelineError::Delivery {
            topic: "t".into(),
            source: DeliveryError::Timeout(Duration::from_secs(10)),
        };
        assert_eq!(err.class(), FailureClass::DeliveryFailure);
        assert!(err.class().is_retryable());
    }

    #[test]
    fn test_retries_exhausted_message() {
        let err = DeliveryError::RetriesExhausted {
            retries: 3,
            reason: "connection refused".into(),
        };
        assert_eq!(err.to_string(), "failed to connect after 3 retries: connection refused");
    }
}
