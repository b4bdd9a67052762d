//! mqbridge Runtime
//!
//! This crate executes rules: it renders compiled templates against request
//! bodies and delivers the results to an MQTT broker.
//!
//! # Features
//!
//! - Concurrent template registry with runtime add/remove
//! - Pooled output buffers for template execution
//! - MQTT delivery client with an explicit connection state machine,
//!   bounded reconnect backoff and acknowledged publishes
//! - A [`Pipeline`] that chains transform and publish and classifies failures
//!
//! # Usage
//!
//! ```rust,ignore
//! use mqbridge_runtime::{DeliveryClient, DeliverySettings, Pipeline, Transformer};
//!
//! let settings = DeliverySettings::from_config(&config.mqtt)?;
//! let client = DeliveryClient::connect(&settings, recorder.clone()).await?;
//! let transformer = Transformer::new(&rules, recorder)?;
//! let pipeline = Pipeline::new(transformer, client, &rules);
//! let published = pipeline.process("orders", body).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod delivery;
pub mod error;
pub mod pipeline;
pub mod pool;
pub mod registry;
pub mod transformer;

pub use delivery::{ConnectionState, DeliveryClient, DeliverySettings, Qos};
pub use error::{DeliveryError, FailureClass, PipelineError, TransformError};
pub use pipeline::{Pipeline, Publisher};
pub use pool::{BufferPool, PooledBuffer};
pub use registry::TemplateRegistry;
pub use transformer::Transformer;
