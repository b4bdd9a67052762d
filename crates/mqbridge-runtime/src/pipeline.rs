//! Transform-then-publish glue used by the routing layer

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use mqbridge_core::Rule;
use mqbridge_core::rule::Target;

use crate::delivery::DeliveryClient;
use crate::error::{DeliveryError, PipelineError, TransformError};
use crate::transformer::Transformer;

/// Something that can deliver payloads to a topic
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish and wait for the level of acknowledgement `qos` asks for
    async fn publish(
        &self,
        topic: &str,
        qos: i32,
        retain: bool,
        payload: Vec<u8>,
    ) -> Result<(), DeliveryError>;

    /// Liveness for health checks
    fn is_connected(&self) -> bool;
}

#[async_trait]
impl Publisher for DeliveryClient {
    async fn publish(
        &self,
        topic: &str,
        qos: i32,
        retain: bool,
        payload: Vec<u8>,
    ) -> Result<(), DeliveryError> {
        DeliveryClient::publish(self, topic, qos, retain, payload).await
    }

    fn is_connected(&self) -> bool {
        DeliveryClient::is_connected(self)
    }
}

#[async_trait]
impl<P: Publisher + ?Sized> Publisher for Arc<P> {
    async fn publish(
        &self,
        topic: &str,
        qos: i32,
        retain: bool,
        payload: Vec<u8>,
    ) -> Result<(), DeliveryError> {
        (**self).publish(topic, qos, retain, payload).await
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }
}

/// Runs a rule end to end: transform the body, publish it to the rule's target
pub struct Pipeline<P> {
    transformer: Transformer,
    publisher: P,
    targets: RwLock<HashMap<String, Target>>,
}

impl<P: Publisher> Pipeline<P> {
    /// Pipeline over an already-loaded transformer. `rules` supplies the
    /// publish targets.
    pub fn new(transformer: Transformer, publisher: P, rules: &[Rule]) -> Self {
        let targets = rules
            .iter()
            .map(|rule| (rule.id.clone(), rule.target.clone()))
            .collect();
        Self {
            transformer,
            publisher,
            targets: RwLock::new(targets),
        }
    }

    /// Transform `body` with the rule and publish the result. Returns the
    /// published payload.
    pub async fn process(&self, rule_id: &str, body: &[u8]) -> Result<Vec<u8>, PipelineError> {
        let payload = self.transformer.transform(rule_id, body)?;

        let target = self.target(rule_id).ok_or_else(|| TransformError::TemplateNotFound {
            rule_id: rule_id.to_string(),
        })?;

        self.publisher
            .publish(&target.topic, target.qos, target.retain, payload.clone())
            .await
            .map_err(|source| PipelineError::Delivery {
                topic: target.topic.clone(),
                source,
            })?;

        tracing::debug!(rule_id, topic = %target.topic, size = payload.len(), "Rule processed");
        Ok(payload)
    }

    /// Validate and register a rule at runtime, replacing any rule with the
    /// same id. An invalid rule leaves the current set untouched.
    pub fn add_rule(&self, rule: &Rule) -> Result<(), TransformError> {
        let template = rule
            .validate_and_compile()
            .map_err(|source| TransformError::InvalidRule {
                rule_id: rule.id.clone(),
                source,
            })?;
        self.targets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(rule.id.clone(), rule.target.clone());
        self.transformer.add_compiled(&rule.id, template);
        Ok(())
    }

    /// Drop a rule; later requests for it fail with `TemplateNotFound`
    pub fn remove_rule(&self, rule_id: &str) {
        self.transformer.remove_template(rule_id);
        self.targets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(rule_id);
    }

    /// Publish target for a rule
    pub fn target(&self, rule_id: &str) -> Option<Target> {
        self.targets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(rule_id)
            .cloned()
    }

    /// Whether the publisher's connection is up
    pub fn is_healthy(&self) -> bool {
        self.publisher.is_connected()
    }

    /// The transformer
    pub fn transformer(&self) -> &Transformer {
        &self.transformer
    }

    /// The publisher
    pub fn publisher(&self) -> &P {
        &self.publisher
    }
}
