//! Transformation executor
//!
//! ```text
//! rule id ──▶ registry lookup ──▶ decode body ──▶ render into pooled buffer
//!                                                        │
//!                          copy out ◀── validate JSON ◀──┘
//! ```
//!
//! Each call reports exactly one outcome to the [`Recorder`] along with its
//! duration and sizes, whichever step fails.

use std::sync::Arc;
use std::time::Instant;

use mqbridge_core::{Recorder, Rule};
use mqbridge_template::CompiledTemplate;
use serde::de::IgnoredAny;
use serde_json::{Map, Value};

use crate::error::TransformError;
use crate::pool::BufferPool;
use crate::registry::TemplateRegistry;

/// Renders rule templates against request bodies
pub struct Transformer {
    registry: TemplateRegistry,
    pool: BufferPool,
    recorder: Arc<dyn Recorder>,
}

impl Transformer {
    /// Compile every rule's template. Any compile failure aborts construction.
    pub fn new(rules: &[Rule], recorder: Arc<dyn Recorder>) -> Result<Self, TransformError> {
        let transformer = Self {
            registry: TemplateRegistry::new(),
            pool: BufferPool::default(),
            recorder,
        };
        for rule in rules {
            transformer.compile_and_store(&rule.id, &rule.transform.template)?;
        }
        transformer.recorder.set_active_rules(transformer.registry.count());
        Ok(transformer)
    }

    /// Transform `input` with the rule's template, returning the JSON payload.
    pub fn transform(&self, rule_id: &str, input: &[u8]) -> Result<Vec<u8>, TransformError> {
        let started = Instant::now();
        let result = self.execute(rule_id, input);

        self.recorder.inc_transforms(rule_id, result.is_ok());
        self.recorder
            .observe_transform_duration(rule_id, started.elapsed().as_secs_f64());
        self.recorder.observe_transform_input_size(rule_id, input.len());
        match &result {
            Ok(output) => {
                self.recorder.observe_transform_output_size(rule_id, output.len());
                tracing::debug!(
                    rule_id,
                    input_size = input.len(),
                    output_size = output.len(),
                    "Message transformed successfully"
                );
            }
            Err(err) => {
                if matches!(err, TransformError::TemplateExecution { .. }) {
                    self.recorder.inc_template_errors(rule_id);
                }
                tracing::debug!(rule_id, error = %err, "Transform failed");
            }
        }
        result
    }

    /// Compile and register a template at runtime, replacing any existing one.
    pub fn add_template(&self, rule_id: &str, source: &str) -> Result<(), TransformError> {
        let count = self.compile_and_store(rule_id, source)?;
        self.recorder.set_active_rules(count);
        tracing::info!(rule_id, active_rules = count, "Template added");
        Ok(())
    }

    /// Register an already compiled template, replacing any existing one.
    pub fn add_compiled(&self, rule_id: &str, template: CompiledTemplate) {
        let count = self.registry.store(rule_id, template);
        self.recorder.set_active_rules(count);
        tracing::info!(rule_id, active_rules = count, "Template added");
    }

    /// Unregister a template. Unknown ids are ignored.
    pub fn remove_template(&self, rule_id: &str) {
        let count = self.registry.delete(rule_id);
        self.recorder.set_active_rules(count);
        tracing::info!(rule_id, active_rules = count, "Template removed");
    }

    /// Number of registered templates
    pub fn active_rules(&self) -> usize {
        self.registry.count()
    }

    /// The underlying registry
    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }

    fn compile_and_store(&self, rule_id: &str, source: &str) -> Result<usize, TransformError> {
        match mqbridge_template::compile(rule_id, source) {
            Ok(template) => Ok(self.registry.store(rule_id, template)),
            Err(source) => {
                self.recorder.inc_template_errors(rule_id);
                Err(TransformError::TemplateCompile {
                    rule_id: rule_id.to_string(),
                    source,
                })
            }
        }
    }

    fn execute(&self, rule_id: &str, input: &[u8]) -> Result<Vec<u8>, TransformError> {
        let template = self
            .registry
            .load(rule_id)
            .ok_or_else(|| TransformError::TemplateNotFound {
                rule_id: rule_id.to_string(),
            })?;

        let data = decode_input(input).map_err(|message| TransformError::InputParse {
            rule_id: rule_id.to_string(),
            message,
        })?;

        let mut buf = self.pool.acquire();
        template
            .render(&data, &mut buf)
            .map_err(|source| TransformError::TemplateExecution {
                rule_id: rule_id.to_string(),
                source,
            })?;

        if let Err(e) = serde_json::from_slice::<IgnoredAny>(&buf) {
            return Err(TransformError::InvalidOutput {
                rule_id: rule_id.to_string(),
                message: e.to_string(),
            });
        }

        Ok(buf.to_vec())
    }
}

/// Decode a request body. The body must be a JSON object; `null` stands for
/// an empty one.
fn decode_input(input: &[u8]) -> Result<Value, String> {
    match serde_json::from_slice::<Value>(input) {
        Ok(Value::Object(map)) => Ok(Value::Object(map)),
        Ok(Value::Null) => Ok(Value::Object(Map::new())),
        Ok(other) => Err(format!("expected a JSON object, found {}", kind(&other))),
        Err(e) => Err(e.to_string()),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
