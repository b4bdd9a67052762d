//! Transformation executor behaviour

mod support;

use std::sync::Arc;
use std::thread;

use mqbridge_core::Rule;
use mqbridge_core::rule::{RuleApi, Target, Transform};
use mqbridge_runtime::{FailureClass, TransformError, Transformer};
use rstest::rstest;
use support::CountingRecorder;

fn rule(id: &str, template: &str) -> Rule {
    Rule {
        id: id.to_string(),
        description: String::new(),
        api: RuleApi {
            method: "POST".to_string(),
            path: format!("/{id}"),
        },
        transform: Transform {
            template: template.to_string(),
        },
        target: Target {
            topic: format!("test/{id}"),
            qos: 1,
            retain: false,
        },
    }
}

const SCENARIO_TEMPLATE: &str = r#"{"id":"{{.x}}","v":{{num .y}}}"#;

#[rstest]
#[case(r#"{"x":"a","y":42}"#, r#"{"id":"a","v":42}"#)]
#[case(r#"{"x":"a","y":"oops"}"#, r#"{"id":"a","v":0}"#)]
#[case(r#"{"x":"a","y":"17.5"}"#, r#"{"id":"a","v":17.5}"#)]
#[case(r#"{"x":"a","y":123456789012345}"#, r#"{"id":"a","v":123456789012345}"#)]
#[case(r#"{"x":"a"}"#, r#"{"id":"a","v":0}"#)]
fn test_num_scenarios(#[case] input: &str, #[case] expected: &str) {
    let recorder = CountingRecorder::new();
    let transformer = Transformer::new(&[rule("orders", SCENARIO_TEMPLATE)], recorder).unwrap();

    let output = transformer.transform("orders", input.as_bytes()).unwrap();

    assert_eq!(String::from_utf8(output).unwrap(), expected);
}

#[test]
fn test_full_vocabulary() {
    let template = r#"{"flag":{{bool .on}},"raw":{{toJSON .meta}},"inner":{{toJSON (fromJSON .blob)}},"n":{{num .count}}}"#;
    let transformer =
        Transformer::new(&[rule("all", template)], CountingRecorder::new()).unwrap();

    let output = transformer
        .transform(
            "all",
            br#"{"on":"true","meta":{"a":[1,2]},"blob":"{\"k\":\"v\"}","count":"7"}"#,
        )
        .unwrap();

    assert_eq!(
        String::from_utf8(output).unwrap(),
        r#"{"flag":true,"raw":{"a":[1,2]},"inner":{"k":"v"},"n":7}"#
    );
}

#[test]
fn test_metrics_per_outcome() {
    let recorder = CountingRecorder::new();
    let transformer =
        Transformer::new(&[rule("r", r#"{"v":{{.a.b}}}"#)], recorder.clone()).unwrap();
    assert_eq!(CountingRecorder::get(&recorder.active_rules), 1);

    transformer.transform("r", br#"{"a":{"b":1}}"#).unwrap();
    let _ = transformer.transform("r", b"{}");
    let _ = transformer.transform("r", b"not json");

    assert_eq!(CountingRecorder::get(&recorder.transforms_ok), 1);
    assert_eq!(CountingRecorder::get(&recorder.transforms_failed), 2);
    assert_eq!(CountingRecorder::get(&recorder.transform_durations), 3);
    assert_eq!(CountingRecorder::get(&recorder.input_sizes), 3);
    assert_eq!(CountingRecorder::get(&recorder.output_sizes), 1);
    assert_eq!(CountingRecorder::get(&recorder.template_errors), 1);
}

#[test]
fn test_failure_classes() {
    let transformer =
        Transformer::new(&[rule("r", r#"{"v":"{{.x}}"}"#)], CountingRecorder::new()).unwrap();

    let err = transformer.transform("r", b"{oops").unwrap_err();
    assert_eq!(err.class(), FailureClass::MalformedInput);
    assert_eq!(err.rule_id(), "r");

    let err = transformer.transform("missing", b"{}").unwrap_err();
    assert_eq!(err.class(), FailureClass::TransformFailure);
    assert!(!err.class().is_retryable());
}

#[test]
fn test_compile_failure_aborts_construction() {
    let rules = [rule("good", "{}"), rule("bad", "{{ nope .x }}")];
    match Transformer::new(&rules, CountingRecorder::new()) {
        Err(TransformError::TemplateCompile { rule_id, .. }) => assert_eq!(rule_id, "bad"),
        _ => panic!("Expected TemplateCompile"),
    }
}

#[test]
fn test_concurrent_transforms_do_not_cross_talk() {
    let rules = [
        rule("a", r#"{"rule":"a","v":{{num .v}}}"#),
        rule("b", r#"{"rule":"b","name":"{{.name}}","ok":{{bool .ok}}}"#),
    ];
    let transformer = Arc::new(Transformer::new(&rules, CountingRecorder::new()).unwrap());

    thread::scope(|scope| {
        for worker in 0..8 {
            let transformer = Arc::clone(&transformer);
            scope.spawn(move || {
                for i in 0..200 {
                    let n = worker * 1000 + i;
                    let out = transformer
                        .transform("a", format!(r#"{{"v":{n}}}"#).as_bytes())
                        .unwrap();
                    assert_eq!(out, format!(r#"{{"rule":"a","v":{n}}}"#).into_bytes());

                    let name = "x".repeat(i % 17);
                    let out = transformer
                        .transform("b", format!(r#"{{"name":"{name}","ok":true}}"#).as_bytes())
                        .unwrap();
                    assert_eq!(
                        out,
                        format!(r#"{{"rule":"b","name":"{name}","ok":true}}"#).into_bytes()
                    );
                }
            });
        }

        // Registry churn alongside the readers
        scope.spawn(|| {
            for i in 0..100 {
                let id = format!("extra-{i}");
                transformer.add_template(&id, "{}").unwrap();
                transformer.remove_template(&id);
            }
        });
    });

    assert_eq!(transformer.active_rules(), 2);
}
