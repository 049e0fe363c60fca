use std::sync::Arc;

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use tripwire_core::{Severity, Value, ValueMap};
use tripwire_rules::nodes::{CompareNode, ExitNode, RuleInputsNode, StaticValueNode};
use tripwire_rules::{
    ExecutionContext, Rule, RuleGraph, RuleSet, RuleSetEntry, RuleStage, StageInput, run,
};

fn options(pairs: &[(&str, Value)]) -> ValueMap {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), v.clone()))
        .collect()
}

/// amount > threshold
fn threshold_rule(id: &str, threshold: i32) -> Rule {
    Rule::new(
        id,
        id,
        vec![
            RuleStage::new(
                "inputs",
                Arc::new(RuleInputsNode),
                options(&[("fields", "amount:NUMBER, country:STRING".into())]),
                Vec::new(),
            ),
            RuleStage::new(
                "threshold",
                Arc::new(StaticValueNode),
                options(&[("valueType", "NUMBER".into()), ("value", threshold.into())]),
                Vec::new(),
            ),
            RuleStage::new(
                "compare",
                Arc::new(CompareNode::numbers()),
                options(&[("operator", "GT".into())]),
                vec![
                    StageInput::new("inputs", "amount", "a"),
                    StageInput::new("threshold", "value", "b"),
                ],
            ),
            RuleStage::new(
                "exit",
                Arc::new(ExitNode),
                ValueMap::new(),
                vec![StageInput::new("compare", "result", "result")],
            ),
        ],
    )
    .expect("valid rule")
}

fn bench_single_rule(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("failed to create tokio runtime");
    let rule = threshold_rule("large", 1000);
    let ctx = ExecutionContext::new(Arc::new(RuleGraph::default()));
    let inputs = options(&[("amount", 1500.into()), ("country", "FR".into())]);

    c.bench_function("execute_single_rule", |b| {
        b.to_async(&rt).iter(|| async {
            let result = run(&rule, inputs.clone(), &ctx).await.expect("rule runs");
            black_box(result.outputs.triggered)
        });
    });
}

fn bench_rule_set(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().expect("failed to create tokio runtime");
    let severities = [Severity::Low, Severity::Medium, Severity::High, Severity::Critical];
    let rules = (0..16)
        .map(|i| threshold_rule(&format!("rule-{i}"), i * 100))
        .collect();
    let set = RuleSet::new(
        "all",
        "All",
        (0..16)
            .map(|i| RuleSetEntry::new(format!("rule-{i}"), severities[i % severities.len()]))
            .collect(),
    );
    let graph = RuleGraph::new(rules, Vec::new()).expect("valid graph");
    let ctx = ExecutionContext::new(Arc::new(graph));
    let inputs = options(&[("amount", 750.into()), ("country", "FR".into())]);

    c.bench_function("execute_rule_set_16", |b| {
        b.to_async(&rt).iter(|| async {
            let result = run(&set, inputs.clone(), &ctx).await.expect("rule set runs");
            black_box(result.outputs.severity)
        });
    });
}

criterion_group!(benches, bench_single_rule, bench_rule_set);
criterion_main!(benches);
