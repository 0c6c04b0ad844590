use std::sync::Arc;
use stratus::schemas::{kubernetes_cluster, SchemaRegistry};
use stratus::wizard::{
    ConfigurationDraft, DependencyGraph, DependencyResolver, FieldRule, FieldSpec, Step, WizardError,
    WizardSchema, WizardStateMachine,
};

fn edges(list: &[(&str, &[&str])]) -> Vec<(String, Vec<String>)> {
    list.iter()
        .map(|(s, ds)| (s.to_string(), ds.iter().map(|d| d.to_string()).collect()))
        .collect()
}

#[test]
fn test_changing_source_clears_every_reachable_dependent() {
    let registry = SchemaRegistry::builtin().unwrap();
    for schema in registry.iter() {
        let resolver = DependencyResolver::new(&schema.dependencies);
        for source in schema.fields.iter().map(|f| f.name.as_str()) {
            let mut draft = ConfigurationDraft::new();
            for f in &schema.fields {
                draft.set(&f.name, "x");
            }
            let (updated, reset) = resolver.on_field_change(source, "y", &draft);
            assert_eq!(updated.get(source), "y");
            for dep in schema.dependencies.transitive_dependents(source) {
                assert!(reset.contains(&dep), "{}: {} -> {}", schema.flow, source, dep);
                assert_eq!(updated.get(&dep), "", "{}: {} should clear {}", schema.flow, source, dep);
            }
            for f in &schema.fields {
                if f.name != source && !reset.contains(&f.name) {
                    assert_eq!(updated.get(&f.name), "x", "{} untouched", f.name);
                }
            }
        }
    }
}

#[test]
fn test_region_change_resets_vpc_and_subnet() {
    let schema = kubernetes_cluster().unwrap();
    let resolver = DependencyResolver::new(&schema.dependencies);
    let mut draft = ConfigurationDraft::new();
    draft.set("region", "ap-south-1");
    draft.set("vpc", "vpc-1");
    draft.set("subnet", "subnet-1");
    draft.set("version", "1.29");

    let (updated, reset) = resolver.on_field_change("region", "us-east-1", &draft);
    assert_eq!(reset, vec!["vpc".to_string(), "subnet".to_string()]);
    assert!(!updated.is_set("vpc"));
    assert!(!updated.is_set("subnet"));
    assert_eq!(updated.get("version"), "1.29");
    // the input draft is left alone
    assert_eq!(draft.get("vpc"), "vpc-1");
}

#[test]
fn test_reset_fires_even_when_value_is_unchanged() {
    let schema = kubernetes_cluster().unwrap();
    let resolver = DependencyResolver::new(&schema.dependencies);
    let mut draft = ConfigurationDraft::new();
    draft.set("region", "ap-south-1");
    draft.set("vpc", "vpc-1");
    let (updated, _) = resolver.on_field_change("region", "ap-south-1", &draft);
    assert!(!updated.is_set("vpc"));
}

#[test]
fn test_cycle_rejected_at_build_time() {
    let err = DependencyGraph::new(edges(&[("a", &["b"]), ("b", &["c"]), ("c", &["a"])])).unwrap_err();
    match err {
        WizardError::DependencyCycle { path } => {
            assert_eq!(path.first(), path.last());
            assert!(path.len() >= 4);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_schema_builder_rejects_cycle() {
    let result = WizardSchema::builder("loop", "Loop")
        .field(FieldSpec::new("a", "A", Step::Configuration))
        .field(FieldSpec::new("b", "B", Step::Configuration))
        .depends("a", &["b"])
        .depends("b", &["a"])
        .build();
    assert!(matches!(result, Err(WizardError::DependencyCycle { .. })));
}

#[test]
fn test_schema_builder_rejects_undeclared_field() {
    let result = WizardSchema::builder("broken", "Broken")
        .field(FieldSpec::new("region", "Region", Step::Configuration).rule(FieldRule::Choice))
        .depends("region", &["zone"])
        .build();
    assert_eq!(result.err(), Some(WizardError::UndeclaredDependency("zone".into())));
}

#[test]
fn test_options_follow_prerequisites() {
    let schema = Arc::new(kubernetes_cluster().unwrap());
    let mut machine = WizardStateMachine::with_id(schema, "w");
    assert!(matches!(
        machine.options_for("vpc"),
        Err(WizardError::DependencyViolation { .. })
    ));

    machine.field_change("region", "eu-west-1").unwrap();
    assert_eq!(machine.options_for("vpc").unwrap(), vec!["vpc-4", "vpc-5"]);
    machine.field_change("vpc", "vpc-5").unwrap();
    assert_eq!(machine.options_for("subnet").unwrap(), vec!["subnet-7", "subnet-8"]);
    assert!(matches!(machine.options_for("nope"), Err(WizardError::UnknownField(_))));
}
