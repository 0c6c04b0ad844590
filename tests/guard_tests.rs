use std::sync::Arc;
use stratus::schemas::kubernetes_cluster;
use stratus::wizard::{
    NavigationDecision, NavigationGuard, NavigationIntent, SubmissionError, SubmissionStart, WizardStateMachine,
};

fn submitting_cluster() -> (WizardStateMachine, u64) {
    let mut machine = WizardStateMachine::with_id(Arc::new(kubernetes_cluster().unwrap()), "w");
    for (f, v) in [("region", "us-east-1"), ("vpc", "vpc-3"), ("subnet", "subnet-4"), ("version", "1.30")] {
        machine.field_change(f, v).unwrap();
    }
    machine.advance_step().unwrap();
    let pool = machine.draft().list("node_pools").unwrap().items()[0].id;
    machine.update_item_field("node_pools", pool, "name", "main").unwrap();
    match machine.begin_submission().unwrap() {
        SubmissionStart::Started(ticket) => (machine, ticket.attempt),
        other => panic!("unexpected: {other:?}"),
    }
}

fn link(path: &str) -> NavigationIntent {
    NavigationIntent::Link(path.to_string())
}

#[test]
fn test_guard_idle_until_creation_starts() {
    let mut guard = NavigationGuard::new("/kubernetes");
    guard.observe(false);
    assert_eq!(guard.request(link("/volumes")), NavigationDecision::Proceed(link("/volumes")));
    assert!(guard.pending().is_none());
}

#[test]
fn test_repeated_stay_never_touches_the_wizard() {
    let (machine, _) = submitting_cluster();
    let mut guard = NavigationGuard::new(machine.schema().section.clone());
    guard.observe(machine.is_creation_started());
    let draft = machine.draft().clone();
    let step = machine.step();

    for _ in 0..5 {
        assert_eq!(guard.request(link("/volumes")), NavigationDecision::Confirm(link("/volumes")));
        guard.stay();
        guard.observe(machine.is_creation_started());
        assert!(guard.is_armed());
        assert!(guard.pending().is_none());
    }
    assert_eq!(machine.draft(), &draft);
    assert_eq!(machine.step(), step);
}

#[test]
fn test_leave_anyway_runs_exactly_one_navigation() {
    let (machine, _) = submitting_cluster();
    let mut guard = NavigationGuard::new(machine.schema().section.clone());
    guard.observe(true);

    guard.request(link("/volumes"));
    guard.request(link("/resources"));
    assert_eq!(guard.leave_anyway(), Some(link("/resources")));
    assert_eq!(guard.leave_anyway(), None);
    assert!(!guard.is_armed());

    // still submitting, but the user already chose to leave
    guard.observe(machine.is_creation_started());
    assert!(!guard.is_armed());
    assert_eq!(guard.request(link("/volumes")), NavigationDecision::Proceed(link("/volumes")));
}

#[test]
fn test_guard_rearms_for_next_creation() {
    let (mut machine, attempt) = submitting_cluster();
    let mut guard = NavigationGuard::new(machine.schema().section.clone());
    guard.observe(machine.is_creation_started());
    guard.request(NavigationIntent::HistoryBack);
    guard.leave_anyway();

    machine
        .complete_submission(attempt, Err(SubmissionError::Transport("reset".into())))
        .unwrap();
    guard.observe(machine.is_creation_started());
    assert!(!guard.is_armed());

    match machine.begin_submission().unwrap() {
        SubmissionStart::Started(_) => {}
        other => panic!("unexpected: {other:?}"),
    }
    guard.observe(machine.is_creation_started());
    assert!(guard.is_armed());
}

#[test]
fn test_in_flow_navigation_is_not_guarded() {
    let mut guard = NavigationGuard::new("/kubernetes");
    guard.observe(true);
    for intent in [
        NavigationIntent::Anchor("#node-pools".into()),
        NavigationIntent::StepBack,
        link("/kubernetes/new?region=us-east-1"),
        link("/kubernetes"),
    ] {
        assert_eq!(guard.request(intent.clone()), NavigationDecision::Proceed(intent));
    }
    assert!(guard.pending().is_none());
}

#[test]
fn test_history_and_unload_are_guarded() {
    let mut guard = NavigationGuard::new("/kubernetes");
    guard.observe(true);
    assert_eq!(
        guard.request(NavigationIntent::HistoryForward),
        NavigationDecision::Confirm(NavigationIntent::HistoryForward)
    );
    guard.stay();
    assert_eq!(guard.request(NavigationIntent::Unload), NavigationDecision::NativePrompt);
    assert!(guard.pending().is_none());
    assert!(guard.should_intercept(&link("/kubernetes-old")));
}
