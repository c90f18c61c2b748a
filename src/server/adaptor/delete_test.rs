use std::sync::Arc;

use super::*;
use crate::constraint::MockServerConstraintHandler;
use crate::server::listener::ListenerKey;
use crate::server::listener::ListenerLevel;
use crate::test_utils::log_entry;
use crate::test_utils::worker_entry;
use crate::test_utils::Fixture;
use crate::test_utils::RecordingListener;
use crate::test_utils::TestModel;
use crate::ConfigChangeResult;
use crate::ConfigDeleteListener;
use crate::Constraint;
use crate::ManagedObjectPath;
use crate::MockServerManagedObjectDeleteListener;
use crate::RelationDefinition;
use crate::ResultCode;
use crate::ServerManagedObjectDeleteListener;
use crate::UnacceptableReasons;

fn adaptor(
    fixture: &Fixture,
    relation: &Arc<RelationDefinition>,
    listener: Arc<dyn ServerManagedObjectDeleteListener>,
) -> ConfigDeleteListenerAdaptor {
    let key = ListenerKey::of(&listener, ListenerLevel::Object);
    ConfigDeleteListenerAdaptor::new(
        fixture.context.clone(),
        ManagedObjectPath::empty(),
        relation.clone(),
        listener,
        key,
    )
    .unwrap()
}

#[test]
fn delete_is_forwarded_with_the_decoded_object() {
    let fixture = Fixture::new();
    let listener = RecordingListener::new();
    let adaptor = adaptor(&fixture, &fixture.model.workers, listener.clone());
    let entry = worker_entry("w1", false);
    let mut reasons = UnacceptableReasons::new();

    assert!(adaptor.config_delete_is_acceptable(&entry, &mut reasons));
    assert!(adaptor.apply_configuration_delete(&entry).is_success());

    let applied = listener.applied();
    assert_eq!(applied.len(), 1);
    assert_eq!(applied[0].path().name(), Some("w1"));
    assert!(!applied[0].configuration::<crate::test_utils::WorkerCfg>().enabled());
}

#[test]
fn delete_constraint_refusal_skips_the_listener() {
    let mut handler = MockServerConstraintHandler::new();
    handler.expect_is_delete_allowed().returning(|_, reasons| {
        reasons.push("worker is referenced by cn=userRoot".to_string());
        Ok(false)
    });
    let model = TestModel::with_worker_constraints(vec![Constraint::new("references").with_handler(Arc::new(handler))]);
    let fixture = Fixture::with_model(model);
    let mut listener = MockServerManagedObjectDeleteListener::new();
    listener.expect_is_configuration_delete_acceptable().never();
    let adaptor = adaptor(&fixture, &fixture.model.workers, Arc::new(listener));
    let mut reasons = UnacceptableReasons::new();

    assert!(!adaptor.config_delete_is_acceptable(&worker_entry("w1", true), &mut reasons));
    assert_eq!(reasons.to_string(), "worker is referenced by cn=userRoot");
}

#[test]
fn post_delete_runs_after_a_successful_apply() {
    let mut handler = MockServerConstraintHandler::new();
    handler.expect_is_delete_allowed().returning(|_, _| Ok(true));
    handler.expect_perform_post_delete().times(1).returning(|_| Ok(()));
    let model = TestModel::with_worker_constraints(vec![Constraint::new("audit").with_handler(Arc::new(handler))]);
    let fixture = Fixture::with_model(model);
    let adaptor = adaptor(&fixture, &fixture.model.workers, RecordingListener::new());
    let entry = worker_entry("w1", true);
    let mut reasons = UnacceptableReasons::new();

    assert!(adaptor.config_delete_is_acceptable(&entry, &mut reasons));
    assert!(adaptor.apply_configuration_delete(&entry).is_success());
}

#[test]
fn apply_without_accept_is_an_operations_error() {
    let fixture = Fixture::new();
    let adaptor = adaptor(&fixture, &fixture.model.workers, RecordingListener::new());

    let result = adaptor.apply_configuration_delete(&worker_entry("w1", true));

    assert_eq!(result.result_code(), ResultCode::OperationsError);
    assert!(result.messages()[0].contains("deletion of configuration entry cn=w1,cn=pool,cn=config"));
}

#[test]
fn optional_relation_ignores_other_children_of_the_parent() {
    let fixture = Fixture::new();
    let mut listener = MockServerManagedObjectDeleteListener::new();
    listener.expect_is_configuration_delete_acceptable().never();
    listener.expect_apply_configuration_delete().never();
    let adaptor = adaptor(&fixture, &fixture.model.error_log, Arc::new(listener));
    let sibling = log_entry("access-log", true);
    let mut reasons = UnacceptableReasons::new();

    assert!(adaptor.config_delete_is_acceptable(&sibling, &mut reasons));
    assert_eq!(adaptor.apply_configuration_delete(&sibling), ConfigChangeResult::new());
}

#[test]
fn delete_through_the_repository_reaches_the_listener() {
    let fixture = Fixture::new();
    fixture
        .repository
        .bootstrap([crate::test_utils::pool_entry(), worker_entry("w1", true)]);
    let listener = RecordingListener::new();
    fixture
        .root()
        .register_object_delete_listener(&fixture.model.workers, listener.clone())
        .unwrap();

    fixture
        .repository
        .delete_entry(&crate::test_utils::dn("cn=w1,cn=pool,cn=config"))
        .unwrap();

    assert_eq!(listener.applied().len(), 1);
}
