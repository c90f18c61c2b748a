mod common;

use std::sync::Arc;

use common::dn;
use common::pool_entry;
use common::worker_entry;
use common::Server;
use common::WorkerWatcher;
use config_notify::AddListenerSlot;
use config_notify::ConfigurationRepository;
use config_notify::Error;
use config_notify::LinkState;
use config_notify::RepositoryError;
use config_notify::ServerManagedObjectAddListener;

#[test]
fn add_listener_waits_for_the_missing_container() {
    let server = Server::start();
    let watcher = WorkerWatcher::new();

    server
        .root()
        .register_object_add_listener(&server.workers, watcher.clone())
        .unwrap();

    let at_root = server.repository.get_add_listeners(&dn("cn=config"));
    assert_eq!(at_root.len(), 1);
    let link = match &at_root[0] {
        AddListenerSlot::Delayed(link) => link.clone(),
        other => panic!("expected a delayed listener, found {other:?}"),
    };
    assert_eq!(link.child_dn(), &dn("cn=pool,cn=config"));
    assert!(server.repository.get_add_listeners(&dn("cn=pool,cn=config")).is_empty());

    server.repository.add_entry(pool_entry()).unwrap();

    assert_eq!(link.state(), LinkState::Fired);
    assert!(server.repository.get_add_listeners(&dn("cn=config")).is_empty());
    let at_pool = server.repository.get_add_listeners(&dn("cn=pool,cn=config"));
    assert_eq!(at_pool.len(), 1);
    assert!(matches!(at_pool[0], AddListenerSlot::Adaptor(_)));

    let result = server.repository.add_entry(worker_entry("worker-1", true)).unwrap();

    assert!(result.is_success());
    assert_eq!(watcher.accepted.lock().len(), 1);
    assert_eq!(watcher.applied_paths(), ["/workers[worker-1]".to_string()]);
}

#[test]
fn waiting_listener_can_still_refuse_once_installed() {
    let server = Server::start();
    let watcher = WorkerWatcher::new();
    server
        .root()
        .register_object_add_listener(&server.workers, watcher.clone())
        .unwrap();
    server.repository.add_entry(pool_entry()).unwrap();

    let err = server.repository.add_entry(worker_entry("worker-2", false)).unwrap_err();

    assert!(matches!(
        err,
        Error::Repository(RepositoryError::Rejected { operation: "added", .. })
    ));
    assert!(err.to_string().contains("/workers[worker-2] is disabled"));
    assert!(!server.repository.has_entry(&dn("cn=worker-2,cn=pool,cn=config")).unwrap());
    assert!(watcher.applied.lock().is_empty());
}

#[test]
fn deregistering_a_waiting_listener_is_idempotent() {
    let server = Server::start();
    let watcher = WorkerWatcher::new();
    let listener: Arc<dyn ServerManagedObjectAddListener> = watcher.clone();
    let root = server.root();
    root.register_object_add_listener(&server.workers, listener.clone())
        .unwrap();
    let link = match &server.repository.get_add_listeners(&dn("cn=config"))[0] {
        AddListenerSlot::Delayed(link) => link.clone(),
        other => panic!("expected a delayed listener, found {other:?}"),
    };

    root.deregister_object_add_listener(&server.workers, &listener).unwrap();
    root.deregister_object_add_listener(&server.workers, &listener).unwrap();

    assert_eq!(link.state(), LinkState::Cancelled);
    assert!(server.repository.get_add_listeners(&dn("cn=config")).is_empty());

    server.repository.add_entry(pool_entry()).unwrap();
    server.repository.add_entry(worker_entry("worker-1", true)).unwrap();

    assert!(server.repository.get_add_listeners(&dn("cn=pool,cn=config")).is_empty());
    assert!(watcher.accepted.lock().is_empty());
}

#[test]
fn existing_container_installs_the_listener_directly() {
    let server = Server::start();
    server.repository.add_entry(pool_entry()).unwrap();
    let watcher = WorkerWatcher::new();

    server
        .root()
        .register_object_add_listener(&server.workers, watcher.clone())
        .unwrap();

    assert!(server.repository.get_add_listeners(&dn("cn=config")).is_empty());
    assert_eq!(server.repository.get_add_listeners(&dn("cn=pool,cn=config")).len(), 1);
}
