#![allow(dead_code)]

use std::sync::Arc;

use config_notify::ConfigChangeResult;
use config_notify::Dn;
use config_notify::EngineConfig;
use config_notify::Entry;
use config_notify::InMemoryConfigRepository;
use config_notify::ManagedObjectDefinition;
use config_notify::PropertyDefinition;
use config_notify::PropertyKind;
use config_notify::Rdn;
use config_notify::RelationDefinition;
use config_notify::ServerManagedObject;
use config_notify::ServerManagedObjectAddListener;
use config_notify::ServerManagedObjectChangeListener;
use config_notify::ServerManagedObjectDeleteListener;
use config_notify::ServerManagementContext;
use config_notify::UnacceptableReasons;
use parking_lot::Mutex;

pub fn dn(value: &str) -> Dn {
    Dn::parse(value).expect("valid DN")
}

/// A server with a worker pool:
///
/// ```text
/// cn=config
///   cn=global            default-timeout
///   cn=pool
///     cn=<worker>        enabled, timeout (inherits default-timeout)
/// ```
pub struct Server {
    pub repository: Arc<InMemoryConfigRepository>,
    pub context: ServerManagementContext,
    pub workers: Arc<RelationDefinition>,
    pub global: Arc<RelationDefinition>,
}

impl Server {
    pub fn start() -> Self {
        let global_definition = ManagedObjectDefinition::builder("global")
            .property(PropertyDefinition::new("default-timeout", PropertyKind::Duration).with_default(["30s"]))
            .build();
        let worker = ManagedObjectDefinition::builder("worker")
            .property(PropertyDefinition::new("enabled", PropertyKind::Boolean).mandatory())
            .property(
                PropertyDefinition::new("timeout", PropertyKind::Duration)
                    .inherited_from(dn("cn=global,cn=config"), "default-timeout"),
            )
            .build();
        let global = Arc::new(RelationDefinition::singleton("global", global_definition));
        let workers =
            Arc::new(RelationDefinition::instantiable("workers", worker).with_container(Rdn::new("cn", "pool")));
        let root = ManagedObjectDefinition::builder("root")
            .relation(global.clone())
            .relation(workers.clone())
            .build();

        let config = EngineConfig::default().validate().expect("default settings are valid");
        let repository = Arc::new(InMemoryConfigRepository::new(&config.repository));
        repository.bootstrap([
            Entry::new(dn("cn=config")).with_object_class("root"),
            global_entry("10s"),
        ]);
        let context = ServerManagementContext::new(&repository, root, &config).expect("context");
        Self {
            repository,
            context,
            workers,
            global,
        }
    }

    pub fn root(&self) -> Arc<ServerManagedObject> {
        self.context.root_managed_object().expect("root managed object")
    }
}

pub fn global_entry(default_timeout: &str) -> Entry {
    Entry::new(dn("cn=global,cn=config"))
        .with_object_class("global")
        .with_attribute("default-timeout", default_timeout)
}

pub fn pool_entry() -> Entry {
    Entry::new(dn("cn=pool,cn=config")).with_object_class("container")
}

pub fn worker_entry(
    name: &str,
    enabled: bool,
) -> Entry {
    Entry::new(dn(&format!("cn={name},cn=pool,cn=config")))
        .with_object_class("worker")
        .with_attribute("enabled", enabled.to_string())
}

/// Records every managed object it is shown, refusing disabled workers.
#[derive(Default)]
pub struct WorkerWatcher {
    pub accepted: Mutex<Vec<Arc<ServerManagedObject>>>,
    pub applied: Mutex<Vec<Arc<ServerManagedObject>>>,
}

impl WorkerWatcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn applied_paths(&self) -> Vec<String> {
        self.applied.lock().iter().map(|m| m.path().to_string()).collect()
    }

    fn accept(
        &self,
        managed_object: &Arc<ServerManagedObject>,
        reasons: &mut UnacceptableReasons,
    ) -> bool {
        self.accepted.lock().push(managed_object.clone());
        let enabled = managed_object
            .definition()
            .property("enabled")
            .and_then(|p| managed_object.get_property_value(p).ok().flatten())
            .and_then(|v| v.as_bool());
        if enabled == Some(false) {
            reasons.push(format!("{} is disabled", managed_object.path()));
            return false;
        }
        true
    }

    fn apply(
        &self,
        managed_object: &Arc<ServerManagedObject>,
    ) -> ConfigChangeResult {
        self.applied.lock().push(managed_object.clone());
        ConfigChangeResult::new()
    }
}

impl ServerManagedObjectAddListener for WorkerWatcher {
    fn is_configuration_add_acceptable(
        &self,
        managed_object: &Arc<ServerManagedObject>,
        reasons: &mut UnacceptableReasons,
    ) -> bool {
        self.accept(managed_object, reasons)
    }

    fn apply_configuration_add(
        &self,
        managed_object: &Arc<ServerManagedObject>,
    ) -> ConfigChangeResult {
        self.apply(managed_object)
    }
}

impl ServerManagedObjectDeleteListener for WorkerWatcher {
    fn is_configuration_delete_acceptable(
        &self,
        managed_object: &Arc<ServerManagedObject>,
        _reasons: &mut UnacceptableReasons,
    ) -> bool {
        self.accepted.lock().push(managed_object.clone());
        true
    }

    fn apply_configuration_delete(
        &self,
        managed_object: &Arc<ServerManagedObject>,
    ) -> ConfigChangeResult {
        self.apply(managed_object)
    }
}

impl ServerManagedObjectChangeListener for WorkerWatcher {
    fn is_configuration_change_acceptable(
        &self,
        managed_object: &Arc<ServerManagedObject>,
        reasons: &mut UnacceptableReasons,
    ) -> bool {
        self.accept(managed_object, reasons)
    }

    fn apply_configuration_change(
        &self,
        managed_object: &Arc<ServerManagedObject>,
    ) -> ConfigChangeResult {
        self.apply(managed_object)
    }
}
