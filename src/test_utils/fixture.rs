use std::sync::Arc;

use super::dn;
use super::TestModel;
use super::BACKENDS_DN;
use super::GLOBAL_DN;
use super::POOL_DN;
use super::ROOT_DN;
use crate::EngineConfig;
use crate::Entry;
use crate::InMemoryConfigRepository;
use crate::ServerManagedObject;
use crate::ServerManagementContext;

pub fn root_entry() -> Entry {
    Entry::new(dn(ROOT_DN)).with_object_class("root")
}

pub fn global_entry(default_timeout: &str) -> Entry {
    Entry::new(dn(GLOBAL_DN))
        .with_object_class("global")
        .with_attribute("default-timeout", default_timeout)
}

pub fn pool_entry() -> Entry {
    Entry::new(dn(POOL_DN)).with_object_class("container")
}

pub fn backends_entry() -> Entry {
    Entry::new(dn(BACKENDS_DN)).with_object_class("container")
}

pub fn worker_entry(
    name: &str,
    enabled: bool,
) -> Entry {
    Entry::new(dn(&format!("cn={name},{POOL_DN}")))
        .with_object_class("worker")
        .with_attribute("enabled", enabled.to_string())
}

pub fn log_entry(
    name: &str,
    enabled: bool,
) -> Entry {
    Entry::new(dn(&format!("cn={name},{ROOT_DN}")))
        .with_object_class("log-publisher")
        .with_attribute("enabled", enabled.to_string())
}

pub fn backend_entry(
    kind: &str,
    backend_id: &str,
) -> Entry {
    Entry::new(dn(&format!("cn={kind},{BACKENDS_DN}")))
        .with_object_class("backend")
        .with_object_class(kind)
        .with_attribute("backend-id", backend_id)
}

/// A repository holding the root and global entries, and a context over it.
pub struct Fixture {
    pub model: Arc<TestModel>,
    pub repository: Arc<InMemoryConfigRepository>,
    pub context: ServerManagementContext,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_model(TestModel::new())
    }

    pub fn with_model(model: Arc<TestModel>) -> Self {
        Self::with_config(model, &EngineConfig::default())
    }

    pub fn with_config(
        model: Arc<TestModel>,
        config: &EngineConfig,
    ) -> Self {
        let repository = Arc::new(InMemoryConfigRepository::new(&config.repository));
        repository.bootstrap([root_entry(), global_entry("10s")]);
        let context = ServerManagementContext::new(&repository, model.root.clone(), config).expect("valid context");
        Self {
            model,
            repository,
            context,
        }
    }

    pub fn root(&self) -> Arc<ServerManagedObject> {
        self.context.root_managed_object().expect("root managed object")
    }
}
