use std::sync::Arc;

use crate::Constraint;
use crate::Dn;
use crate::ManagedObjectDefinition;
use crate::PropertyDefinition;
use crate::PropertyKind;
use crate::Rdn;
use crate::RelationDefinition;

pub const ROOT_DN: &str = "cn=config";
pub const GLOBAL_DN: &str = "cn=global,cn=config";
pub const POOL_DN: &str = "cn=pool,cn=config";
pub const BACKENDS_DN: &str = "cn=backends,cn=config";

pub fn dn(value: &str) -> Dn {
    Dn::parse(value).expect("valid DN")
}

/// Configuration model used across the unit tests.
///
/// ```text
/// root (cn=config)
///   global          singleton    cn=global
///   workers         instantiable cn=<name>,cn=pool      worker | fast-worker
///   access-log      optional     cn=access-log          log-publisher
///   error-log       optional     cn=error-log           log-publisher
///   backends        set          cn=<type>,cn=backends  file-backend | memory-backend
/// ```
pub struct TestModel {
    pub root: Arc<ManagedObjectDefinition>,
    pub global: Arc<ManagedObjectDefinition>,
    pub worker: Arc<ManagedObjectDefinition>,
    pub fast_worker: Arc<ManagedObjectDefinition>,
    pub log_publisher: Arc<ManagedObjectDefinition>,
    pub backend: Arc<ManagedObjectDefinition>,
    pub file_backend: Arc<ManagedObjectDefinition>,
    pub memory_backend: Arc<ManagedObjectDefinition>,

    pub global_relation: Arc<RelationDefinition>,
    pub workers: Arc<RelationDefinition>,
    pub access_log: Arc<RelationDefinition>,
    pub error_log: Arc<RelationDefinition>,
    pub backends: Arc<RelationDefinition>,

    pub enabled: Arc<PropertyDefinition>,
    pub threads: Arc<PropertyDefinition>,
    pub tags: Arc<PropertyDefinition>,
    pub timeout: Arc<PropertyDefinition>,
    pub default_timeout: Arc<PropertyDefinition>,
}

impl TestModel {
    pub fn new() -> Arc<Self> {
        Self::with_worker_constraints(Vec::new())
    }

    /// Model whose worker definition carries `constraints`.
    pub fn with_worker_constraints(constraints: Vec<Constraint>) -> Arc<Self> {
        let global = ManagedObjectDefinition::builder("global")
            .property(PropertyDefinition::new("default-timeout", PropertyKind::Duration).with_default(["30s"]))
            .build();

        let mut worker = ManagedObjectDefinition::builder("worker")
            .property(PropertyDefinition::new("enabled", PropertyKind::Boolean).mandatory())
            .property(PropertyDefinition::new("threads", PropertyKind::Integer).with_default(["4"]))
            .property(PropertyDefinition::new("tags", PropertyKind::String).multi_valued())
            .property(PropertyDefinition::new("timeout", PropertyKind::Duration).inherited_from(dn(GLOBAL_DN), "default-timeout"));
        for constraint in constraints {
            worker = worker.constraint(constraint);
        }
        let worker = worker.build();
        let fast_worker = ManagedObjectDefinition::builder("fast-worker")
            .extends(&worker)
            .property(PropertyDefinition::new("spin", PropertyKind::Boolean).with_default(["false"]))
            .build();

        let log_publisher = ManagedObjectDefinition::builder("log-publisher")
            .property(PropertyDefinition::new("enabled", PropertyKind::Boolean).mandatory())
            .build();

        let backend = ManagedObjectDefinition::builder("backend")
            .abstract_type()
            .property(PropertyDefinition::new("backend-id", PropertyKind::String).mandatory())
            .build();
        let file_backend = ManagedObjectDefinition::builder("file-backend")
            .extends(&backend)
            .property(PropertyDefinition::new("directory", PropertyKind::String).with_default(["db"]))
            .build();
        let memory_backend = ManagedObjectDefinition::builder("memory-backend")
            .extends(&backend)
            .build();

        let global_relation = Arc::new(RelationDefinition::singleton("global", global.clone()));
        let workers = Arc::new(
            RelationDefinition::instantiable("workers", worker.clone())
                .with_container(Rdn::new("cn", "pool"))
                .with_subtypes(vec![fast_worker.clone()]),
        );
        let access_log = Arc::new(RelationDefinition::optional("access-log", log_publisher.clone()));
        let error_log = Arc::new(RelationDefinition::optional("error-log", log_publisher.clone()));
        let backends = Arc::new(
            RelationDefinition::set(
                "backends",
                backend.clone(),
                vec![file_backend.clone(), memory_backend.clone()],
            )
            .with_container(Rdn::new("cn", "backends")),
        );

        let root = ManagedObjectDefinition::builder("root")
            .relation(global_relation.clone())
            .relation(workers.clone())
            .relation(access_log.clone())
            .relation(error_log.clone())
            .relation(backends.clone())
            .build();

        let property = |definition: &Arc<ManagedObjectDefinition>, name: &str| {
            definition.property(name).cloned().expect("declared property")
        };
        Arc::new(Self {
            enabled: property(&worker, "enabled"),
            threads: property(&worker, "threads"),
            tags: property(&worker, "tags"),
            timeout: property(&worker, "timeout"),
            default_timeout: property(&global, "default-timeout"),
            root,
            global,
            worker,
            fast_worker,
            log_publisher,
            backend,
            file_backend,
            memory_backend,
            global_relation,
            workers,
            access_log,
            error_log,
            backends,
        })
    }
}
