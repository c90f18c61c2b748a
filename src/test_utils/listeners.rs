use std::sync::Arc;

use parking_lot::Mutex;

use crate::ConfigChangeResult;
use crate::Configuration;
use crate::ConfigurationAddListener;
use crate::ConfigurationChangeListener;
use crate::ConfigurationDeleteListener;
use crate::Dn;
use crate::ResultCode;
use crate::ServerManagedObject;
use crate::ServerManagedObjectAddListener;
use crate::ServerManagedObjectChangeListener;
use crate::ServerManagedObjectDeleteListener;
use crate::UnacceptableReasons;

/// Object-level listener for every mutation kind that records the objects it sees.
#[derive(Default)]
pub struct RecordingListener {
    rejection: Option<String>,
    apply_failure: Option<String>,
    accepted: Mutex<Vec<Arc<ServerManagedObject>>>,
    applied: Mutex<Vec<Arc<ServerManagedObject>>>,
}

impl RecordingListener {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A listener refusing every mutation with `reason`.
    pub fn rejecting(reason: &str) -> Arc<Self> {
        Arc::new(Self {
            rejection: Some(reason.to_string()),
            ..Default::default()
        })
    }

    /// A listener accepting everything but failing every apply with `message`.
    pub fn failing_apply(message: &str) -> Arc<Self> {
        Arc::new(Self {
            apply_failure: Some(message.to_string()),
            ..Default::default()
        })
    }

    pub fn accepted(&self) -> Vec<Arc<ServerManagedObject>> {
        self.accepted.lock().clone()
    }

    pub fn applied(&self) -> Vec<Arc<ServerManagedObject>> {
        self.applied.lock().clone()
    }

    pub fn applied_dns(&self) -> Vec<Option<Dn>> {
        self.applied.lock().iter().map(|m| m.dn()).collect()
    }

    fn accept(
        &self,
        managed_object: &Arc<ServerManagedObject>,
        reasons: &mut UnacceptableReasons,
    ) -> bool {
        self.accepted.lock().push(managed_object.clone());
        match &self.rejection {
            Some(reason) => {
                reasons.push(reason.clone());
                false
            }
            None => true,
        }
    }

    fn apply(
        &self,
        managed_object: &Arc<ServerManagedObject>,
    ) -> ConfigChangeResult {
        self.applied.lock().push(managed_object.clone());
        match &self.apply_failure {
            Some(message) => ConfigChangeResult::failure(ResultCode::Other, message.clone()),
            None => ConfigChangeResult::new(),
        }
    }
}

impl ServerManagedObjectAddListener for RecordingListener {
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

impl ServerManagedObjectDeleteListener for RecordingListener {
    fn is_configuration_delete_acceptable(
        &self,
        managed_object: &Arc<ServerManagedObject>,
        reasons: &mut UnacceptableReasons,
    ) -> bool {
        self.accept(managed_object, reasons)
    }

    fn apply_configuration_delete(
        &self,
        managed_object: &Arc<ServerManagedObject>,
    ) -> ConfigChangeResult {
        self.apply(managed_object)
    }
}

impl ServerManagedObjectChangeListener for RecordingListener {
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

/// Typed view of a worker, as a server component would define it.
pub struct WorkerCfg {
    managed_object: Arc<ServerManagedObject>,
}

impl WorkerCfg {
    pub fn name(&self) -> Option<String> {
        self.managed_object.path().name().map(str::to_string)
    }

    pub fn dn(&self) -> Option<Dn> {
        self.managed_object.dn()
    }

    pub fn enabled(&self) -> bool {
        self.managed_object
            .definition()
            .property("enabled")
            .and_then(|p| self.managed_object.get_property_value(p).ok().flatten())
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }
}

impl Configuration for WorkerCfg {
    fn from_managed_object(managed_object: Arc<ServerManagedObject>) -> Self {
        Self { managed_object }
    }
}

/// Data-level worker listener refusing disabled workers.
#[derive(Default)]
pub struct EnabledWorkersOnly {
    pub applied: Mutex<Vec<String>>,
}

impl EnabledWorkersOnly {
    fn check(
        &self,
        configuration: &WorkerCfg,
        reasons: &mut UnacceptableReasons,
    ) -> bool {
        if configuration.enabled() {
            true
        } else {
            reasons.push(format!("worker {} is disabled", configuration.name().unwrap_or_default()));
            false
        }
    }

    fn record(
        &self,
        configuration: &WorkerCfg,
    ) -> ConfigChangeResult {
        self.applied.lock().push(configuration.name().unwrap_or_default());
        ConfigChangeResult::new()
    }
}

impl ConfigurationAddListener<WorkerCfg> for EnabledWorkersOnly {
    fn is_configuration_add_acceptable(
        &self,
        configuration: &WorkerCfg,
        reasons: &mut UnacceptableReasons,
    ) -> bool {
        self.check(configuration, reasons)
    }

    fn apply_configuration_add(
        &self,
        configuration: &WorkerCfg,
    ) -> ConfigChangeResult {
        self.record(configuration)
    }
}

impl ConfigurationDeleteListener<WorkerCfg> for EnabledWorkersOnly {
    fn is_configuration_delete_acceptable(
        &self,
        _configuration: &WorkerCfg,
        _reasons: &mut UnacceptableReasons,
    ) -> bool {
        true
    }

    fn apply_configuration_delete(
        &self,
        configuration: &WorkerCfg,
    ) -> ConfigChangeResult {
        self.record(configuration)
    }
}

impl ConfigurationChangeListener<WorkerCfg> for EnabledWorkersOnly {
    fn is_configuration_change_acceptable(
        &self,
        configuration: &WorkerCfg,
        reasons: &mut UnacceptableReasons,
    ) -> bool {
        self.check(configuration, reasons)
    }

    fn apply_configuration_change(
        &self,
        configuration: &WorkerCfg,
    ) -> ConfigChangeResult {
        self.record(configuration)
    }
}
