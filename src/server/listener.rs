//! Listener abstractions at the two levels callers can write against.
//!
//! Data-level listeners see a typed configuration view `C`. Object-level
//! listeners see the whole [`ServerManagedObject`] and can navigate the tree
//! from it. The bridges below let a data-level listener be registered wherever
//! an object-level one is expected.

use std::sync::Arc;

#[cfg(test)]
use mockall::automock;

use super::ServerManagedObject;
use crate::ConfigChangeResult;
use crate::UnacceptableReasons;

/// Typed view of a managed object.
pub trait Configuration: Send + Sync + Sized + 'static {
    fn from_managed_object(managed_object: Arc<ServerManagedObject>) -> Self;
}

pub trait ConfigurationAddListener<C>: Send + Sync {
    fn is_configuration_add_acceptable(
        &self,
        configuration: &C,
        reasons: &mut UnacceptableReasons,
    ) -> bool;

    fn apply_configuration_add(
        &self,
        configuration: &C,
    ) -> ConfigChangeResult;
}

pub trait ConfigurationDeleteListener<C>: Send + Sync {
    fn is_configuration_delete_acceptable(
        &self,
        configuration: &C,
        reasons: &mut UnacceptableReasons,
    ) -> bool;

    fn apply_configuration_delete(
        &self,
        configuration: &C,
    ) -> ConfigChangeResult;
}

pub trait ConfigurationChangeListener<C>: Send + Sync {
    fn is_configuration_change_acceptable(
        &self,
        configuration: &C,
        reasons: &mut UnacceptableReasons,
    ) -> bool;

    fn apply_configuration_change(
        &self,
        configuration: &C,
    ) -> ConfigChangeResult;
}

#[cfg_attr(test, automock)]
pub trait ServerManagedObjectAddListener: Send + Sync {
    fn is_configuration_add_acceptable(
        &self,
        managed_object: &Arc<ServerManagedObject>,
        reasons: &mut UnacceptableReasons,
    ) -> bool;

    fn apply_configuration_add(
        &self,
        managed_object: &Arc<ServerManagedObject>,
    ) -> ConfigChangeResult;
}

#[cfg_attr(test, automock)]
pub trait ServerManagedObjectDeleteListener: Send + Sync {
    fn is_configuration_delete_acceptable(
        &self,
        managed_object: &Arc<ServerManagedObject>,
        reasons: &mut UnacceptableReasons,
    ) -> bool;

    fn apply_configuration_delete(
        &self,
        managed_object: &Arc<ServerManagedObject>,
    ) -> ConfigChangeResult;
}

#[cfg_attr(test, automock)]
pub trait ServerManagedObjectChangeListener: Send + Sync {
    fn is_configuration_change_acceptable(
        &self,
        managed_object: &Arc<ServerManagedObject>,
        reasons: &mut UnacceptableReasons,
    ) -> bool;

    fn apply_configuration_change(
        &self,
        managed_object: &Arc<ServerManagedObject>,
    ) -> ConfigChangeResult;
}

pub struct ConfigurationAddListenerBridge<C> {
    listener: Arc<dyn ConfigurationAddListener<C>>,
}

impl<C> ConfigurationAddListenerBridge<C> {
    pub fn new(listener: Arc<dyn ConfigurationAddListener<C>>) -> Self {
        Self { listener }
    }
}

impl<C: Configuration> ServerManagedObjectAddListener for ConfigurationAddListenerBridge<C> {
    fn is_configuration_add_acceptable(
        &self,
        managed_object: &Arc<ServerManagedObject>,
        reasons: &mut UnacceptableReasons,
    ) -> bool {
        self.listener
            .is_configuration_add_acceptable(&managed_object.configuration::<C>(), reasons)
    }

    fn apply_configuration_add(
        &self,
        managed_object: &Arc<ServerManagedObject>,
    ) -> ConfigChangeResult {
        self.listener.apply_configuration_add(&managed_object.configuration::<C>())
    }
}

pub struct ConfigurationDeleteListenerBridge<C> {
    listener: Arc<dyn ConfigurationDeleteListener<C>>,
}

impl<C> ConfigurationDeleteListenerBridge<C> {
    pub fn new(listener: Arc<dyn ConfigurationDeleteListener<C>>) -> Self {
        Self { listener }
    }
}

impl<C: Configuration> ServerManagedObjectDeleteListener for ConfigurationDeleteListenerBridge<C> {
    fn is_configuration_delete_acceptable(
        &self,
        managed_object: &Arc<ServerManagedObject>,
        reasons: &mut UnacceptableReasons,
    ) -> bool {
        self.listener
            .is_configuration_delete_acceptable(&managed_object.configuration::<C>(), reasons)
    }

    fn apply_configuration_delete(
        &self,
        managed_object: &Arc<ServerManagedObject>,
    ) -> ConfigChangeResult {
        self.listener
            .apply_configuration_delete(&managed_object.configuration::<C>())
    }
}

pub struct ConfigurationChangeListenerBridge<C> {
    listener: Arc<dyn ConfigurationChangeListener<C>>,
}

impl<C> ConfigurationChangeListenerBridge<C> {
    pub fn new(listener: Arc<dyn ConfigurationChangeListener<C>>) -> Self {
        Self { listener }
    }
}

impl<C: Configuration> ServerManagedObjectChangeListener for ConfigurationChangeListenerBridge<C> {
    fn is_configuration_change_acceptable(
        &self,
        managed_object: &Arc<ServerManagedObject>,
        reasons: &mut UnacceptableReasons,
    ) -> bool {
        self.listener
            .is_configuration_change_acceptable(&managed_object.configuration::<C>(), reasons)
    }

    fn apply_configuration_change(
        &self,
        managed_object: &Arc<ServerManagedObject>,
    ) -> ConfigChangeResult {
        self.listener
            .apply_configuration_change(&managed_object.configuration::<C>())
    }
}

/// Level a listener was registered at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ListenerLevel {
    Data,
    Object,
}

/// Identity of a caller's listener, used to find its adaptor again on deregistration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ListenerKey {
    address: usize,
    level: ListenerLevel,
}

impl ListenerKey {
    pub(crate) fn of<T: ?Sized>(
        listener: &Arc<T>,
        level: ListenerLevel,
    ) -> Self {
        Self {
            address: Arc::as_ptr(listener) as *const () as usize,
            level,
        }
    }
}
