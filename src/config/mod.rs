//! Engine settings.
//!
//! Loaded hierarchically:
//! - Default values as code base
//! - Configuration file named by `CONFIG_PATH`
//! - Environment variables prefixed `NOTIFY__`
mod naming;
mod registration;
mod repository;
pub use naming::*;
pub use registration::*;
pub use repository::*;


use std::env;
use std::fmt::Debug;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

/// Settings of the notification engine.
#[derive(Serialize, Deserialize, Clone, Default, Debug)]
pub struct EngineConfig {
    /// How managed object paths map onto entry DNs
    #[serde(default)]
    pub naming: NamingConfig,
    /// Listener registration limits
    #[serde(default)]
    pub registration: RegistrationConfig,
    /// Behaviour of the in-memory repository
    #[serde(default)]
    pub repository: RepositoryConfig,
}

impl EngineConfig {
    /// Loads settings without validating them.
    ///
    /// Sources are merged in order, later ones winning:
    /// 1. Type defaults
    /// 2. The file named by the `CONFIG_PATH` environment variable, if set
    /// 3. Environment variables with the `NOTIFY__` prefix
    ///
    /// Callers must call [`EngineConfig::validate`] once every override is applied.
    ///
    /// ```ignore
    /// std::env::set_var("NOTIFY__NAMING__ROOT_DN", "cn=config,o=example");
    /// let cfg = EngineConfig::new()?.validate()?;
    /// ```
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("NOTIFY")
                .separator("__")
                .ignore_empty(true)
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Layers another file, then the environment again, over the current values.
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("NOTIFY")
                    .separator("__")
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Consumes the settings and returns them once every section checks out.
    pub fn validate(self) -> Result<Self> {
        self.naming.validate()?;
        self.registration.validate()?;
        self.repository.validate()?;
        Ok(self)
    }
}
