use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::constants::DEFAULT_MAX_DELAYED_DEPTH;
use crate::Error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RegistrationConfig {
    /// Most missing ancestors a delayed registration may wait through
    #[serde(default = "default_max_delayed_depth")]
    pub max_delayed_depth: usize,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            max_delayed_depth: default_max_delayed_depth(),
        }
    }
}

impl RegistrationConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_delayed_depth == 0 {
            return Err(Error::Settings(ConfigError::Message(
                "registration.max_delayed_depth must be greater than 0".to_string(),
            )));
        }
        Ok(())
    }
}

fn default_max_delayed_depth() -> usize {
    DEFAULT_MAX_DELAYED_DEPTH
}
