use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::constants::DEFAULT_NAMING_ATTRIBUTE;
use crate::constants::DEFAULT_ROOT_DN;
use crate::Dn;
use crate::Error;
use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NamingConfig {
    /// DN of the entry the root managed object decodes from
    #[serde(default = "default_root_dn")]
    pub root_dn: String,

    /// RDN attribute naming the children of instantiable and set relations
    #[serde(default = "default_naming_attribute")]
    pub naming_attribute: String,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            root_dn: default_root_dn(),
            naming_attribute: default_naming_attribute(),
        }
    }
}

impl NamingConfig {
    pub fn validate(&self) -> Result<()> {
        let root_dn = Dn::parse(&self.root_dn)
            .map_err(|e| Error::Settings(ConfigError::Message(format!("naming.root_dn is invalid: {e}"))))?;
        if root_dn.is_root() {
            return Err(Error::Settings(ConfigError::Message(
                "naming.root_dn must not be empty".to_string(),
            )));
        }

        if self.naming_attribute.trim().is_empty() {
            return Err(Error::Settings(ConfigError::Message(
                "naming.naming_attribute must not be empty".to_string(),
            )));
        }
        Ok(())
    }

    /// Parsed form of `root_dn`.
    pub fn root_dn(&self) -> Result<Dn> {
        Dn::parse(&self.root_dn)
    }
}

fn default_root_dn() -> String {
    DEFAULT_ROOT_DN.to_string()
}

fn default_naming_attribute() -> String {
    DEFAULT_NAMING_ATTRIBUTE.to_string()
}
