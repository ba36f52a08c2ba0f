//! Extension pour intégrer Audius dans moodconfig
//!
//! Le trait `AudiusConfigExt` ajoute à `moodconfig::Config` les réglages de
//! la source Audius (`sources.audius.*`) et la construction d'un client à
//! partir de ceux-ci.
//!
//! # Exemple
//!
//! ```no_run
//! use moodconfig::get_config;
//! use moodaudius::AudiusConfigExt;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = get_config();
//! println!("app_name = {}", config.get_audius_app_name()?);
//! let client = config.audius_client()?;
//! # Ok(())
//! # }
//! ```

use crate::client::{AudiusClient, APP_NAME_ENV, DEFAULT_APP_NAME};
use crate::host::DEFAULT_DIRECTORY_URL;
use anyhow::Result;
use moodconfig::Config;
use serde_yaml::Value;

/// Trait d'extension pour la configuration Audius
///
/// Les getters persistent la valeur par défaut quand la clé est absente.
pub trait AudiusConfigExt {
    /// Identifiant applicatif envoyé en `app_name`
    ///
    /// `AUDIUS_APP_NAME` prend le pas sur la configuration.
    fn get_audius_app_name(&self) -> Result<String>;

    fn set_audius_app_name(&self, name: &str) -> Result<()>;

    /// URL du service d'annuaire des discovery nodes
    fn get_audius_directory_url(&self) -> Result<String>;

    fn set_audius_directory_url(&self, url: &str) -> Result<()>;

    /// Construit un [`AudiusClient`] à partir de la configuration
    fn audius_client(&self) -> Result<AudiusClient>;
}

impl AudiusConfigExt for Config {
    fn get_audius_app_name(&self) -> Result<String> {
        if let Some(name) = std::env::var(APP_NAME_ENV)
            .ok()
            .filter(|name| !name.trim().is_empty())
        {
            return Ok(name);
        }

        match self.get_value(&["sources", "audius", "app_name"]) {
            Ok(Value::String(name)) if !name.trim().is_empty() => Ok(name),
            _ => {
                self.set_audius_app_name(DEFAULT_APP_NAME)?;
                Ok(DEFAULT_APP_NAME.to_string())
            }
        }
    }

    fn set_audius_app_name(&self, name: &str) -> Result<()> {
        self.set_value(
            &["sources", "audius", "app_name"],
            Value::String(name.to_string()),
        )
    }

    fn get_audius_directory_url(&self) -> Result<String> {
        match self.get_value(&["sources", "audius", "directory_url"]) {
            Ok(Value::String(url)) if !url.trim().is_empty() => Ok(url),
            _ => {
                self.set_audius_directory_url(DEFAULT_DIRECTORY_URL)?;
                Ok(DEFAULT_DIRECTORY_URL.to_string())
            }
        }
    }

    fn set_audius_directory_url(&self, url: &str) -> Result<()> {
        self.set_value(
            &["sources", "audius", "directory_url"],
            Value::String(url.to_string()),
        )
    }

    fn audius_client(&self) -> Result<AudiusClient> {
        let client = AudiusClient::builder()
            .app_name(self.get_audius_app_name()?)
            .directory_url(self.get_audius_directory_url()?)
            .build()?;
        Ok(client)
    }
}
