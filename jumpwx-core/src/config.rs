use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fs, path::PathBuf};

use crate::provider::SiteSpec;
use crate::severity::Scheme;

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Optional severity scheme id, "gust-ratio" or "wind-ref".
    pub default_scheme: Option<String>,

    /// Name of the site used when no site flags are given.
    pub default_site: Option<String>,

    /// Saved sites by name. Example TOML:
    /// [sites.Utti]
    /// fmisid = "101191"
    /// icao = "EFUT"
    #[serde(default)]
    pub sites: BTreeMap<String, SiteSpec>,
}

impl Config {
    /// Return the configured severity scheme as a strongly-typed Scheme.
    ///
    /// An unset scheme means [`Scheme::WindRef`], the scheme the reference
    /// deployment runs; an unknown value is an error rather than a silent
    /// fallback.
    pub fn scheme(&self) -> Result<Scheme> {
        match self.default_scheme.as_deref() {
            None => Ok(Scheme::WindRef),
            Some(s) => Scheme::try_from(s),
        }
    }

    pub fn set_scheme(&mut self, scheme: Scheme) {
        self.default_scheme = Some(scheme.as_str().to_string());
    }

    pub fn site(&self, name: &str) -> Option<&SiteSpec> {
        self.sites.get(name)
    }

    /// Site names in stable display order.
    pub fn site_names(&self) -> Vec<&str> {
        self.sites.keys().map(String::as_str).collect()
    }

    /// Save or replace a site under the given name. The first saved site
    /// becomes the default.
    pub fn save_site(&mut self, name: &str, spec: SiteSpec) {
        self.sites.insert(name.to_string(), spec);

        if self.default_site.is_none() {
            self.default_site = Some(name.to_string());
        }
    }

    /// Remove a saved site. Clears the default if it pointed at it.
    pub fn remove_site(&mut self, name: &str) -> bool {
        let removed = self.sites.remove(name).is_some();

        if removed && self.default_site.as_deref() == Some(name) {
            self.default_site = None;
        }

        removed
    }

    /// The site to use when none is named explicitly: the configured
    /// default, or the only saved site if there is exactly one.
    pub fn implicit_site(&self) -> Option<(&str, &SiteSpec)> {
        if let Some(name) = self.default_site.as_deref()
            && let Some(spec) = self.sites.get(name)
        {
            return Some((name, spec));
        }

        if self.sites.len() == 1 {
            return self.sites.iter().next().map(|(name, spec)| (name.as_str(), spec));
        }

        None
    }

    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("fi", "jumpwx", "jumpwx")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}
