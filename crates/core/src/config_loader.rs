use crate::config::AppConfig;
use anyhow::Result;
use figment::{
    providers::{Env, Format, Json, Toml},
    Figment,
};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "config/Config.toml";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads configuration rooted at an explicit TOML path.
    ///
    /// `Config.<profile>.toml` and `Config.json` are looked up next to `path`.
    /// Missing files are skipped; every field has a default.
    ///
    /// # Errors
    ///
    /// Returns an error if a present file cannot be parsed, or if the merged
    /// configuration fails validation.
    pub fn load_from(path: impl AsRef<Path>, profile: Option<&str>) -> Result<AppConfig> {
        let path = path.as_ref();
        let mut figment = Figment::new().merge(Toml::file(path));

        if let Some(profile) = profile {
            figment = figment.merge(Toml::file(profile_path(path, profile)));
        }

        let config: AppConfig = figment
            .merge(Env::prefixed("APP_").split("__"))
            .join(Json::file(path.with_extension("json")))
            .extract()?;

        config.validate()?;

        tracing::info!(
            path = %path.display(),
            profile = profile.unwrap_or("default"),
            "Configuration loaded"
        );

        Ok(config)
    }
}

fn profile_path(path: &Path, profile: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Config");
    path.with_file_name(format!("{stem}.{profile}.toml"))
}
