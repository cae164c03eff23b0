//! Dataset location configuration.
//!
//! Every dataset URL comes from outside: environment variables, or an
//! optional YAML file with the same keys (environment wins on conflict).
//! Values may be HTTP(S) URLs or local file paths. A missing required URL is
//! a user-facing configuration error for the command that needed it, not a
//! crash.

use std::{env, fs, path::Path};

use serde::Deserialize;
use thiserror::Error;

pub const ENV_DISTRICTS_CSV: &str = "LONESTAR_DISTRICTS_CSV";
pub const ENV_CAMPUSES_CSV: &str = "LONESTAR_CAMPUSES_CSV";
pub const ENV_SPENDING_CSV: &str = "LONESTAR_SPENDING_CSV";
pub const ENV_DISTRICTS_GEOJSON: &str = "LONESTAR_DISTRICTS_GEOJSON";
pub const ENV_CAMPUSES_GEOJSON: &str = "LONESTAR_CAMPUSES_GEOJSON";
pub const ENV_API_BASE: &str = "LONESTAR_API_BASE";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no {dataset} URL configured; set {env_var} or add '{key}:' to the config file")]
    Missing {
        dataset: &'static str,
        env_var: &'static str,
        key: &'static str,
    },
    #[error("failed reading config file {path}: {message}")]
    File { path: String, message: String },
    #[error("failed parsing config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Resolved dataset locations. All optional here; each command demands the
/// ones it needs through the `require_*` accessors.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DataConfig {
    pub districts_csv: Option<String>,
    pub campuses_csv: Option<String>,
    pub spending_csv: Option<String>,
    pub districts_geojson: Option<String>,
    pub campuses_geojson: Option<String>,
    pub api_base: Option<String>,
}

fn env_value(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl DataConfig {
    /// Configuration from environment variables alone.
    pub fn from_env() -> Self {
        DataConfig {
            districts_csv: env_value(ENV_DISTRICTS_CSV),
            campuses_csv: env_value(ENV_CAMPUSES_CSV),
            spending_csv: env_value(ENV_SPENDING_CSV),
            districts_geojson: env_value(ENV_DISTRICTS_GEOJSON),
            campuses_geojson: env_value(ENV_CAMPUSES_GEOJSON),
            api_base: env_value(ENV_API_BASE),
        }
    }

    /// Optional YAML file overlaid with the environment; an environment
    /// variable beats the file's value for the same key.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                let text = fs::read_to_string(path).map_err(|err| ConfigError::File {
                    path: path.display().to_string(),
                    message: err.to_string(),
                })?;
                serde_yaml::from_str::<DataConfig>(&text).map_err(|source| ConfigError::Parse {
                    path: path.display().to_string(),
                    source,
                })?
            }
            None => DataConfig::default(),
        };
        let env = DataConfig::from_env();
        config.districts_csv = env.districts_csv.or(config.districts_csv);
        config.campuses_csv = env.campuses_csv.or(config.campuses_csv);
        config.spending_csv = env.spending_csv.or(config.spending_csv);
        config.districts_geojson = env.districts_geojson.or(config.districts_geojson);
        config.campuses_geojson = env.campuses_geojson.or(config.campuses_geojson);
        config.api_base = env.api_base.or(config.api_base);
        Ok(config)
    }

    pub fn require_districts_csv(&self) -> Result<&str, ConfigError> {
        self.districts_csv
            .as_deref()
            .ok_or(ConfigError::Missing {
                dataset: "district CSV",
                env_var: ENV_DISTRICTS_CSV,
                key: "districts_csv",
            })
    }

    pub fn require_campuses_csv(&self) -> Result<&str, ConfigError> {
        self.campuses_csv.as_deref().ok_or(ConfigError::Missing {
            dataset: "campus CSV",
            env_var: ENV_CAMPUSES_CSV,
            key: "campuses_csv",
        })
    }

    pub fn require_spending_csv(&self) -> Result<&str, ConfigError> {
        self.spending_csv.as_deref().ok_or(ConfigError::Missing {
            dataset: "spending CSV",
            env_var: ENV_SPENDING_CSV,
            key: "spending_csv",
        })
    }

    pub fn require_districts_geojson(&self) -> Result<&str, ConfigError> {
        self.districts_geojson
            .as_deref()
            .ok_or(ConfigError::Missing {
                dataset: "district GeoJSON",
                env_var: ENV_DISTRICTS_GEOJSON,
                key: "districts_geojson",
            })
    }

    pub fn require_api_base(&self) -> Result<&str, ConfigError> {
        self.api_base.as_deref().ok_or(ConfigError::Missing {
            dataset: "API base",
            env_var: ENV_API_BASE,
            key: "api_base",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn yaml_file_supplies_missing_values() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            "districts_csv: /data/districts.csv\napi_base: http://localhost:8080\n"
        )
        .expect("write");
        let config = DataConfig::load(Some(file.path())).expect("load");
        assert_eq!(
            config.require_districts_csv().expect("districts"),
            "/data/districts.csv"
        );
        assert_eq!(config.api_base.as_deref(), Some("http://localhost:8080"));
    }

    #[test]
    fn missing_value_names_the_environment_variable() {
        let config = DataConfig::default();
        let err = config.require_spending_csv().unwrap_err();
        assert!(err.to_string().contains(ENV_SPENDING_CSV));
    }

    #[test]
    fn unknown_yaml_keys_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, "district_csv_url: oops\n").expect("write");
        assert!(matches!(
            DataConfig::load(Some(file.path())),
            Err(ConfigError::Parse { .. })
        ));
    }
}
