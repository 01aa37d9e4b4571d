use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{BoutiqueError, Result};
use crate::time::parse_duration_str;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub host: String,
    pub users: usize,
    pub spawn_rate: f64,
    pub run_time: Option<Duration>,
    pub seed: Option<u64>,
    pub wait_min: Duration,
    pub wait_max: Duration,
    pub request_timeout: Duration,
    pub standard_weight: u32,
    pub hacker_weight: u32,
    pub log_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "http://127.0.0.1:8080".to_string(),
            users: 10,
            spawn_rate: 1.0,
            run_time: None,
            seed: None,
            wait_min: Duration::from_secs(1),
            wait_max: Duration::from_secs(10),
            request_timeout: Duration::from_secs(10),
            standard_weight: 1,
            hacker_weight: 0,
            log_name: "loadgenerator".to_string(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut cfg = Self::default();
        let config_path = config_file_path();
        if let Some(file_overrides) = load_file_overrides(&config_path)? {
            cfg.apply(file_overrides, "config file")?;
        }
        let env_overrides = load_env_overrides(|key| env::var(key).ok())?;
        cfg.apply(env_overrides, "environment")?;
        Ok(cfg)
    }

    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();
        let env_overrides = load_env_overrides(|key| env::var(key).ok())?;
        cfg.apply(env_overrides, "environment")?;
        Ok(cfg)
    }

    // `source` names the layer in errors
    pub fn apply(&mut self, overrides: ConfigOverrides, source: &str) -> Result<()> {
        if let Some(v) = overrides.host {
            self.host = v;
        }
        if let Some(v) = overrides.users {
            self.users = v;
        }
        if let Some(v) = overrides.spawn_rate {
            self.spawn_rate = v;
        }
        if let Some(v) = overrides.run_time {
            self.run_time = Some(parse_duration_field("run_time", &v, source)?);
        }
        if let Some(v) = overrides.seed {
            self.seed = Some(v);
        }
        if let Some(v) = overrides.wait_min {
            self.wait_min = parse_duration_field("wait_min", &v, source)?;
        }
        if let Some(v) = overrides.wait_max {
            self.wait_max = parse_duration_field("wait_max", &v, source)?;
        }
        if let Some(v) = overrides.request_timeout {
            self.request_timeout = parse_duration_field("request_timeout", &v, source)?;
        }
        if let Some(v) = overrides.standard_weight {
            self.standard_weight = v;
        }
        if let Some(v) = overrides.hacker_weight {
            self.hacker_weight = v;
        }
        if let Some(v) = overrides.log_name {
            self.log_name = v;
        }
        Ok(())
    }

    pub fn spawn_interval(&self) -> Result<Duration> {
        Duration::try_from_secs_f64(1.0 / self.spawn_rate).map_err(|e| {
            BoutiqueError::Config(format!(
                "spawn_rate {} gives an unusable spawn interval: {e}",
                self.spawn_rate
            ))
        })
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.host.starts_with("http://") || self.host.starts_with("https://")) {
            return Err(BoutiqueError::Config(format!(
                "host must start with http:// or https:// (value={})",
                self.host
            )));
        }
        if self.users == 0 {
            return Err(BoutiqueError::Config(
                "users must be at least 1".to_string(),
            ));
        }
        if !self.spawn_rate.is_finite() || self.spawn_rate <= 0.0 {
            return Err(BoutiqueError::Config(format!(
                "spawn_rate must be positive (value={})",
                self.spawn_rate
            )));
        }
        self.spawn_interval()?;
        if self.wait_min > self.wait_max {
            return Err(BoutiqueError::Config(format!(
                "wait_min ({:?}) exceeds wait_max ({:?})",
                self.wait_min, self.wait_max
            )));
        }
        if self.standard_weight == 0 && self.hacker_weight == 0 {
            return Err(BoutiqueError::Config(
                "at least one user class weight must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub users: Option<usize>,
    pub spawn_rate: Option<f64>,
    pub run_time: Option<String>,
    pub seed: Option<u64>,
    pub wait_min: Option<String>,
    pub wait_max: Option<String>,
    pub request_timeout: Option<String>,
    pub standard_weight: Option<u32>,
    pub hacker_weight: Option<u32>,
    pub log_name: Option<String>,
}

fn config_file_path() -> PathBuf {
    if let Ok(path) = env::var("BOUTIQUE_CONFIG") {
        return PathBuf::from(path);
    }

    let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
    let config_home = env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(home).join(".config"));
    config_home.join("boutique/config.toml")
}

fn load_file_overrides(path: &Path) -> Result<Option<ConfigOverrides>> {
    if !path.exists() {
        return Ok(None);
    }

    let raw = fs::read_to_string(path)
        .map_err(|e| BoutiqueError::Config(format!("failed reading {}: {e}", path.display())))?;
    let parsed: ConfigOverrides = toml::from_str(&raw)
        .map_err(|e| BoutiqueError::Config(format!("failed parsing {}: {e}", path.display())))?;
    Ok(Some(parsed))
}

fn load_env_overrides<F>(lookup: F) -> Result<ConfigOverrides>
where
    F: Fn(&str) -> Option<String>,
{
    let host = lookup("BOUTIQUE_HOST").or_else(|| {
        lookup("FRONTEND_ADDR").map(|addr| {
            if addr.contains("://") {
                addr
            } else {
                format!("http://{addr}")
            }
        })
    });

    Ok(ConfigOverrides {
        host,
        users: parse_env_number(&lookup, "BOUTIQUE_USERS")?,
        spawn_rate: parse_env_number(&lookup, "BOUTIQUE_SPAWN_RATE")?,
        run_time: lookup("BOUTIQUE_RUN_TIME"),
        seed: parse_env_number(&lookup, "BOUTIQUE_SEED")?,
        wait_min: lookup("BOUTIQUE_WAIT_MIN"),
        wait_max: lookup("BOUTIQUE_WAIT_MAX"),
        request_timeout: lookup("BOUTIQUE_REQUEST_TIMEOUT"),
        standard_weight: None,
        hacker_weight: None,
        log_name: lookup("BOUTIQUE_LOG_NAME"),
    })
}

fn parse_env_number<F, T>(lookup: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(v) => v
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| BoutiqueError::Config(format!("bad {key} in environment: {e}"))),
        None => Ok(None),
    }
}

fn parse_duration_field(field: &str, value: &str, source: &str) -> Result<Duration> {
    parse_duration_str(value)
        .map_err(|e| BoutiqueError::Config(format!("bad {field} in {source}: {e}")))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_standard_users_with_one_to_ten_second_waits() {
        let cfg = Config::default();
        assert_eq!(cfg.wait_min, Duration::from_secs(1));
        assert_eq!(cfg.wait_max, Duration::from_secs(10));
        assert_eq!(cfg.standard_weight, 1);
        assert_eq!(cfg.hacker_weight, 0);
        assert!(cfg.run_time.is_none());
        cfg.validate().unwrap();
    }

    #[test]
    fn env_overrides_parse_numbers_and_durations() {
        let lookup = env_from(&[
            ("BOUTIQUE_HOST", "http://frontend:80"),
            ("BOUTIQUE_USERS", "25"),
            ("BOUTIQUE_SPAWN_RATE", "2.5"),
            ("BOUTIQUE_RUN_TIME", "5m"),
            ("BOUTIQUE_SEED", "42"),
            ("BOUTIQUE_WAIT_MIN", "100ms"),
        ]);
        let mut cfg = Config::default();
        cfg.apply(load_env_overrides(lookup).unwrap(), "environment")
            .unwrap();

        assert_eq!(cfg.host, "http://frontend:80");
        assert_eq!(cfg.users, 25);
        assert_eq!(cfg.spawn_rate, 2.5);
        assert_eq!(cfg.run_time, Some(Duration::from_secs(300)));
        assert_eq!(cfg.seed, Some(42));
        assert_eq!(cfg.wait_min, Duration::from_millis(100));
        assert_eq!(cfg.wait_max, Duration::from_secs(10));
    }

    #[test]
    fn frontend_addr_gets_http_scheme() {
        let overrides = load_env_overrides(env_from(&[("FRONTEND_ADDR", "frontend:80")])).unwrap();
        assert_eq!(overrides.host.as_deref(), Some("http://frontend:80"));

        let overrides = load_env_overrides(env_from(&[
            ("FRONTEND_ADDR", "frontend:80"),
            ("BOUTIQUE_HOST", "https://shop.example"),
        ]))
        .unwrap();
        assert_eq!(overrides.host.as_deref(), Some("https://shop.example"));
    }

    #[test]
    fn env_rejects_bad_numbers() {
        let err = load_env_overrides(env_from(&[("BOUTIQUE_USERS", "many")])).unwrap_err();
        assert!(err.to_string().contains("BOUTIQUE_USERS"));
    }

    #[test]
    fn bad_duration_names_field_and_source() {
        let mut cfg = Config::default();
        let err = cfg
            .apply(
                ConfigOverrides {
                    wait_max: Some("soon".to_string()),
                    ..ConfigOverrides::default()
                },
                "config file",
            )
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("wait_max"));
        assert!(msg.contains("config file"));
    }

    #[test]
    fn spawn_rate_too_small_for_an_interval_is_rejected() {
        let cfg = Config {
            spawn_rate: 1e-300,
            ..Config::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("spawn_rate"));

        let cfg = Config {
            spawn_rate: 4.0,
            ..Config::default()
        };
        assert_eq!(cfg.spawn_interval().unwrap(), Duration::from_millis(250));
    }

    #[test]
    fn file_overrides_are_loaded_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "host = \"http://localhost:9000\"\nusers = 3\nhacker_weight = 1\nwait_max = \"2s\"\n",
        )
        .unwrap();

        let overrides = load_file_overrides(&path).unwrap().unwrap();
        let mut cfg = Config::default();
        cfg.apply(overrides, "config file").unwrap();
        assert_eq!(cfg.host, "http://localhost:9000");
        assert_eq!(cfg.users, 3);
        assert_eq!(cfg.hacker_weight, 1);
        assert_eq!(cfg.wait_max, Duration::from_secs(2));
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(
            load_file_overrides(&dir.path().join("absent.toml"))
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn validate_rejects_inconsistent_values() {
        let bad = [
            Config {
                host: "frontend:80".to_string(),
                ..Config::default()
            },
            Config {
                users: 0,
                ..Config::default()
            },
            Config {
                spawn_rate: 0.0,
                ..Config::default()
            },
            Config {
                wait_min: Duration::from_secs(5),
                wait_max: Duration::from_secs(1),
                ..Config::default()
            },
            Config {
                standard_weight: 0,
                hacker_weight: 0,
                ..Config::default()
            },
        ];
        for cfg in bad {
            assert!(cfg.validate().is_err(), "accepted {cfg:?}");
        }
    }
}
