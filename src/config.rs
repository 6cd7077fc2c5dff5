use anyhow::{bail, Context, Result};
use std::{env, path::PathBuf};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_STATION: &str = "Beijing";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub model_path: PathBuf,
    pub meta_path: PathBuf,
    /// Historical CSV; without it only manual estimates are available.
    pub data_path: Option<PathBuf>,
    pub port: u16,
    /// The only location requests may name.
    pub station: String,
    /// Log a summary of every feature vector (`LOG_PRED=1`).
    pub log_features: bool,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let model_path = get("MODEL_PATH").context("MODEL_PATH not set")?;
        let meta_path = get("META_PATH").context("META_PATH not set")?;
        let data_path = get("DATA_PATH").filter(|p| !p.is_empty()).map(PathBuf::from);

        let port: u16 = match get("PORT") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("PORT '{raw}' is not a valid port"))?,
            None => DEFAULT_PORT,
        };

        let station = get("STATION")
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|| DEFAULT_STATION.to_string());
        if station.is_empty() {
            bail!("STATION must not be empty");
        }

        Ok(Self {
            model_path: PathBuf::from(model_path),
            meta_path: PathBuf::from(meta_path),
            data_path,
            port,
            station,
            log_features: get("LOG_PRED").as_deref() == Some("1"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_apply() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("MODEL_PATH", "m.json"),
            ("META_PATH", "meta.json"),
        ]))
        .unwrap();
        assert_eq!(cfg.port, DEFAULT_PORT);
        assert_eq!(cfg.station, "Beijing");
        assert_eq!(cfg.data_path, None);
        assert!(!cfg.log_features);
    }

    #[test]
    fn reads_everything() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("MODEL_PATH", "m.json"),
            ("META_PATH", "meta.json"),
            ("DATA_PATH", "prsa.csv"),
            ("PORT", "9000"),
            ("STATION", "Dongsi"),
            ("LOG_PRED", "1"),
        ]))
        .unwrap();
        assert_eq!(cfg.data_path, Some(PathBuf::from("prsa.csv")));
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.station, "Dongsi");
        assert!(cfg.log_features);
    }

    #[test]
    fn station_is_trimmed() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("MODEL_PATH", "m.json"),
            ("META_PATH", "meta.json"),
            ("STATION", "  Beijing \n"),
        ]))
        .unwrap();
        assert_eq!(cfg.station, "Beijing");

        assert!(AppConfig::from_lookup(lookup(&[
            ("MODEL_PATH", "m.json"),
            ("META_PATH", "meta.json"),
            ("STATION", "   "),
        ]))
        .is_err());
    }

    #[test]
    fn missing_or_bad_values_fail() {
        let err = AppConfig::from_lookup(lookup(&[("META_PATH", "meta.json")])).unwrap_err();
        assert!(err.to_string().contains("MODEL_PATH"));

        assert!(AppConfig::from_lookup(lookup(&[
            ("MODEL_PATH", "m.json"),
            ("META_PATH", "meta.json"),
            ("PORT", "eighty"),
        ]))
        .is_err());
    }
}
