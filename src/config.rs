use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::reward::VoltageZones;
use crate::search::SearchConfig;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub feeder: FeederConfig,
    pub search: SearchConfig,
    pub reward: VoltageZones,
    pub env: EnvSettings,
    pub driver: DriverConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeederConfig {
    /// Network model reference handed to the solver's compile
    pub model: String,
    /// Regulator controls disabled at construction
    pub regulators: Vec<String>,
    /// Rating written to both capacitor banks (kvar)
    pub capacitor_kvar: f64,
}

impl Default for FeederConfig {
    fn default() -> Self {
        Self {
            model: "IEEETestCases/13Bus/IEEE13Nodeckt.dss".to_string(),
            regulators: vec![
                "regcontrol.Reg1".to_string(),
                "regcontrol.Reg2".to_string(),
                "regcontrol.Reg3".to_string(),
            ],
            capacitor_kvar: 600.0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvSettings {
    /// Seed for load sampling (None = OS entropy)
    pub random_seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    pub episodes: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self { episodes: 8 }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Defaults, then the TOML file (if present), then `FEEDER_ENV__*` variables
    pub fn load_from(path: &str) -> Result<Self> {
        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("FEEDER_ENV__").split("__"));
        let config: Config = figment.extract()?;
        config.validate().map_err(anyhow::Error::msg)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.feeder.model.trim().is_empty() {
            return Err("feeder.model must not be empty".to_string());
        }
        if !self.feeder.capacitor_kvar.is_finite() || self.feeder.capacitor_kvar < 0.0 {
            return Err(format!(
                "feeder.capacitor_kvar must be a non-negative number, got {}",
                self.feeder.capacitor_kvar
            ));
        }
        self.search.validate().map_err(|e| format!("search: {e}"))?;
        self.reward.validate().map_err(|e| format!("reward: {e}"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::ScalingMode;
    use figment::Jail;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.search.max_attempts, 30);
        assert_eq!(config.search.min_bus_volt, 0.8);
        assert_eq!(config.search.max_bus_volt, 1.2);
        assert_eq!(config.feeder.regulators.len(), 3);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        Jail::expect_with(|_jail| {
            let config = Config::load_from("does/not/exist.toml").map_err(|e| e.to_string())?;
            assert_eq!(config.reward, VoltageZones::default());
            Ok(())
        });
    }

    #[test]
    fn test_toml_and_env_layering() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "feeder.toml",
                r#"
                [search]
                max_attempts = 12

                [search.scaling]
                mode = "feeder"
                min_scale = 0.9
                max_scale = 1.1

                [reward]
                zone1_penalty = -50.0
                "#,
            )?;
            jail.set_env("FEEDER_ENV__ENV__RANDOM_SEED", "42");
            jail.set_env("FEEDER_ENV__SEARCH__MAX_ATTEMPTS", "20");

            let config = Config::load_from("feeder.toml").map_err(|e| e.to_string())?;
            assert_eq!(config.search.max_attempts, 20);
            assert_eq!(config.search.scaling.mode, ScalingMode::Feeder);
            assert_eq!(config.search.scaling.min_scale, 0.9);
            assert_eq!(config.reward.zone1_penalty, -50.0);
            assert_eq!(config.reward.zone2_penalty, -400.0);
            assert_eq!(config.env.random_seed, Some(42));
            Ok(())
        });
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "bad.toml",
                r#"
                [reward]
                zone1_penalty = 10.0
                "#,
            )?;
            assert!(Config::load_from("bad.toml").is_err());
            Ok(())
        });
    }
}
