use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::StoreError;

/// Deployment settings for the ledger.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Seconds between scheduled flushes. Negative saves on every change;
    /// zero flushes only when asked.
    pub save_interval_secs: i64,
    /// Fraction of damage a defender takes inside its own territory.
    pub home_land_damage_reduction: f64,
    /// Respawn players at their faction home.
    pub faction_home_on_death: bool,
    /// Members of a peaceful faction cannot be hurt on their own land.
    pub peaceful_damage_immunity: bool,
    /// Longest accepted faction name, in characters.
    pub max_name_len: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            save_interval_secs: -1,
            home_land_damage_reduction: 0.0,
            faction_home_on_death: true,
            peaceful_damage_immunity: true,
            max_name_len: 16,
        }
    }
}

impl LedgerConfig {
    /// Read a config from a JSON file. Missing keys take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, StoreError> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn save_policy(&self) -> SavePolicy {
        SavePolicy::from_interval(self.save_interval_secs)
    }
}

/// Whether each mutation hands a save to persistence, or a scheduled flush
/// does it instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SavePolicy {
    Eager,
    Batched { interval: Option<Duration> },
}

impl SavePolicy {
    pub fn from_interval(secs: i64) -> Self {
        match u64::try_from(secs) {
            Err(_) => SavePolicy::Eager,
            Ok(0) => SavePolicy::Batched { interval: None },
            Ok(n) => SavePolicy::Batched {
                interval: Some(Duration::from_secs(n)),
            },
        }
    }

    pub fn saves_eagerly(self) -> bool {
        matches!(self, SavePolicy::Eager)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_interval_is_eager() {
        assert!(SavePolicy::from_interval(-1).saves_eagerly());
        assert!(LedgerConfig::default().save_policy().saves_eagerly());
    }

    #[test]
    fn non_negative_interval_is_batched() {
        assert_eq!(
            SavePolicy::from_interval(0),
            SavePolicy::Batched { interval: None }
        );
        assert_eq!(
            SavePolicy::from_interval(300),
            SavePolicy::Batched {
                interval: Some(Duration::from_secs(300))
            }
        );
        assert!(!SavePolicy::from_interval(300).saves_eagerly());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: LedgerConfig =
            serde_json::from_str(r#"{"home_land_damage_reduction": 0.5}"#).unwrap();
        assert_eq!(config.home_land_damage_reduction, 0.5);
        assert_eq!(config.save_interval_secs, -1);
        assert!(config.faction_home_on_death);
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        std::fs::write(&path, r#"{"save_interval_secs": 60, "max_name_len": 10}"#).unwrap();
        let config = LedgerConfig::from_json_file(&path).unwrap();
        assert_eq!(config.save_interval_secs, 60);
        assert_eq!(config.max_name_len, 10);
    }
}
