//! Layered YAML config loading, deep-merge, canonical hashing.
//!
//! Later files in `paths` override earlier ones (deep-merge on objects,
//! replace on arrays and scalars). The merged document is canonicalized
//! (object keys sorted recursively, compact encoding) before hashing so
//! that two semantically identical configs, however their source files
//! were split, hash identically.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::types::RawConfig;
use crate::validate::{validate, ConfigError};

#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub raw: RawConfig,
    pub config_json: Value,
    pub canonical_json: String,
    pub config_hash: String,
}

pub fn load_layered_yaml<P: AsRef<Path>>(paths: &[P]) -> Result<LoadedConfig> {
    let mut merged = Value::Object(Default::default());

    for p in paths {
        let p = p.as_ref();
        let s = fs::read_to_string(p).with_context(|| format!("read config: {}", p.display()))?;
        let yaml_val: serde_yaml::Value = serde_yaml::from_str(&s).with_context(|| format!("parse yaml: {}", p.display()))?;
        let json_val = serde_json::to_value(yaml_val).context("yaml->json conversion failed")?;
        deep_merge(&mut merged, json_val);
    }

    let canonical = canonicalize_json(&merged);

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let config_hash = hex::encode(hasher.finalize());

    let raw: RawConfig = serde_json::from_str(&canonical).context("config does not match expected schema")?;
    validate(&raw).map_err(|e: ConfigError| anyhow::anyhow!(e))?;

    Ok(LoadedConfig {
        raw,
        config_json: serde_json::from_str(&canonical).context("canonical json parse failed")?,
        canonical_json: canonical,
        config_hash,
    })
}

fn deep_merge(dst: &mut Value, src: Value) {
    match (dst, src) {
        (Value::Object(dst_map), Value::Object(src_map)) => {
            for (k, v) in src_map {
                match dst_map.get_mut(&k) {
                    Some(existing) => deep_merge(existing, v),
                    None => {
                        dst_map.insert(k, v);
                    }
                }
            }
        }
        (dst_slot, src_val) => {
            *dst_slot = src_val;
        }
    }
}

fn canonicalize_json(v: &Value) -> String {
    let sorted = sort_keys(v);
    serde_json::to_string(&sorted).expect("json serialization must not fail")
}

fn sort_keys(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut keys: Vec<_> = map.keys().cloned().collect();
            keys.sort();
            let mut new = serde_json::Map::new();
            for k in keys {
                new.insert(k.clone(), sort_keys(&map[&k]));
            }
            Value::Object(new)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_keys).collect()),
        _ => v.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn base_yaml() -> &'static str {
        r#"
sma_fast: 10
sma_slow: 30
t_norm_bull_thresh: 0.05
t_norm_bear_thresh: -0.05
realized_vol_window: 10
vol_baseline_window: 20
upper_thresh_z: 1.5
lower_thresh_z: -0.5
vol_crush_threshold: -0.15
vol_crush_lookback: 5
leverage_scalar: 1.0
rebalance_threshold: 0.025
bond_sma_fast: 10
bond_sma_slow: 30
max_bond_weight: 0.4
commission_per_share_micros: 0
slippage_percent: 0.0
initial_capital_micros: 1000000000000
universe:
  primary_equity: SPY
  leveraged_equity: UPRO
  long_duration_defensive: TLT
  inverse_duration_defensive: TBF
  cash_symbol: CASH
  bond_trend_proxy: TLT
"#
    }

    #[test]
    fn layered_override_replaces_scalar_and_keeps_base_fields() {
        let dir = tempfile::tempdir().unwrap();
        let base_path = dir.path().join("base.yaml");
        let override_path = dir.path().join("override.yaml");
        fs::write(&base_path, base_yaml()).unwrap();
        let mut f = fs::File::create(&override_path).unwrap();
        writeln!(f, "leverage_scalar: 1.5").unwrap();

        let loaded = load_layered_yaml(&[base_path, override_path]).unwrap();
        assert_eq!(loaded.raw.leverage_scalar, 1.5);
        assert_eq!(loaded.raw.sma_fast, 10);
    }

    #[test]
    fn identical_merged_config_hashes_identically_regardless_of_split() {
        let dir = tempfile::tempdir().unwrap();
        let single = dir.path().join("single.yaml");
        fs::write(&single, base_yaml()).unwrap();
        let loaded_single = load_layered_yaml(&[single]).unwrap();

        let base_path = dir.path().join("base2.yaml");
        let override_path = dir.path().join("override2.yaml");
        fs::write(&base_path, base_yaml()).unwrap();
        fs::write(&override_path, "{}").unwrap();
        let loaded_split = load_layered_yaml(&[base_path, override_path]).unwrap();

        assert_eq!(loaded_single.config_hash, loaded_split.config_hash);
    }

    #[test]
    fn invalid_threshold_ordering_rejected_at_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        let yaml = base_yaml().replace("upper_thresh_z: 1.5", "upper_thresh_z: -1.0");
        fs::write(&path, yaml).unwrap();
        let result = load_layered_yaml(&[path]);
        assert!(result.is_err());
    }
}
