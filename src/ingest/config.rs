// src/ingest/config.rs
//! Entity/source configuration loading. The configuration layer that edits
//! these files is out of scope; the core only reads them.

use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::content::EntityConfig;

const ENV_PATH: &str = "REVIEW_RADAR_CONFIG";

/// Load entities from an explicit path. Supports TOML or JSON.
pub fn load_entities_from(path: &Path) -> Result<Vec<EntityConfig>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading entity config from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_entities(&content, ext.as_str())
}

/// Load entities using env var + fallbacks:
/// 1) $REVIEW_RADAR_CONFIG
/// 2) config/entities.toml
/// 3) config/entities.json
pub fn load_entities_default() -> Result<Vec<EntityConfig>> {
    if let Ok(p) = std::env::var(ENV_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_entities_from(&pb);
        }
        return Err(anyhow!("REVIEW_RADAR_CONFIG points to non-existent path"));
    }
    let toml_p = PathBuf::from("config/entities.toml");
    if toml_p.exists() {
        return load_entities_from(&toml_p);
    }
    let json_p = PathBuf::from("config/entities.json");
    if json_p.exists() {
        return load_entities_from(&json_p);
    }
    Ok(Vec::new())
}

fn parse_entities(s: &str, hint_ext: &str) -> Result<Vec<EntityConfig>> {
    let try_toml = hint_ext == "toml" || s.contains("[[entity]]");
    if try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    if let Ok(v) = parse_json(s) {
        return Ok(v);
    }
    if !try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    Err(anyhow!("unsupported entity config format"))
}

fn parse_toml(s: &str) -> Result<Vec<EntityConfig>> {
    #[derive(serde::Deserialize)]
    struct TomlFile {
        #[serde(default)]
        entity: Vec<EntityConfig>,
    }
    let v: TomlFile = toml::from_str(s)?;
    Ok(v.entity)
}

fn parse_json(s: &str) -> Result<Vec<EntityConfig>> {
    let v: Vec<EntityConfig> = serde_json::from_str(s)?;
    Ok(v)
}
