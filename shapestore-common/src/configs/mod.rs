/*
This code is part of the ShapeStore geospatial data library.
Authors: Dr. John Lindsay
Created: 03/10/2026
Last Modified: 15/10/2026
License: MIT
*/
use crate::error::{Result, ShapeError};
use crate::structures::{DEFAULT_MAX_ENTRIES, DEFAULT_MIN_ENTRIES, MAX_NODE_CAPACITY};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// Provider settings. Backed by a settings.json file in the working
/// directory; any field missing from the file takes its default.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Configs {
    pub verbose_mode: bool,
    /// Maintain an in-memory R-tree over feature extents.
    pub enable_spatial_index: bool,
    /// Persist the R-tree as a .sidx side-car and reuse it on open.
    pub use_spatial_index_file: bool,
    /// R-tree fan-out. A saved .sidx built with other values is rebuilt
    /// on open.
    pub min_node_entries: usize,
    pub max_node_entries: usize,
    /// Skip undecodable records during a full scan instead of failing.
    pub tolerate_corrupt_records: bool,
    /// Code page used when neither a .cpg file nor the dBase language
    /// driver identifies the attribute encoding.
    pub default_code_page: u16,
}

impl Default for Configs {
    fn default() -> Configs {
        Configs {
            verbose_mode: false,
            enable_spatial_index: true,
            use_spatial_index_file: true,
            min_node_entries: DEFAULT_MIN_ENTRIES,
            max_node_entries: DEFAULT_MAX_ENTRIES,
            tolerate_corrupt_records: false,
            default_code_page: 65001,
        }
    }
}

impl Configs {
    pub fn new() -> Configs {
        Configs::default()
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_node_entries < 1 {
            return Err(ShapeError::Config(
                "min_node_entries must be at least 1".to_string(),
            ));
        }
        if 2 * self.min_node_entries > self.max_node_entries {
            return Err(ShapeError::Config(format!(
                "max_node_entries ({}) must be at least twice min_node_entries ({})",
                self.max_node_entries, self.min_node_entries
            )));
        }
        if self.max_node_entries > MAX_NODE_CAPACITY {
            return Err(ShapeError::Config(format!(
                "max_node_entries may not exceed {}",
                MAX_NODE_CAPACITY
            )));
        }
        Ok(())
    }
}

fn settings_path() -> Result<PathBuf> {
    Ok(std::env::current_dir()?.join(SETTINGS_FILE_NAME))
}

/// Reads settings.json from the current working directory, falling back to
/// the defaults when the file does not exist.
pub fn get_configs() -> Result<Configs> {
    get_configs_from(settings_path()?)
}

pub fn get_configs_from<P: AsRef<Path>>(path: P) -> Result<Configs> {
    let path = path.as_ref();
    let configs: Configs = match fs::read_to_string(path) {
        Ok(contents) => serde_json::from_str(&contents).map_err(|e| {
            ShapeError::Config(format!("failed to parse {}: {}", path.display(), e))
        })?,
        Err(_) => {
            debug!("No settings file at {}; using defaults", path.display());
            Configs::new()
        }
    };
    configs.validate()?;
    Ok(configs)
}

pub fn save_configs<P: AsRef<Path>>(configs: &Configs, path: P) -> Result<()> {
    let configs_json = serde_json::to_string_pretty(configs)
        .map_err(|e| ShapeError::Config(format!("error converting settings to JSON: {}", e)))?;
    fs::write(path, configs_json)?;
    Ok(())
}
