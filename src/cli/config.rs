//! Optional `kryc.toml`/`kryc.json` project config, loaded ahead of the
//! command line. CLI flags always take precedence over config-file values,
//! which in turn take precedence over `CompilerOptions::default()`.

use std::collections::HashMap;
use std::fs;

use serde::{Deserialize, Serialize};

use crate::error::{CompilerError, Result};

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    pub include_directories: Option<Vec<String>>,
    pub custom_variables: Option<HashMap<String, String>>,
    pub max_file_size: Option<u64>,
}

/// Loads a `.toml` or `.json` config file. The extension picks the format;
/// anything else is rejected rather than guessed.
pub fn load(config_path: &str) -> Result<ConfigFile> {
    let content = fs::read_to_string(config_path).map_err(|_| CompilerError::FileNotFound {
        path: config_path.to_string(),
    })?;

    if config_path.ends_with(".toml") {
        toml::from_str(&content).map_err(|e| CompilerError::config(config_path, e.to_string()))
    } else if config_path.ends_with(".json") {
        serde_json::from_str(&content).map_err(|e| CompilerError::config(config_path, e.to_string()))
    } else {
        Err(CompilerError::config(config_path, "config file must be .toml or .json".to_string()))
    }
}
