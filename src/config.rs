//! Binding configuration
//!
//! Settings come from the environment or a JSON file. The only required
//! knob today is where to find the libsndfile shared library.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Environment variable naming an explicit libsndfile path
pub const LIBRARY_ENV_VAR: &str = "NSNDFILE_LIBRARY";

/// Configuration for locating and loading libsndfile
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SndfileConfig {
    /// Explicit path to the shared library; platform defaults are tried when unset
    #[serde(default)]
    pub library_path: Option<PathBuf>,
}

impl SndfileConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read configuration from `NSNDFILE_LIBRARY`
    pub fn from_env() -> Self {
        let library_path = env::var_os(LIBRARY_ENV_VAR)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        Self { library_path }
    }

    /// Load configuration from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn with_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.library_path = Some(path.into());
        self
    }
}
