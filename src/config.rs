//! Resolved runtime configuration.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::fonts::FontManifest;
use crate::permissions::Capability;

const DEFAULT_DIR_NAME: &str = ".safeguard";

#[derive(Debug, Clone)]
pub struct Config {
    /// Store and journals live here
    pub data_dir: PathBuf,
    pub fonts_dir: PathBuf,
    pub fonts: FontManifest,
    /// Capabilities requested at startup, in request order
    pub capabilities: Vec<Capability>,
}

impl Config {
    /// Resolve directories from explicit values, falling back to `~/.safeguard`
    /// and `<data_dir>/fonts`.
    pub fn resolve(data_dir: Option<String>, fonts_dir: Option<String>) -> Result<Self> {
        let data_dir = match data_dir {
            Some(dir) => PathBuf::from(dir),
            None => dirs::home_dir()
                .context("Could not determine home directory")?
                .join(DEFAULT_DIR_NAME),
        };

        let fonts_dir = match fonts_dir {
            Some(dir) => PathBuf::from(dir),
            None => data_dir.join("fonts"),
        };

        Ok(Self::with_dirs(data_dir, fonts_dir))
    }

    pub fn with_dirs(data_dir: impl Into<PathBuf>, fonts_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            fonts_dir: fonts_dir.into(),
            fonts: FontManifest::default(),
            capabilities: Capability::ALL.to_vec(),
        }
    }
}
