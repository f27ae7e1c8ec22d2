//! Bundled font loading.
//!
//! Fonts are read from a directory and checked for a TrueType/OpenType
//! signature. Anything missing, empty or malformed fails the whole load with
//! the family name attached, so the startup report says which font broke.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::{debug, info};

/// Fonts the application ships with, as (family, file name)
pub const DEFAULT_FONTS: &[(&str, &str)] = &[
    ("Roboto-Regular", "Roboto-Regular.ttf"),
    ("Roboto-Bold", "Roboto-Bold.ttf"),
    ("Roboto-Medium", "Roboto-Medium.ttf"),
    ("Roboto-Light", "Roboto-Light.ttf"),
];

/// sfnt version tags accepted at the start of a font file
const FONT_SIGNATURES: &[[u8; 4]] = &[
    [0x00, 0x01, 0x00, 0x00], // TrueType
    *b"OTTO",                 // OpenType (CFF)
    *b"true",                 // Apple TrueType
    *b"ttcf",                 // TrueType collection
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontEntry {
    pub family: String,
    pub file: String,
}

/// Set of font families to load, in load order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontManifest {
    entries: Vec<FontEntry>,
}

impl FontManifest {
    /// Empty manifest; `default()` gives the bundled Roboto set
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub fn with_font(mut self, family: impl Into<String>, file: impl Into<String>) -> Self {
        self.entries.push(FontEntry {
            family: family.into(),
            file: file.into(),
        });
        self
    }

    pub fn entries(&self) -> &[FontEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for FontManifest {
    fn default() -> Self {
        DEFAULT_FONTS
            .iter()
            .fold(Self::new(), |m, (family, file)| {
                m.with_font(*family, *file)
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedFont {
    pub family: String,
    pub size: usize,
}

pub struct FontLoader {
    fonts_dir: PathBuf,
}

impl FontLoader {
    pub fn new(fonts_dir: impl Into<PathBuf>) -> Self {
        Self {
            fonts_dir: fonts_dir.into(),
        }
    }

    pub fn fonts_dir(&self) -> &Path {
        &self.fonts_dir
    }

    /// Load every font in the manifest, stopping at the first failure.
    pub async fn load(&self, manifest: &FontManifest) -> Result<Vec<LoadedFont>> {
        info!("🔤 Loading {} fonts...", manifest.len());

        let mut loaded = Vec::with_capacity(manifest.len());
        for entry in manifest.entries() {
            let path = self.fonts_dir.join(&entry.file);
            let bytes = tokio::fs::read(&path)
                .await
                .with_context(|| format!("Failed to load font '{}' from {:?}", entry.family, path))?;

            validate_font(&bytes)
                .with_context(|| format!("Invalid font '{}' at {:?}", entry.family, path))?;

            debug!("   {} ({} bytes)", entry.family, bytes.len());
            loaded.push(LoadedFont {
                family: entry.family.clone(),
                size: bytes.len(),
            });
        }

        Ok(loaded)
    }
}

fn validate_font(bytes: &[u8]) -> Result<()> {
    if bytes.is_empty() {
        bail!("font file is empty");
    }
    if bytes.len() < 4 || !FONT_SIGNATURES.iter().any(|sig| bytes[..4] == sig[..]) {
        bail!("unrecognized font signature");
    }
    Ok(())
}
