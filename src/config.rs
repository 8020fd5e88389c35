use std::path::{Path, PathBuf};

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

use crate::effect::EffectParams;
use crate::events::{EffectBinding, EffectSources};
use crate::processing::pointer::DEFAULT_SMOOTHING;

/// One `(image, depth map)` pair to bind an effect to.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct EffectEntry {
    /// Base image shown through the effect.
    pub image: PathBuf,
    /// Grayscale depth map; red channel is read, 0 = far, 1 = near.
    pub depth_map: PathBuf,
    /// Window title; defaults to the image file stem.
    #[serde(default)]
    pub title: Option<String>,
}

impl EffectEntry {
    pub fn display_title(&self) -> String {
        self.title.clone().unwrap_or_else(|| {
            self.image
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "depth-parallax".to_string())
        })
    }

    pub fn sources(&self) -> EffectSources {
        EffectSources {
            image: self.image.clone(),
            depth_map: self.depth_map.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct WindowOptions {
    /// Initial inner width in logical pixels.
    pub width: u32,
    /// Initial inner height in logical pixels.
    pub height: u32,
    /// Borderless fullscreen on the current monitor.
    pub fullscreen: bool,
}

impl Default for WindowOptions {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fullscreen: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Configuration {
    /// Effects to bind, one window each.
    pub effects: Vec<EffectEntry>,
    /// Maximum texture-space displacement at full depth and full deflection.
    pub parallax_strength: f32,
    /// Fraction of the remaining pointer distance covered per frame.
    pub smoothing: f32,
    pub window: WindowOptions,
}

impl Default for Configuration {
    fn default() -> Self {
        let params = EffectParams::default();
        Self {
            effects: Vec::new(),
            parallax_strength: params.parallax_strength,
            smoothing: DEFAULT_SMOOTHING,
            window: WindowOptions::default(),
        }
    }
}

impl Configuration {
    /// Read a YAML config; relative asset paths resolve against its directory.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let mut cfg: Self = serde_yaml::from_str(&s)?;
        if let Some(base) = path.parent() {
            cfg.resolve_relative_to(base);
        }
        Ok(cfg)
    }

    pub fn resolve_relative_to(&mut self, base: &Path) {
        for entry in &mut self.effects {
            if entry.image.is_relative() {
                entry.image = base.join(&entry.image);
            }
            if entry.depth_map.is_relative() {
                entry.depth_map = base.join(&entry.depth_map);
            }
        }
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self> {
        ensure!(!self.effects.is_empty(), "at least one effect must be configured");
        ensure!(
            self.parallax_strength.is_finite() && self.parallax_strength >= 0.0,
            "parallax-strength must be a non-negative number"
        );
        ensure!(
            self.smoothing.is_finite() && self.smoothing > 0.0 && self.smoothing <= 1.0,
            "smoothing must be in (0, 1]"
        );
        ensure!(
            self.window.width > 0 && self.window.height > 0,
            "window width and height must be greater than zero"
        );
        Ok(self)
    }

    pub fn bindings(&self) -> Vec<EffectBinding> {
        self.effects
            .iter()
            .map(|entry| EffectBinding {
                title: entry.display_title(),
                sources: entry.sources(),
            })
            .collect()
    }

    pub fn effect_params(&self) -> EffectParams {
        EffectParams {
            parallax_strength: self.parallax_strength,
            smoothing: self.smoothing,
        }
    }
}
