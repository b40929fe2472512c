use serde::Deserialize;
use std::path::PathBuf;

use crate::viz::MAX_VIZ_BANDS;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub viz: VizConfig,
}

/// Visualization settings. Out-of-range values are clamped at the point
/// of use, so a hand-edited file never panics the player.
#[derive(Debug, Clone, Deserialize)]
pub struct VizConfig {
    #[serde(default = "default_bands")]
    pub bands: usize,
    #[serde(default)]
    pub mode: VizMode,
    #[serde(default = "default_peak_hold")]
    pub peak_hold: u32,
    #[serde(default = "default_gradient")]
    pub gradient: bool,
}

impl VizConfig {
    pub fn clamped_bands(&self) -> usize {
        self.bands.clamp(1, MAX_VIZ_BANDS)
    }

    pub fn clamped_peak_hold(&self) -> u32 {
        self.peak_hold.min(300)
    }
}

impl Default for VizConfig {
    fn default() -> Self {
        Self {
            bands: default_bands(),
            mode: VizMode::default(),
            peak_hold: default_peak_hold(),
            gradient: default_gradient(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VizMode {
    #[default]
    Bars,
    Dots,
    Line,
    VuMeter,
    FftBars,
}

fn default_bands() -> usize { MAX_VIZ_BANDS }
fn default_peak_hold() -> u32 { 30 }
fn default_gradient() -> bool { true }

pub fn load_config(path: &PathBuf) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    toml::from_str(&content).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.viz.bands, 40);
        assert_eq!(cfg.viz.mode, VizMode::Bars);
        assert_eq!(cfg.viz.peak_hold, 30);
        assert!(cfg.viz.gradient);
    }

    #[test]
    fn full_table_parses() {
        let cfg: Config = toml::from_str(
            "[viz]\nbands = 20\nmode = \"vu_meter\"\npeak_hold = 60\ngradient = false\n",
        )
        .unwrap();
        assert_eq!(cfg.viz.bands, 20);
        assert_eq!(cfg.viz.mode, VizMode::VuMeter);
        assert_eq!(cfg.viz.peak_hold, 60);
        assert!(!cfg.viz.gradient);
    }

    #[test]
    fn out_of_range_values_clamp() {
        let cfg: Config = toml::from_str("[viz]\nbands = 500\npeak_hold = 9000\n").unwrap();
        assert_eq!(cfg.viz.clamped_bands(), 40);
        assert_eq!(cfg.viz.clamped_peak_hold(), 300);

        let cfg: Config = toml::from_str("[viz]\nbands = 0\n").unwrap();
        assert_eq!(cfg.viz.clamped_bands(), 1);
    }

    #[test]
    fn missing_file_is_none() {
        assert!(load_config(&PathBuf::from("/nonexistent/minijuke.toml")).is_none());
    }
}
