use log::*;
use serde::{Serialize, Deserialize};

// User config not directly related to model state: editing
// tolerances and limits, saved between sessions.

#[derive(Debug, Clone)]
#[derive(Serialize, Deserialize)]
pub struct Config {
    pub undo_limit :usize,
    pub default_lane_width :f32,
    pub pick_tolerance :f32,
    pub sample_step :f32,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            undo_limit: 100,
            default_lane_width: 3.5,
            pick_tolerance: 1.5,
            sample_step: 1.0,
        }
    }
}

impl Config {
    pub fn load() -> Self {
        confy::load(env!("CARGO_PKG_NAME")).unwrap_or_else(|e| {
            error!("Could not load config file: {}", e);
            Default::default()
        })
    }

    pub fn save(&self) {
        if let Err(e) = confy::store(env!("CARGO_PKG_NAME"), self) {
            error!("Could not save config file: {}", e);
        }
    }
}
