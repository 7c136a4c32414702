use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::world::person::Faction;

/// A starting tribe: `population` placement attempts inside an inclusive region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TribeConfig {
    pub faction: Faction,
    pub upper_left: [u32; 2],
    pub lower_right: [u32; 2],
    pub population: u32,
}

/// Parameters used to build a new world. Stored with the world for reproducibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldgenParams {
    /// 0 picks a random seed.
    #[serde(default)]
    pub seed: u64,
    #[serde(default = "default_water_ratio")]
    pub water_ratio: f32,
    #[serde(default = "default_mountain_ratio")]
    pub mountain_ratio: f32,
    #[serde(default = "default_terrain_roughness")]
    pub terrain_roughness: f32,
    #[serde(default = "default_tribes")]
    pub tribes: Vec<TribeConfig>,
}

fn default_water_ratio() -> f32 {
    0.55
}

fn default_mountain_ratio() -> f32 {
    0.05
}

fn default_terrain_roughness() -> f32 {
    0.5
}

fn default_tribes() -> Vec<TribeConfig> {
    vec![
        TribeConfig {
            faction: Faction::Red,
            upper_left: [380, 60],
            lower_right: [400, 80],
            population: 50,
        },
        TribeConfig {
            faction: Faction::Blue,
            upper_left: [400, 110],
            lower_right: [420, 130],
            population: 50,
        },
    ]
}

impl Default for WorldgenParams {
    fn default() -> Self {
        WorldgenParams {
            seed: 0,
            water_ratio: default_water_ratio(),
            mountain_ratio: default_mountain_ratio(),
            terrain_roughness: default_terrain_roughness(),
            tribes: default_tribes(),
        }
    }
}

impl WorldgenParams {
    /// Load world generation parameters from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Cannot read {}: {}", path.display(), e))?;
        let params: Self = toml::from_str(&content)
            .map_err(|e| format!("Invalid TOML in {}: {}", path.display(), e))?;
        params.validate()?;
        Ok(params)
    }

    /// Validate parameter ranges.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.water_ratio) {
            return Err(format!(
                "water_ratio must be 0.0-1.0, got {}",
                self.water_ratio
            ));
        }
        if !(0.0..=1.0).contains(&self.mountain_ratio) {
            return Err(format!(
                "mountain_ratio must be 0.0-1.0, got {}",
                self.mountain_ratio
            ));
        }
        if self.terrain_roughness <= 0.0 {
            return Err(format!(
                "terrain_roughness must be > 0.0, got {}",
                self.terrain_roughness
            ));
        }
        for (i, tribe) in self.tribes.iter().enumerate() {
            if tribe.upper_left[0] > tribe.lower_right[0]
                || tribe.upper_left[1] > tribe.lower_right[1]
            {
                return Err(format!(
                    "tribes[{}] ({:?}): upper_left {:?} must not exceed lower_right {:?}",
                    i, tribe.faction, tribe.upper_left, tribe.lower_right
                ));
            }
        }
        Ok(())
    }
}
