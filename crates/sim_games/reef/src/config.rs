use serde::{Deserialize, Serialize};

/// Runtime-tunable economy and simulation constants.
///
/// Every field has a default, so a config file only needs the values it
/// overrides.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    // Economy
    pub starting_gold: u32,
    pub starting_lives: i32,

    // Wave scheduling
    pub auto_start_waves: bool,
    /// Ceiling of the early-start streak multiplier.
    pub early_start_streak_cap: f32,
    /// Remaining countdown at or below which there is nothing left to reward.
    pub early_start_epsilon: f32,

    // Combat
    pub min_fire_interval: f32,
    pub projectile_hit_radius: f32,
    pub default_crit_multiplier: f32,

    // Unit skills
    pub default_shield_ratio: f32,
    pub summon_speed_multiplier: f32,
    pub split_speed_multiplier: f32,

    // Stage results
    pub three_star_lives: i32,
    pub two_star_lives: i32,
    pub clear_reward_base: u32,
    pub clear_reward_per_wave: u32,
    pub clear_reward_per_star: u32,
}

impl SimConfig {
    /// Stars earned for clearing a stage with `lives` remaining.
    pub fn stars_for_lives(&self, lives: i32) -> u8 {
        if lives >= self.three_star_lives {
            3
        } else if lives >= self.two_star_lives {
            2
        } else {
            1
        }
    }

    /// Gold paid once when a stage is cleared.
    pub fn clear_reward(&self, waves: u32, kills: u32, stars: u8) -> u32 {
        self.clear_reward_base
            + self.clear_reward_per_wave * waves
            + kills
            + self.clear_reward_per_star * u32::from(stars)
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            starting_gold: 120,
            starting_lives: 20,

            auto_start_waves: true,
            early_start_streak_cap: 1.75,
            early_start_epsilon: 0.02,

            min_fire_interval: 0.08,
            projectile_hit_radius: 6.0,
            default_crit_multiplier: 1.8,

            default_shield_ratio: 0.16,
            summon_speed_multiplier: 1.08,
            split_speed_multiplier: 1.05,

            three_star_lives: 18,
            two_star_lives: 10,
            clear_reward_base: 40,
            clear_reward_per_wave: 5,
            clear_reward_per_star: 20,
        }
    }
}
