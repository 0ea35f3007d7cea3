//! Timed per-unit modifiers.
//!
//! Effects are appended, never merged: two slows of different strength both
//! stay on the unit until each runs out. Resolution rules differ per kind:
//! slows take the strongest (lowest) multiplier, armor breaks take the largest
//! single bonus, burns sum.

use crate::catalog::{ArmorBreakSpec, BurnSpec, SlowSpec};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Timed<T> {
    pub effect: T,
    pub remaining: f32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct StatusEffects {
    pub slows: Vec<Timed<SlowSpec>>,
    pub burns: Vec<Timed<BurnSpec>>,
    pub armor_breaks: Vec<Timed<ArmorBreakSpec>>,
}

fn decay<T>(effects: &mut Vec<Timed<T>>, dt: f32) {
    for timed in effects.iter_mut() {
        timed.remaining -= dt;
    }
    effects.retain(|timed| timed.remaining > 0.0);
}

impl StatusEffects {
    pub fn apply_slow(&mut self, slow: SlowSpec) {
        self.slows.push(Timed {
            effect: slow,
            remaining: slow.duration,
        });
    }

    pub fn apply_burn(&mut self, burn: BurnSpec) {
        self.burns.push(Timed {
            effect: burn,
            remaining: burn.duration,
        });
    }

    pub fn apply_armor_break(&mut self, armor_break: ArmorBreakSpec) {
        self.armor_breaks.push(Timed {
            effect: armor_break,
            remaining: armor_break.duration,
        });
    }

    /// Decays every effect by `dt`, drops expired ones and returns the burn
    /// damage dealt over this tick (`Σ dps × dt` over burns active at its start).
    pub fn tick(&mut self, dt: f32) -> f32 {
        let burn_damage = self.burns.iter().map(|b| b.effect.dps * dt).sum();
        decay(&mut self.slows, dt);
        decay(&mut self.burns, dt);
        decay(&mut self.armor_breaks, dt);
        burn_damage
    }

    /// Movement multiplier for this tick; 1.0 when unslowed.
    pub fn slow_multiplier(&self) -> f32 {
        self.slows
            .iter()
            .map(|s| s.effect.multiplier)
            .fold(1.0_f32, f32::min)
            .max(0.0)
    }

    pub fn strongest_armor_break(&self) -> f32 {
        self.armor_breaks
            .iter()
            .map(|a| a.effect.amount)
            .fold(0.0_f32, f32::max)
    }

    pub fn effective_armor_ratio(&self, base: f32) -> f32 {
        (base + self.strongest_armor_break()).clamp(0.0, 1.0)
    }

    pub fn is_slowed(&self) -> bool {
        !self.slows.is_empty()
    }

    pub fn is_burning(&self) -> bool {
        !self.burns.is_empty()
    }
}
