/// Converts raw wall-clock frame deltas into simulated seconds.
///
/// Long frame gaps are clamped to `max_dt` before scaling so a stalled frame
/// never produces one huge, unstable step. While paused or while a blocking
/// menu is open the simulated delta is exactly zero.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameClock {
    max_dt: f32,
    time_scale: f32,
    paused: bool,
    menu_open: bool,
}

impl FrameClock {
    pub const DEFAULT_MAX_DT: f32 = 0.05;

    pub const fn new(max_dt: f32) -> Self {
        Self {
            max_dt,
            time_scale: 1.0,
            paused: false,
            menu_open: false,
        }
    }

    /// Simulated seconds for a frame that took `raw_dt` real seconds.
    pub fn sim_dt(&self, raw_dt: f32) -> f32 {
        if self.is_gated() || !raw_dt.is_finite() {
            return 0.0;
        }
        raw_dt.clamp(0.0, self.max_dt) * self.time_scale
    }

    pub fn is_gated(&self) -> bool {
        self.paused || self.menu_open
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        self.paused
    }

    pub fn set_menu_open(&mut self, open: bool) {
        self.menu_open = open;
    }

    /// Sets the speed multiplier. Non-positive or non-finite values fall back to 1.
    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = if scale.is_finite() && scale > 0.0 {
            scale
        } else {
            1.0
        };
    }

    /// Flips between normal and double speed.
    pub fn toggle_fast_forward(&mut self) -> f32 {
        self.time_scale = if self.time_scale > 1.0 { 1.0 } else { 2.0 };
        self.time_scale
    }

    pub const fn time_scale(&self) -> f32 {
        self.time_scale
    }

    pub const fn max_dt(&self) -> f32 {
        self.max_dt
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_DT)
    }
}
