//! Bus volume control
//!
//! Volume arrives from the settings collaborator as a 0-100 percentage and is
//! mapped linearly onto bus gain: 0% = 0.0, 100% = 1.0. Out-of-range input is
//! clamped rather than rejected.

/// Volume level for one bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Volume {
    /// Volume level (0-100)
    level: u8,
}

impl Volume {
    /// Maximum level
    pub const MAX: u8 = 100;

    /// Create a volume from any integer percentage, clamping to 0-100
    pub fn from_percent(percent: i32) -> Self {
        Self {
            level: percent.clamp(0, i32::from(Self::MAX)) as u8,
        }
    }

    /// Current level (0-100)
    pub fn level(&self) -> u8 {
        self.level
    }

    /// Linear gain for the bus
    pub fn gain(&self) -> f32 {
        f32::from(self.level) / f32::from(Self::MAX)
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self { level: Self::MAX }
    }
}
