pub mod levels;
pub mod spectrum;

/// Most bands any visualization mode will ever draw.
pub const MAX_VIZ_BANDS: usize = 40;
