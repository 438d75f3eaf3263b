//! Satellite trajectory tracking: TLE catalog loading, SGP4 propagation into
//! the Earth-fixed frame, an interpolating position history, and a sliding
//! orbit trail refreshed once per minute for display.

pub mod catalog;
pub mod config;
pub mod tracker;
