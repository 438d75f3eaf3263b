mod controller;
mod error;
pub mod frames;
mod history;
pub mod propagation;
mod trail;
mod types;

pub use controller::{
    TickReport, TrackerSettings, TrackingController, TrackingPhase, DEFAULT_BODY,
    DEFAULT_DISPLAY_DISTANCE_M,
};
pub use error::TrackerError;
pub use frames::LocalFrame;
pub use history::{Frame, Interpolation, PositionHistory};
pub use propagation::{propagate, CalendarFields, Propagator};
pub use trail::{OrbitTrail, TrailPoint, TRAIL_POINTS};
pub use types::{DisplayUpdate, GeodeticFix, PositionSample, Vector3};
