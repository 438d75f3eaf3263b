use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike, Utc};
use sgp4::{Constants, Elements};

use crate::catalog::OrbitalElementSet;
use crate::tracker::frames::EARTH_ROTATION_RAD_S;
use crate::tracker::{PositionSample, TrackerError, Vector3};

pub const METERS_PER_KM: f64 = 1000.0;

/// Calendar decomposition of an instant as the SGP4 primitive expects it.
///
/// `month` is 1-based (January = 1). chrono's `month0()` is the 0-based
/// variant; it must never be passed here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarFields {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    pub nanosecond: u32,
}

impl CalendarFields {
    pub fn from_instant(t: &DateTime<Utc>) -> Self {
        Self {
            year: t.year(),
            month: t.month0() + 1,
            day: t.day(),
            hour: t.hour(),
            minute: t.minute(),
            second: t.second(),
            nanosecond: t.nanosecond(),
        }
    }

    pub fn to_naive(&self) -> Result<NaiveDateTime, TrackerError> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
            .and_then(|d| d.and_hms_nano_opt(self.hour, self.minute, self.second, self.nanosecond))
            .ok_or_else(|| TrackerError::InvalidInstant(format!("{:?}", self)))
    }
}

/// Raw SGP4 output in the TEME frame, km and km/s.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InertialState {
    pub position_km: [f64; 3],
    pub velocity_km_s: [f64; 3],
}

/// Propagation state for one tracked body.
pub struct Propagator {
    name: String,
    elements: Elements,
    constants: Constants,
}

impl Propagator {
    pub fn new(set: &OrbitalElementSet) -> Result<Self, TrackerError> {
        let constants = Constants::from_elements(&set.elements)?;
        Ok(Self {
            name: set.name.clone(),
            elements: set.elements.clone(),
            constants,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn epoch(&self) -> NaiveDateTime {
        self.elements.datetime
    }

    pub fn inertial_at(&self, t: &DateTime<Utc>) -> Result<InertialState, TrackerError> {
        let timestamp = CalendarFields::from_instant(t).to_naive()?;
        let minutes = self
            .elements
            .datetime_to_minutes_since_epoch(&timestamp)
            .map_err(|e| TrackerError::Propagation(e.to_string()))?;
        let prediction = self.constants.propagate(minutes)?;

        Ok(InertialState {
            position_km: prediction.position,
            velocity_km_s: prediction.velocity,
        })
    }

    /// Earth-fixed position and velocity at `t`, in meters.
    pub fn sample_at(&self, t: &DateTime<Utc>) -> Result<PositionSample, TrackerError> {
        let inertial = self.inertial_at(t)?;
        let sidereal = gmst(t)?;

        let position = teme_to_ecef_position(inertial.position_km, sidereal);
        let velocity =
            teme_to_ecef_velocity(inertial.position_km, inertial.velocity_km_s, sidereal);

        Ok(PositionSample {
            time: *t,
            position: Vector3::from(position) * METERS_PER_KM,
            velocity: Vector3::from(velocity) * METERS_PER_KM,
        })
    }
}

/// Propagate if an element set is loaded. `Ok(None)` means propagation is
/// unavailable, which is the normal state before the catalog arrives.
pub fn propagate(
    propagator: Option<&Propagator>,
    t: &DateTime<Utc>,
) -> Result<Option<PositionSample>, TrackerError> {
    propagator.map(|p| p.sample_at(t)).transpose()
}

/// Greenwich mean sidereal time in radians.
pub fn gmst(t: &DateTime<Utc>) -> Result<f64, TrackerError> {
    let timestamp = CalendarFields::from_instant(t).to_naive()?;
    Ok(sgp4::iau_epoch_to_sidereal_time(
        sgp4::julian_years_since_j2000(&timestamp),
    ))
}

pub fn teme_to_ecef_position(pos_teme: [f64; 3], gmst: f64) -> [f64; 3] {
    let cos_gmst = gmst.cos();
    let sin_gmst = gmst.sin();
    [
        pos_teme[0] * cos_gmst + pos_teme[1] * sin_gmst,
        -pos_teme[0] * sin_gmst + pos_teme[1] * cos_gmst,
        pos_teme[2],
    ]
}

/// Rotates into the Earth-fixed frame and removes the ω×r term.
pub fn teme_to_ecef_velocity(pos_teme: [f64; 3], vel_teme: [f64; 3], gmst: f64) -> [f64; 3] {
    let pos = teme_to_ecef_position(pos_teme, gmst);
    let rotated = teme_to_ecef_position(vel_teme, gmst);
    [
        rotated[0] + EARTH_ROTATION_RAD_S * pos[1],
        rotated[1] - EARTH_ROTATION_RAD_S * pos[0],
        rotated[2],
    ]
}
