use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::tracker::propagation::{propagate, Propagator};
use crate::tracker::{LocalFrame, TrackerError, Vector3};

pub const TRAIL_POINTS: usize = 30;
pub const TRAIL_PAST_MINUTES: i64 = 15;
pub const TRAIL_STEP_MINUTES: i64 = 1;

fn trail_step() -> Duration {
    Duration::minutes(TRAIL_STEP_MINUTES)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrailPoint {
    pub time: DateTime<Utc>,
    pub earth_fixed: Vector3,
    pub local: Vector3,
}

/// Sliding window of track points around "now", one per minute.
#[derive(Debug, Clone, Default)]
pub struct OrbitTrail {
    points: Option<VecDeque<TrailPoint>>,
    revision: u64,
}

impl OrbitTrail {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the window `[t - 15 min, t + 14 min]`.
    ///
    /// Returns `Ok(false)` without touching the buffer when propagation is
    /// unavailable.
    pub fn initialize(
        &mut self,
        propagator: Option<&Propagator>,
        frame: &LocalFrame,
        t: &DateTime<Utc>,
    ) -> Result<bool, TrackerError> {
        let Some(propagator) = propagator else {
            return Ok(false);
        };

        let start = *t - Duration::minutes(TRAIL_PAST_MINUTES);
        let mut points = VecDeque::with_capacity(TRAIL_POINTS);
        for i in 0..TRAIL_POINTS as i32 {
            let time = start + trail_step() * i;
            points.push_back(project(propagator, frame, &time)?);
        }

        self.points = Some(points);
        self.revision += 1;
        log::debug!("Orbit trail seeded around {}", t);
        Ok(true)
    }

    /// Drop the oldest point and append one a minute past the newest.
    ///
    /// No-op returning `Ok(false)` until the trail has been initialized.
    pub fn advance(
        &mut self,
        propagator: Option<&Propagator>,
        frame: &LocalFrame,
        now: &DateTime<Utc>,
    ) -> Result<bool, TrackerError> {
        let (Some(points), Some(propagator)) = (self.points.as_mut(), propagator) else {
            return Ok(false);
        };
        let Some(newest) = points.back() else {
            return Ok(false);
        };

        let next = newest.time + trail_step();
        let point = project(propagator, frame, &next)?;
        points.pop_front();
        points.push_back(point);
        self.revision += 1;

        let expected_newest = *now + Duration::minutes(TRAIL_POINTS as i64 - TRAIL_PAST_MINUTES - 1);
        if next + trail_step() < expected_newest {
            log::debug!(
                "Orbit trail lags: newest point {} but window should reach {}",
                next,
                expected_newest
            );
        }

        Ok(true)
    }

    pub fn is_initialized(&self) -> bool {
        self.points.is_some()
    }

    pub fn len(&self) -> usize {
        self.points.as_ref().map(VecDeque::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bumped on every change; renderers redraw when it moves.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn points(&self) -> impl Iterator<Item = &TrailPoint> {
        self.points.iter().flatten()
    }

    /// Local-frame polyline for the renderer.
    pub fn vertices(&self) -> Vec<[f64; 3]> {
        self.points().map(|p| p.local.to_array()).collect()
    }

    /// Time covered from the oldest to the newest point.
    pub fn span(&self) -> Option<Duration> {
        let points = self.points.as_ref()?;
        Some(points.back()?.time - points.front()?.time)
    }
}

fn project(
    propagator: &Propagator,
    frame: &LocalFrame,
    t: &DateTime<Utc>,
) -> Result<TrailPoint, TrackerError> {
    let sample = propagate(Some(propagator), t)?
        .ok_or_else(|| TrackerError::Propagation("propagator unavailable".into()))?;
    Ok(TrailPoint {
        time: *t,
        earth_fixed: sample.position,
        local: frame.to_local(sample.position),
    })
}
