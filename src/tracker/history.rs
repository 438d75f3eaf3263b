use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::tracker::{LocalFrame, PositionSample, TrackerError, Vector3};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
    /// Straight line between the bracketing samples.
    #[default]
    Linear,
    /// Cubic Hermite using both samples' velocities.
    Hermite,
}

/// Frame a history query is answered in.
#[derive(Debug, Clone, Copy)]
pub enum Frame<'a> {
    EarthFixed,
    Local(&'a LocalFrame),
}

/// Time-ordered Earth-fixed samples of one body.
///
/// Grows without bound unless a sample cap is set; the cap never drops
/// below two samples so interpolation stays possible.
#[derive(Debug, Clone, Default)]
pub struct PositionHistory {
    samples: VecDeque<PositionSample>,
    interpolation: Interpolation,
    max_samples: Option<usize>,
}

impl PositionHistory {
    pub fn new(interpolation: Interpolation) -> Self {
        Self {
            samples: VecDeque::new(),
            interpolation,
            max_samples: None,
        }
    }

    pub fn with_max_samples(mut self, max_samples: Option<usize>) -> Self {
        self.max_samples = max_samples.map(|m| m.max(2));
        self
    }

    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn earliest(&self) -> Option<&PositionSample> {
        self.samples.front()
    }

    pub fn latest(&self) -> Option<&PositionSample> {
        self.samples.back()
    }

    pub fn samples(&self) -> impl Iterator<Item = &PositionSample> {
        self.samples.iter()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Append a sample strictly newer than the current newest one.
    pub fn append(&mut self, sample: PositionSample) -> Result<(), TrackerError> {
        if let Some(latest) = self.samples.back() {
            if sample.time <= latest.time {
                return Err(TrackerError::NonMonotonicSample {
                    previous: latest.time,
                    attempted: sample.time,
                });
            }
        }

        self.samples.push_back(sample);

        if let Some(max) = self.max_samples {
            while self.samples.len() > max {
                self.samples.pop_front();
            }
        }

        Ok(())
    }

    /// Position at `t`, interpolated between samples or extrapolated past the
    /// newest one. `None` when empty or when `t` precedes the first sample.
    pub fn query(&self, t: &DateTime<Utc>, frame: Frame<'_>) -> Option<Vector3> {
        let position = self.query_earth_fixed(t)?;
        Some(match frame {
            Frame::EarthFixed => position,
            Frame::Local(local) => local.to_local(position),
        })
    }

    fn query_earth_fixed(&self, t: &DateTime<Utc>) -> Option<Vector3> {
        let first = self.samples.front()?;
        let last = self.samples.back()?;

        if *t < first.time {
            return None;
        }
        if *t >= last.time {
            if *t == last.time {
                return Some(last.position);
            }
            return Some(last.position + last.velocity * seconds_between(&last.time, t));
        }

        // first.time <= t < last.time, so 1 <= idx < len
        let idx = self.samples.partition_point(|s| s.time <= *t);
        let a = &self.samples[idx - 1];
        let b = &self.samples[idx];
        if a.time == *t {
            return Some(a.position);
        }

        let span = seconds_between(&a.time, &b.time);
        let elapsed = seconds_between(&a.time, t);
        Some(match self.interpolation {
            Interpolation::Linear => lerp(a.position, b.position, elapsed / span),
            Interpolation::Hermite => hermite(a, b, elapsed, span),
        })
    }
}

pub(crate) fn seconds_between(from: &DateTime<Utc>, to: &DateTime<Utc>) -> f64 {
    let delta = *to - *from;
    match delta.num_nanoseconds() {
        Some(ns) => ns as f64 / 1e9,
        None => delta.num_milliseconds() as f64 / 1e3,
    }
}

fn lerp(a: Vector3, b: Vector3, s: f64) -> Vector3 {
    a + (b - a) * s
}

fn hermite(a: &PositionSample, b: &PositionSample, elapsed: f64, span: f64) -> Vector3 {
    let s = elapsed / span;
    let s2 = s * s;
    let s3 = s2 * s;
    let h00 = 2.0 * s3 - 3.0 * s2 + 1.0;
    let h10 = s3 - 2.0 * s2 + s;
    let h01 = -2.0 * s3 + 3.0 * s2;
    let h11 = s3 - s2;

    a.position * h00 + a.velocity * (h10 * span) + b.position * h01 + b.velocity * (h11 * span)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 5, 12, 0, 0).unwrap()
    }

    fn sample(offset_s: i64, position: Vector3, velocity: Vector3) -> PositionSample {
        PositionSample {
            time: t0() + Duration::seconds(offset_s),
            position,
            velocity,
        }
    }

    fn two_sample_history(interpolation: Interpolation) -> PositionHistory {
        let mut history = PositionHistory::new(interpolation);
        history
            .append(sample(
                0,
                Vector3::new(6_700_000.0, 0.0, 0.0),
                Vector3::new(0.0, 7_600.0, 0.0),
            ))
            .unwrap();
        history
            .append(sample(
                60,
                Vector3::new(6_684_000.0, 455_000.0, 12_000.0),
                Vector3::new(-530.0, 7_580.0, 400.0),
            ))
            .unwrap();
        history
    }

    #[test]
    fn rejects_out_of_order_and_duplicate_samples() {
        let mut history = two_sample_history(Interpolation::Linear);

        let duplicate = sample(60, Vector3::ZERO, Vector3::ZERO);
        assert!(matches!(
            history.append(duplicate),
            Err(TrackerError::NonMonotonicSample { .. })
        ));
        let older = sample(30, Vector3::ZERO, Vector3::ZERO);
        assert!(history.append(older).is_err());
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn empty_history_has_no_position() {
        let history = PositionHistory::new(Interpolation::Linear);
        assert!(history.query(&t0(), Frame::EarthFixed).is_none());
    }

    #[test]
    fn no_backward_extrapolation() {
        let history = two_sample_history(Interpolation::Linear);
        let before = t0() - Duration::seconds(1);
        assert!(history.query(&before, Frame::EarthFixed).is_none());
    }

    #[test]
    fn linear_query_stays_inside_bracketing_envelope() {
        let history = two_sample_history(Interpolation::Linear);
        let a = history.earliest().unwrap().position;
        let b = history.latest().unwrap().position;

        for ms in (1..60_000).step_by(997) {
            let t = t0() + Duration::milliseconds(ms);
            let p = history.query(&t, Frame::EarthFixed).unwrap();
            for (v, lo, hi) in [(p.x, a.x, b.x), (p.y, a.y, b.y), (p.z, a.z, b.z)] {
                assert!(v >= lo.min(hi) && v <= lo.max(hi), "{v} outside [{lo}, {hi}]");
            }
        }
    }

    #[test]
    fn sample_times_return_stored_positions_exactly() {
        for interpolation in [Interpolation::Linear, Interpolation::Hermite] {
            let history = two_sample_history(interpolation);
            let first = *history.earliest().unwrap();
            let last = *history.latest().unwrap();
            assert_eq!(history.query(&first.time, Frame::EarthFixed), Some(first.position));
            assert_eq!(history.query(&last.time, Frame::EarthFixed), Some(last.position));
        }
    }

    #[test]
    fn hermite_follows_velocity_at_endpoints() {
        let history = two_sample_history(Interpolation::Hermite);
        let first = *history.earliest().unwrap();
        let dt = 0.001;
        let t = first.time + Duration::milliseconds(1);
        let p = history.query(&t, Frame::EarthFixed).unwrap();
        let slope = (p - first.position) * (1.0 / dt);
        assert!((slope - first.velocity).magnitude() < 1.0, "slope {slope:?}");
    }

    #[test]
    fn extrapolates_twenty_minutes_past_last_sample() {
        let history = two_sample_history(Interpolation::Linear);
        let last = *history.latest().unwrap();
        let t = last.time + Duration::minutes(20);

        let p = history.query(&t, Frame::EarthFixed).unwrap();
        let expected = last.position + last.velocity * 1200.0;
        assert!((p - expected).magnitude() < 1e-6);
    }

    #[test]
    fn local_frame_query_projects_position() {
        let history = two_sample_history(Interpolation::Linear);
        let frame = LocalFrame::new(0.0, 0.0, 0.0);
        let t = t0();

        let local = history.query(&t, Frame::Local(&frame)).unwrap();
        let ecef = history.query(&t, Frame::EarthFixed).unwrap();
        assert_eq!(local, frame.to_local(ecef));
        // Straight above the equator/prime meridian origin.
        assert!(local.y > 300_000.0);
        assert!(local.x.abs() < 1e-6 && local.z.abs() < 1e-6);
    }

    #[test]
    fn sample_cap_evicts_oldest() {
        let mut history = PositionHistory::new(Interpolation::Linear).with_max_samples(Some(3));
        for i in 0..5 {
            history
                .append(sample(i * 60, Vector3::new(i as f64, 0.0, 0.0), Vector3::ZERO))
                .unwrap();
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.earliest().unwrap().time, t0() + Duration::minutes(2));
    }

    #[test]
    fn sample_cap_keeps_at_least_two() {
        let mut history = PositionHistory::new(Interpolation::Linear).with_max_samples(Some(1));
        for i in 0..4 {
            history
                .append(sample(i, Vector3::ZERO, Vector3::ZERO))
                .unwrap();
        }
        assert_eq!(history.len(), 2);
    }
}
