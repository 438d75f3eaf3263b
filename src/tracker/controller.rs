use chrono::{DateTime, Duration, Timelike, Utc};
use serde::Serialize;
use strum_macros::Display;

use crate::catalog::{ElementCatalog, LoadHandle};
use crate::tracker::history::{Frame, Interpolation, PositionHistory};
use crate::tracker::propagation::{propagate, Propagator};
use crate::tracker::trail::OrbitTrail;
use crate::tracker::{frames, DisplayUpdate, LocalFrame, TrackerError, Vector3};

pub const DEFAULT_BODY: &str = "ISS (ZARYA)";
/// The marker is drawn this far from the observer regardless of true range.
pub const DEFAULT_DISPLAY_DISTANCE_M: f64 = 1000.0;
const SEED_SPACING_SECONDS: i64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
pub enum TrackingPhase {
    Uninitialized,
    Seeded,
    Tracking,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackerSettings {
    pub body: String,
    pub display_distance_m: f64,
    pub interpolation: Interpolation,
    pub max_history_samples: Option<usize>,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            body: DEFAULT_BODY.to_string(),
            display_distance_m: DEFAULT_DISPLAY_DISTANCE_M,
            interpolation: Interpolation::default(),
            max_history_samples: None,
        }
    }
}

/// Result of one `tick`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickReport {
    pub phase: TrackingPhase,
    pub display: DisplayUpdate,
    /// True when the trail changed and should be redrawn.
    pub trail_changed: bool,
}

/// Owns everything tracked for one body and refreshes it once per UTC minute.
pub struct TrackingController {
    settings: TrackerSettings,
    frame: LocalFrame,
    catalog: Option<ElementCatalog>,
    pending: Option<LoadHandle>,
    propagator: Option<Propagator>,
    history: PositionHistory,
    trail: OrbitTrail,
    phase: TrackingPhase,
    last_minute: Option<u32>,
    last_update: Option<DisplayUpdate>,
}

impl TrackingController {
    pub fn new(settings: TrackerSettings, frame: LocalFrame) -> Self {
        let history =
            PositionHistory::new(settings.interpolation).with_max_samples(settings.max_history_samples);
        Self {
            settings,
            frame,
            catalog: None,
            pending: None,
            propagator: None,
            history,
            trail: OrbitTrail::new(),
            phase: TrackingPhase::Uninitialized,
            last_minute: None,
            last_update: None,
        }
    }

    pub fn phase(&self) -> TrackingPhase {
        self.phase
    }

    pub fn settings(&self) -> &TrackerSettings {
        &self.settings
    }

    pub fn frame(&self) -> &LocalFrame {
        &self.frame
    }

    pub fn catalog(&self) -> Option<&ElementCatalog> {
        self.catalog.as_ref()
    }

    pub fn history(&self) -> &PositionHistory {
        &self.history
    }

    pub fn trail(&self) -> &OrbitTrail {
        &self.trail
    }

    pub fn last_update(&self) -> Option<&DisplayUpdate> {
        self.last_update.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// Wait for `handle` on subsequent ticks, replacing any earlier one.
    pub fn await_catalog(&mut self, handle: LoadHandle) {
        if let Some(previous) = self.pending.replace(handle) {
            log::debug!("Dropping pending TLE load #{}", previous.id());
        }
    }

    /// Store a loaded catalog. Seeding happens on the next tick.
    ///
    /// Ignored once tracking has started; the propagator keeps the elements
    /// it was seeded with.
    pub fn set_catalog(&mut self, catalog: ElementCatalog) {
        if self.propagator.is_some() {
            log::info!(
                "Ignoring new TLE catalog ({} records) while tracking {}",
                catalog.len(),
                self.settings.body
            );
            return;
        }
        if !catalog.contains(&self.settings.body) {
            log::warn!(
                "{} not found among {} loaded TLE records",
                self.settings.body,
                catalog.len()
            );
        }
        self.catalog = Some(catalog);
    }

    /// Drive the controller from the frame clock.
    ///
    /// `observer` is the observer's local-frame position, `None` when the pose
    /// is unknown (the observer is then taken to be at the frame origin).
    pub fn tick(&mut self, now: DateTime<Utc>, observer: Option<Vector3>) -> TickReport {
        self.poll_pending();

        let minute = now.minute();
        let mut trail_changed = false;

        if self.propagator.is_none() {
            match self.try_seed(&now) {
                Ok(seeded) => {
                    if seeded {
                        self.last_minute = Some(minute);
                        trail_changed = true;
                    }
                }
                Err(e) => {
                    log::warn!("Failed to start tracking {}: {}", self.settings.body, e);
                    self.reset();
                }
            }

            return TickReport {
                phase: self.phase,
                display: DisplayUpdate::AwaitingData,
                trail_changed,
            };
        }

        if self.last_minute != Some(minute) {
            self.last_minute = Some(minute);
            trail_changed = self.refresh(&now);
            self.phase = TrackingPhase::Tracking;
        }

        let display = self.display_update(&now, observer);
        TickReport {
            phase: self.phase,
            display,
            trail_changed,
        }
    }

    fn poll_pending(&mut self) {
        let Some(handle) = self.pending.as_mut() else {
            return;
        };
        let Some(result) = handle.try_take() else {
            return;
        };

        let id = handle.id();
        self.pending = None;
        match result {
            Ok(catalog) => {
                log::info!("TLE load #{} complete: {} records", id, catalog.len());
                self.set_catalog(catalog);
            }
            Err(e) => log::warn!("TLE load #{} failed, still waiting for data: {}", id, e),
        }
    }

    fn try_seed(&mut self, now: &DateTime<Utc>) -> Result<bool, TrackerError> {
        let Some(catalog) = self.catalog.as_ref() else {
            return Ok(false);
        };
        let set = catalog
            .get(&self.settings.body)
            .ok_or_else(|| TrackerError::BodyNotFound(self.settings.body.clone()))?;

        let propagator = Propagator::new(set)?;
        let second = *now + Duration::seconds(SEED_SPACING_SECONDS);

        // Two samples so the history can interpolate.
        for t in [*now, second] {
            if let Some(sample) = propagate(Some(&propagator), &t)? {
                self.history.append(sample)?;
            }
        }
        self.trail.initialize(Some(&propagator), &self.frame, &second)?;

        log::info!(
            "Tracking {} (NORAD {}, epoch {})",
            set.name,
            set.norad_id(),
            propagator.epoch()
        );
        self.propagator = Some(propagator);
        self.phase = TrackingPhase::Seeded;
        Ok(true)
    }

    fn reset(&mut self) {
        self.propagator = None;
        self.history.clear();
        self.trail = OrbitTrail::new();
        self.phase = TrackingPhase::Uninitialized;
        // Retrying the same catalog fails the same way; wait for a new load.
        self.catalog = None;
    }

    fn refresh(&mut self, now: &DateTime<Utc>) -> bool {
        let propagator = self.propagator.as_ref();

        match propagate(propagator, now) {
            Ok(Some(sample)) => {
                let newer = self
                    .history
                    .latest()
                    .map(|latest| sample.time > latest.time)
                    .unwrap_or(true);
                if newer {
                    if let Err(e) = self.history.append(sample) {
                        log::warn!("Dropped position sample: {}", e);
                    }
                } else {
                    log::debug!("Skipping sample at {}, history already reaches past it", now);
                }
            }
            Ok(None) => {}
            Err(e) => log::warn!("Propagation failed at {}: {}", now, e),
        }

        match self.trail.advance(propagator, &self.frame, now) {
            Ok(advanced) => advanced,
            Err(e) => {
                log::warn!("Orbit trail not advanced: {}", e);
                false
            }
        }
    }

    fn display_update(&mut self, now: &DateTime<Utc>, observer: Option<Vector3>) -> DisplayUpdate {
        let Some(ecef) = self.history.query(now, Frame::EarthFixed) else {
            return self
                .last_update
                .clone()
                .unwrap_or(DisplayUpdate::AwaitingData);
        };

        let fix = frames::geodetic_from_ecef(ecef);
        let observer = observer.unwrap_or(Vector3::ZERO);
        let line_of_sight = self.frame.to_local(ecef) - observer;
        let range_m = line_of_sight.magnitude();
        let marker = if range_m > 0.0 {
            observer + line_of_sight * (self.settings.display_distance_m / range_m)
        } else {
            observer
        };

        let update = DisplayUpdate::Tracking {
            time: *now,
            fix,
            marker,
            range_m,
        };
        self.last_update = Some(update.clone());
        update
    }
}
