use nalgebra as na;
use serde_derive::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use crate::circular_queue::CircularQueue;
use crate::config::SpeedConfig;
use crate::error::Error;
use crate::math::kmh;
use crate::Detection;

pub const MEDIUM_SPEED_KMH: u32 = 60;
pub const HIGH_SPEED_KMH: u32 = 100;

/// Colour band of the displayed speed.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedBand {
    Low,
    Medium,
    High,
}

impl SpeedBand {
    pub fn from_kmh(kmh: u32) -> Self {
        if kmh < MEDIUM_SPEED_KMH {
            SpeedBand::Low
        } else if kmh < HIGH_SPEED_KMH {
            SpeedBand::Medium
        } else {
            SpeedBand::High
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrackedVehicle {
    pub id: u64,
    /// `(timestamp, position)`, oldest first.
    pub positions: CircularQueue<(f64, na::Point2<f64>)>,
    pub speed_kmh: f64,
}

impl TrackedVehicle {
    fn new(id: u64, window: usize, ts: f64, pos: na::Point2<f64>) -> Self {
        let mut positions = CircularQueue::with_capacity(window);
        positions.push((ts, pos));

        Self {
            id,
            positions,
            speed_kmh: 0.0,
        }
    }

    #[inline]
    pub fn last_position(&self) -> Option<&na::Point2<f64>> {
        self.positions.newest().map(|(_, p)| p)
    }

    /// Speed across the whole window, if the window yields a plausible one.
    pub fn estimate(&self, config: &SpeedConfig) -> Option<f64> {
        if self.positions.len() < config.min_samples {
            return None;
        }

        let (t0, p0) = self.positions.oldest()?;
        let (t1, p1) = self.positions.newest()?;

        let pixels = na::distance(p0, p1);
        let seconds = t1 - t0;

        if seconds <= 0.0 || pixels <= config.min_motion_px {
            tracing::trace!(id = self.id, pixels, seconds, "speed sample skipped");
            return None;
        }

        let speed = kmh(pixels, seconds, config.pixels_per_meter);

        if speed <= config.min_kmh || speed >= config.max_kmh {
            tracing::trace!(id = self.id, speed, "speed sample out of band");
            return None;
        }

        Some(speed)
    }
}

/// Class-agnostic tracker that turns centroid displacement into km/h.
///
/// Identities are private to the estimator. Only vehicles matched or spawned
/// by the latest update survive it, and the last accepted speed of any
/// vehicle becomes the single displayed value.
#[derive(Debug)]
pub struct SpeedEstimator {
    config: SpeedConfig,
    vehicles: BTreeMap<u64, TrackedVehicle>,
    next_id: u64,
    current_kmh: Option<f64>,
}

impl SpeedEstimator {
    pub fn new(config: SpeedConfig) -> Result<Self, Error> {
        config.validate()?;

        Ok(Self {
            config,
            vehicles: BTreeMap::new(),
            next_id: 0,
            current_kmh: None,
        })
    }

    #[inline]
    pub fn config(&self) -> &SpeedConfig {
        &self.config
    }

    #[inline]
    pub fn vehicles(&self) -> impl Iterator<Item = &TrackedVehicle> {
        self.vehicles.values()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    /// Displayed speed in whole km/h, `0` until a sample has been accepted.
    #[inline]
    pub fn current_speed(&self) -> u32 {
        self.current_kmh.map_or(0, |s| s as u32)
    }

    #[inline]
    pub fn current_kmh(&self) -> Option<f64> {
        self.current_kmh
    }

    pub fn band(&self) -> Option<SpeedBand> {
        match self.current_speed() {
            0 => None,
            speed => Some(SpeedBand::from_kmh(speed)),
        }
    }

    fn nearest(&self, pos: &na::Point2<f64>) -> Option<u64> {
        let mut best: Option<(u64, f64)> = None;

        for (&id, vehicle) in &self.vehicles {
            let last = match vehicle.last_position() {
                Some(last) => last,
                None => continue,
            };

            let dist = na::distance(last, pos);

            if dist < self.config.match_distance && best.map_or(true, |(_, d)| dist < d) {
                best = Some((id, dist));
            }
        }

        best.map(|(id, _)| id)
    }

    /// Absorbs one frame of detections observed at `ts` seconds.
    pub fn update(&mut self, detections: &[Detection], ts: f64) {
        let mut seen = HashSet::new();
        let mut spawned = Vec::new();

        for det in detections {
            let pos = det.bbox.center();

            let id = match self.nearest(&pos) {
                Some(id) => id,
                None => {
                    spawned.push(TrackedVehicle::new(
                        self.next_id,
                        self.config.window_size,
                        ts,
                        pos,
                    ));
                    self.next_id += 1;
                    continue;
                }
            };

            seen.insert(id);

            let vehicle = match self.vehicles.get_mut(&id) {
                Some(vehicle) => vehicle,
                None => continue,
            };

            vehicle.positions.push((ts, pos));

            if let Some(speed) = vehicle.estimate(&self.config) {
                tracing::debug!(id, speed, "speed accepted");

                vehicle.speed_kmh = speed;
                self.current_kmh = Some(speed);
            }
        }

        self.vehicles.retain(|id, _| seen.contains(id));
        self.vehicles
            .extend(spawned.into_iter().map(|vehicle| (vehicle.id, vehicle)));
    }

    pub fn reset(&mut self) {
        self.vehicles.clear();
        self.current_kmh = None;
    }
}

impl crate::Tracking for SpeedEstimator {
    #[inline]
    fn update(&mut self, frame: &crate::Frame) {
        SpeedEstimator::update(self, &frame.detections, frame.timestamp);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bbox::BBox;

    fn det(x: i32, y: i32) -> Detection {
        Detection::new(BBox::ltrb(x - 10, y - 10, x + 10, y + 10), "car", 0.9)
    }

    fn estimator() -> SpeedEstimator {
        SpeedEstimator::new(SpeedConfig::default()).unwrap()
    }

    #[test]
    fn bands_break_at_60_and_100() {
        assert_eq!(SpeedBand::from_kmh(59), SpeedBand::Low);
        assert_eq!(SpeedBand::from_kmh(60), SpeedBand::Medium);
        assert_eq!(SpeedBand::from_kmh(99), SpeedBand::Medium);
        assert_eq!(SpeedBand::from_kmh(100), SpeedBand::High);
    }

    #[test]
    fn speed_over_window_ends() {
        let mut est = estimator();
        est.update(&[det(0, 0)], 0.0);
        est.update(&[det(0, 0)], 1.0);
        assert_eq!(est.current_kmh(), None);

        est.update(&[det(88, 0)], 2.0);

        let speed = est.current_kmh().unwrap();
        assert!((speed - 18.0).abs() < 1e-9);
        assert_eq!(est.current_speed(), 18);
        assert_eq!(est.band(), Some(SpeedBand::Low));
        assert_eq!(est.len(), 1);
        assert_eq!(est.vehicles().next().unwrap().positions.len(), 3);
    }

    #[test]
    fn stationary_vehicle_yields_nothing() {
        let mut est = estimator();
        est.update(&[det(50, 50)], 0.0);
        est.update(&[det(50, 50)], 1.0);
        est.update(&[det(52, 51)], 2.0);

        assert_eq!(est.current_kmh(), None);
        assert_eq!(est.current_speed(), 0);
        assert_eq!(est.band(), None);
    }

    #[test]
    fn motion_equal_to_threshold_is_jitter() {
        let mut est = estimator();
        est.update(&[det(0, 0)], 0.0);
        est.update(&[det(3, 0)], 1.0);
        est.update(&[det(5, 0)], 2.0);

        // endpoints exactly 5 px apart
        assert_eq!(est.current_kmh(), None);

        est.update(&[det(6, 0)], 3.0);
        let expected = kmh(6.0, 3.0, 8.8);
        assert!((est.current_kmh().unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn non_positive_elapsed_time_is_skipped() {
        let mut est = estimator();
        est.update(&[det(0, 0)], 5.0);
        est.update(&[det(40, 0)], 5.0);
        est.update(&[det(80, 0)], 5.0);

        assert_eq!(est.current_kmh(), None);
    }

    #[test]
    fn implausible_speed_is_rejected() {
        let mut est = estimator();
        // 90 px per 10 ms is far beyond 200 km/h at 8.8 px/m
        est.update(&[det(0, 0)], 0.0);
        est.update(&[det(90, 0)], 0.01);
        est.update(&[det(180, 0)], 0.02);

        assert_eq!(est.current_kmh(), None);
        assert_eq!(est.vehicles().next().unwrap().speed_kmh, 0.0);
    }

    #[test]
    fn window_keeps_latest_samples() {
        let mut est = estimator();
        for i in 0..15 {
            est.update(&[det(i * 10, 0)], i as f64);
        }

        let vehicle = est.vehicles().next().unwrap();
        assert_eq!(vehicle.positions.len(), 10);
        assert_eq!(vehicle.positions.oldest().unwrap().0, 5.0);

        // 90 px over 9 s
        let expected = kmh(90.0, 9.0, 8.8);
        assert!((vehicle.speed_kmh - expected).abs() < 1e-9);
    }

    #[test]
    fn unmatched_vehicles_are_dropped() {
        let mut est = estimator();
        est.update(&[det(0, 0), det(500, 500)], 0.0);
        assert_eq!(est.len(), 2);

        est.update(&[det(10, 0)], 1.0);
        assert_eq!(est.len(), 1);
        assert_eq!(est.vehicles().next().unwrap().id, 0);

        // beyond the gate: spawns a new vehicle and drops the old one
        est.update(&[det(300, 0)], 2.0);
        assert_eq!(est.len(), 1);
        assert_eq!(est.vehicles().next().unwrap().id, 2);
    }

    #[test]
    fn last_accepted_speed_wins() {
        let mut est = estimator();
        let frames = [
            (0.0, [det(0, 0), det(1000, 0)]),
            (1.0, [det(0, 0), det(1088, 0)]),
            (2.0, [det(88, 0), det(1176, 0)]),
        ];

        for (ts, dets) in frames.iter() {
            est.update(dets, *ts);
        }

        // both vehicles produce a sample, the second detection is processed last
        assert_eq!(est.current_speed(), 36);
        let speeds: Vec<_> = est.vehicles().map(|v| v.speed_kmh.round() as u32).collect();
        assert_eq!(speeds, vec![18, 36]);
    }

    #[test]
    fn reset_clears_display() {
        let mut est = estimator();
        est.update(&[det(0, 0)], 0.0);
        est.update(&[det(0, 0)], 1.0);
        est.update(&[det(88, 0)], 2.0);
        est.reset();

        assert!(est.is_empty());
        assert_eq!(est.current_speed(), 0);
    }

    #[test]
    fn zero_window_is_rejected() {
        let config = SpeedConfig {
            window_size: 0,
            ..Default::default()
        };

        assert!(SpeedEstimator::new(config).is_err());
    }
}
