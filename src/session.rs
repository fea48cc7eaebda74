use crate::config::Config;
use crate::counter::LineCounter;
use crate::error::Error;
use crate::registry::ObjectId;
use crate::tracker::CentroidTracker;
use crate::{Frame, Track};

/// What one processed frame produced.
#[derive(Debug, Clone, Default)]
pub struct FrameSummary {
    /// Ids credited to the count during this frame.
    pub crossed: Vec<ObjectId>,
    /// Running total after this frame.
    pub total: u64,
    /// Pixel row of the counting line.
    pub line_y: i32,
}

/// Tracker and line counter driven together, one frame at a time.
#[derive(Debug)]
pub struct CountingSession {
    tracker: CentroidTracker,
    counter: LineCounter,
}

impl CountingSession {
    pub fn new(config: &Config) -> Result<Self, Error> {
        config.validate()?;

        Ok(Self {
            tracker: CentroidTracker::new(config.tracker.clone())?,
            counter: LineCounter::new(&config.counter)?,
        })
    }

    #[inline]
    pub fn tracker(&self) -> &CentroidTracker {
        &self.tracker
    }

    #[inline]
    pub fn counter(&self) -> &LineCounter {
        &self.counter
    }

    #[inline]
    pub fn total(&self) -> u64 {
        self.counter.total()
    }

    /// Resolves the line if needed, updates the tracker, then checks every
    /// live object for a crossing.
    pub fn process(&mut self, frame: &Frame) -> FrameSummary {
        let line_y = self.counter.line_mut().resolve(frame.height());

        self.tracker.update(&frame.detections);

        let registry = self.tracker.registry();
        let crossed = registry
            .ids()
            .into_iter()
            .filter(|&id| self.counter.check(registry, id))
            .collect();

        FrameSummary {
            crossed,
            total: self.counter.total(),
            line_y,
        }
    }

    pub fn tracks(&self) -> Vec<Track> {
        self.tracker
            .registry()
            .iter()
            .map(|obj| Track::new(obj, self.counter.is_counted(obj.id)))
            .collect()
    }

    /// Moves the counting line; it is re-derived from the next frame's height.
    pub fn set_line_position(&mut self, position: f64) -> Result<(), Error> {
        self.counter.line_mut().set_position(position)
    }

    /// Drops all tracked objects and the count. New objects get fresh ids.
    pub fn reset(&mut self) {
        self.tracker.reset();
        self.counter.reset();
    }
}

impl crate::Tracking for CountingSession {
    #[inline]
    fn update(&mut self, frame: &Frame) {
        self.process(frame);
    }
}
