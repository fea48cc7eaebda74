use std::collections::HashSet;

use crate::config::{validate_line_position, CounterConfig};
use crate::error::Error;
use crate::registry::{ObjectId, Registry};

/// Horizontal counting line placed at a fraction of the frame height.
///
/// The pixel row is resolved lazily from the first frame seen after creation
/// or after [`CountingLine::set_position`], and then stays fixed.
#[derive(Debug, Clone)]
pub struct CountingLine {
    position: f64,
    y: Option<i32>,
}

impl CountingLine {
    pub fn new(position: f64) -> Result<Self, Error> {
        validate_line_position(position)?;

        Ok(Self { position, y: None })
    }

    #[inline]
    pub fn position(&self) -> f64 {
        self.position
    }

    #[inline]
    pub fn y(&self) -> Option<i32> {
        self.y
    }

    pub fn resolve(&mut self, frame_height: u32) -> i32 {
        let position = self.position;

        *self
            .y
            .get_or_insert_with(|| (frame_height as f64 * position) as i32)
    }

    /// Moves the line; the row is recomputed on the next frame.
    pub fn set_position(&mut self, position: f64) -> Result<(), Error> {
        validate_line_position(position)?;

        self.position = position;
        self.invalidate();

        Ok(())
    }

    #[inline]
    pub fn invalidate(&mut self) {
        self.y = None;
    }
}

/// Counts objects whose centroid moves downward across the line.
#[derive(Debug, Clone)]
pub struct LineCounter {
    line: CountingLine,
    counted: HashSet<ObjectId>,
    total: u64,
}

impl LineCounter {
    pub fn new(config: &CounterConfig) -> Result<Self, Error> {
        Ok(Self {
            line: CountingLine::new(config.line_position)?,
            counted: HashSet::new(),
            total: 0,
        })
    }

    #[inline]
    pub fn line(&self) -> &CountingLine {
        &self.line
    }

    #[inline]
    pub fn line_mut(&mut self) -> &mut CountingLine {
        &mut self.line
    }

    #[inline]
    pub fn total(&self) -> u64 {
        self.total
    }

    #[inline]
    pub fn is_counted(&self, id: ObjectId) -> bool {
        self.counted.contains(&id)
    }

    /// Returns `true` if this call counted `id`.
    ///
    /// Fires when `prev_centroid.y < line <= centroid.y`. Unknown ids, an
    /// unresolved line and already counted ids are no-ops.
    pub fn check(&mut self, registry: &Registry, id: ObjectId) -> bool {
        let line_y = match self.line.y() {
            Some(y) => y,
            None => return false,
        };

        if self.counted.contains(&id) {
            return false;
        }

        let obj = match registry.get(id) {
            Some(obj) => obj,
            None => return false,
        };

        if obj.prev_centroid.y < line_y && line_y <= obj.centroid.y {
            self.counted.insert(id);
            self.total += 1;

            tracing::info!(id, label = %obj.label, total = self.total, "counted");

            return true;
        }

        false
    }

    /// Forgets counted ids and zeroes the total. The line stays where it is.
    pub fn reset(&mut self) {
        self.counted.clear();
        self.total = 0;
    }
}
