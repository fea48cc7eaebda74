use serde_derive::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::error::Error;

pub const MIN_LINE_POSITION: f64 = 0.2;
pub const MAX_LINE_POSITION: f64 = 0.8;

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub tracker: TrackerConfig,
    pub filter: FilterConfig,
    pub counter: CounterConfig,
    pub speed: SpeedConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct TrackerConfig {
    /// Frames an object may go unmatched before it is evicted.
    pub max_disappeared: u32,
    /// Matching gate in pixels; a candidate must be strictly closer.
    pub max_distance: f64,
    /// Human-readable names per class label, used for display labels.
    pub display_names: HashMap<String, String>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_disappeared: 40,
            max_distance: 80.0,
            display_names: HashMap::new(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct FilterConfig {
    pub min_confidence: f32,
    pub allowed_classes: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.65,
            allowed_classes: [
                "car",
                "truck",
                "bus",
                "motorcycle",
                "person",
                "bicycle",
                "cat",
                "dog",
            ]
            .iter()
            .map(|c| c.to_string())
            .collect(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct CounterConfig {
    /// Counting line as a fraction of the frame height.
    pub line_position: f64,
}

impl Default for CounterConfig {
    fn default() -> Self {
        Self {
            line_position: 0.55,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct SpeedConfig {
    /// Matching gate in pixels, ignores class.
    pub match_distance: f64,
    pub window_size: usize,
    pub min_samples: usize,
    pub min_motion_px: f64,
    pub pixels_per_meter: f64,
    pub fps: f64,
    /// Accepted speeds lie strictly between `min_kmh` and `max_kmh`.
    pub min_kmh: f64,
    pub max_kmh: f64,
}

impl Default for SpeedConfig {
    fn default() -> Self {
        Self {
            match_distance: 100.0,
            window_size: 10,
            min_samples: 3,
            min_motion_px: 5.0,
            pixels_per_meter: 8.8,
            fps: 30.0,
            min_kmh: 0.0,
            max_kmh: 200.0,
        }
    }
}

impl SpeedConfig {
    /// Timestamp of the `index`-th frame of a recording played at `fps`.
    #[inline]
    pub fn frame_timestamp(&self, index: u64) -> f64 {
        index as f64 / self.fps
    }

    pub fn validate(&self) -> Result<(), Error> {
        if !(self.match_distance > 0.0) {
            return Err(Error::config("speed.match_distance", "must be positive"));
        }

        if self.window_size == 0 {
            return Err(Error::config("speed.window_size", "must be positive"));
        }

        if self.min_samples < 2 {
            return Err(Error::config("speed.min_samples", "must be at least 2"));
        }

        if self.window_size < self.min_samples {
            return Err(Error::config(
                "speed.window_size",
                format!("must hold at least {} samples", self.min_samples),
            ));
        }

        if !(self.pixels_per_meter > 0.0) {
            return Err(Error::config("speed.pixels_per_meter", "must be positive"));
        }

        if !(self.fps > 0.0) {
            return Err(Error::config("speed.fps", "must be positive"));
        }

        if !(self.max_kmh > self.min_kmh) {
            return Err(Error::config("speed.max_kmh", "must exceed min_kmh"));
        }

        Ok(())
    }
}

impl TrackerConfig {
    pub fn validate(&self) -> Result<(), Error> {
        if !(self.max_distance > 0.0) {
            return Err(Error::config("tracker.max_distance", "must be positive"));
        }

        Ok(())
    }

    /// Name shown for `class`; falls back to the label with a capitalised first letter.
    pub fn display_name(&self, class: &str) -> String {
        if let Some(name) = self.display_names.get(class) {
            return name.clone();
        }

        let mut chars = class.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

impl FilterConfig {
    pub fn validate(&self) -> Result<(), Error> {
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(Error::config(
                "filter.min_confidence",
                "must lie within [0, 1]",
            ));
        }

        Ok(())
    }
}

impl CounterConfig {
    pub fn validate(&self) -> Result<(), Error> {
        validate_line_position(self.line_position)
    }
}

pub(crate) fn validate_line_position(position: f64) -> Result<(), Error> {
    if !(MIN_LINE_POSITION..=MAX_LINE_POSITION).contains(&position) {
        return Err(Error::config(
            "counter.line_position",
            format!(
                "must lie within [{}, {}], got {}",
                MIN_LINE_POSITION, MAX_LINE_POSITION, position
            ),
        ));
    }

    Ok(())
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path)?;

        Self::from_yaml_str(&contents)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, Error> {
        let config: Config = serde_yaml::from_str(contents)?;
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        self.tracker.validate()?;
        self.filter.validate()?;
        self.counter.validate()?;
        self.speed.validate()
    }
}
