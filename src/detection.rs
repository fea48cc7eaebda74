use nalgebra as na;
use serde_derive::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::bbox::{BBox, Ltrb};
use crate::config::FilterConfig;

/// One detector output for a single frame. Not retained past that frame.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Detection {
    pub centroid: na::Point2<i32>,
    pub bbox: BBox<Ltrb>,
    #[serde(rename = "c")]
    pub class: String,
    #[serde(rename = "p")]
    pub confidence: f32,
}

impl Detection {
    /// Builds a detection whose centroid is derived from `bbox`.
    pub fn new(bbox: BBox<Ltrb>, class: impl Into<String>, confidence: f32) -> Self {
        Self {
            centroid: bbox.centroid(),
            bbox,
            class: class.into(),
            confidence,
        }
    }

    #[inline(always)]
    pub fn x(&self) -> i32 {
        self.centroid.x
    }

    #[inline(always)]
    pub fn y(&self) -> i32 {
        self.centroid.y
    }
}

/// Confidence and class gate applied on the adapter side, before the tracker.
#[derive(Debug, Clone)]
pub struct DetectionFilter {
    min_confidence: f32,
    allowed_classes: HashSet<String>,
}

impl DetectionFilter {
    pub fn new(config: &FilterConfig) -> Self {
        Self {
            min_confidence: config.min_confidence,
            allowed_classes: config.allowed_classes.iter().cloned().collect(),
        }
    }

    #[inline]
    pub fn accepts(&self, det: &Detection) -> bool {
        det.confidence >= self.min_confidence && self.allowed_classes.contains(&det.class)
    }

    pub fn apply<I: IntoIterator<Item = Detection>>(&self, detections: I) -> Vec<Detection> {
        detections.into_iter().filter(|d| self.accepts(d)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(class: &str, confidence: f32) -> Detection {
        Detection::new(BBox::ltrb(0, 0, 10, 10), class, confidence)
    }

    #[test]
    fn centroid_comes_from_bbox() {
        let d = Detection::new(BBox::ltrb(100, 200, 141, 261), "car", 0.9);
        assert_eq!((d.x(), d.y()), (120, 230));
    }

    #[test]
    fn filter_drops_low_confidence_and_unknown_classes() {
        let filter = DetectionFilter::new(&FilterConfig {
            min_confidence: 0.65,
            allowed_classes: vec!["car".into(), "person".into()],
        });

        let kept = filter.apply(vec![
            det("car", 0.65),
            det("car", 0.64),
            det("person", 0.99),
            det("airplane", 0.99),
        ]);

        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].class, "car");
        assert_eq!(kept[1].class, "person");
    }

    #[test]
    fn detection_survives_json() {
        let d = Detection::new(BBox::ltrb(0, 0, 10, 10), "bus", 0.8);
        let json = serde_json::to_string(&d).unwrap();
        let back: Detection = serde_json::from_str(&json).unwrap();

        assert_eq!(back, d);
    }
}
