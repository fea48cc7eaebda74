use nalgebra as na;
use serde_derive::{Deserialize, Serialize};

use crate::bbox::{BBox, Ltrb};
use crate::registry::{ObjectId, TrackedObject};

/// Render-side view of one tracked object.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Track {
    pub track_id: ObjectId,
    pub class: String,
    pub label: String,
    pub bbox: BBox<Ltrb>,
    pub centroid: na::Point2<i32>,
    pub time_since_update: u32,

    // already credited to the crossing count
    pub counted: bool,
}

impl Track {
    pub fn new(obj: &TrackedObject, counted: bool) -> Self {
        Self {
            track_id: obj.id,
            class: obj.class.clone(),
            label: obj.label.clone(),
            bbox: obj.bbox,
            centroid: obj.centroid,
            time_since_update: obj.disappeared,
            counted,
        }
    }
}
