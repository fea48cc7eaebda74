use crate::config::TrackerConfig;
use crate::error::Error;
use crate::math::pixel_distance;
use crate::registry::{ObjectId, Registry};
use crate::Detection;

/// Result of matching one frame's detections against the registry, before
/// anything is mutated.
#[derive(Debug, Default)]
pub struct DetectionsMapping {
    /// `(object id, detection index)` pairs, in matching order.
    pub matched: Vec<(ObjectId, usize)>,
    /// Objects that found no same-class detection within the gate.
    pub missed: Vec<ObjectId>,
    /// Detection indexes left for registration, ascending.
    pub unmatched: Vec<usize>,
}

/// Greedy nearest-neighbour centroid tracker.
///
/// Objects are visited by ascending `disappeared`, each taking the closest
/// unused detection of its own class if that detection lies strictly within
/// `max_distance`. This is not an optimal assignment: visiting order decides
/// contested detections.
#[derive(Debug)]
pub struct CentroidTracker {
    config: TrackerConfig,
    registry: Registry,
}

impl CentroidTracker {
    pub fn new(config: TrackerConfig) -> Result<Self, Error> {
        config.validate()?;

        Ok(Self {
            config,
            registry: Registry::new(),
        })
    }

    #[inline]
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    #[inline]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn match_detections(&self, detections: &[Detection]) -> DetectionsMapping {
        let mut order: Vec<_> = self
            .registry
            .iter()
            .map(|o| (o.disappeared, o.id))
            .collect();

        // stable, so equal counters keep registration order
        order.sort_by_key(|&(disappeared, _)| disappeared);

        let mut used = vec![false; detections.len()];
        let mut mapping = DetectionsMapping::default();

        for (_, id) in order {
            let obj = match self.registry.get(id) {
                Some(obj) => obj,
                None => continue,
            };

            let mut best: Option<(usize, f64)> = None;

            for (idx, det) in detections.iter().enumerate() {
                if used[idx] || det.class != obj.class {
                    continue;
                }

                let dist = pixel_distance(&obj.centroid, &det.centroid);

                if dist < self.config.max_distance && best.map_or(true, |(_, d)| dist < d) {
                    best = Some((idx, dist));
                }
            }

            match best {
                Some((idx, _)) => {
                    used[idx] = true;
                    mapping.matched.push((id, idx));
                }
                None => mapping.missed.push(id),
            }
        }

        mapping.unmatched = (0..detections.len()).filter(|&idx| !used[idx]).collect();

        mapping
    }

    pub fn apply(&mut self, mapping: DetectionsMapping, detections: &[Detection]) {
        for (id, idx) in mapping.matched {
            if let Some(obj) = self.registry.get_mut(id) {
                obj.hit(&detections[idx]);
            }
        }

        for id in mapping.missed {
            self.age(id);
        }

        for idx in mapping.unmatched {
            self.register(&detections[idx]);
        }
    }

    /// Absorbs one frame of detections.
    pub fn update(&mut self, detections: &[Detection]) {
        if self.registry.is_empty() {
            for det in detections {
                self.register(det);
            }

            return;
        }

        if detections.is_empty() {
            for id in self.registry.ids() {
                self.age(id);
            }

            return;
        }

        let mapping = self.match_detections(detections);
        self.apply(mapping, detections);
    }

    pub fn reset(&mut self) {
        self.registry.clear();
    }

    fn register(&mut self, det: &Detection) -> ObjectId {
        let name = self.config.display_name(&det.class);

        self.registry.register(det, &name)
    }

    fn age(&mut self, id: ObjectId) {
        let expired = match self.registry.get_mut(id) {
            Some(obj) => {
                obj.disappeared += 1;
                obj.disappeared > self.config.max_disappeared
            }
            None => false,
        };

        if expired {
            self.registry.deregister(id);
        }
    }
}
