use nalgebra as na;
use std::collections::{BTreeMap, HashMap};

use crate::bbox::{BBox, Ltrb};
use crate::Detection;

pub type ObjectId = u64;

#[derive(Debug, Clone)]
pub struct TrackedObject {
    pub id: ObjectId,
    pub class: String,
    pub centroid: na::Point2<i32>,
    pub prev_centroid: na::Point2<i32>,
    pub bbox: BBox<Ltrb>,
    pub disappeared: u32,
    pub label: String,
}

impl TrackedObject {
    fn new(id: ObjectId, det: &Detection, label: String) -> Self {
        Self {
            id,
            class: det.class.clone(),
            centroid: det.centroid,
            prev_centroid: det.centroid,
            bbox: det.bbox,
            disappeared: 0,
            label,
        }
    }

    pub(crate) fn hit(&mut self, det: &Detection) {
        self.prev_centroid = self.centroid;
        self.centroid = det.centroid;
        self.bbox = det.bbox;
        self.disappeared = 0;
    }
}

/// Live tracked objects keyed by id. Ids are handed out in increasing order
/// and never reused, so iteration order is registration order.
#[derive(Debug, Default)]
pub struct Registry {
    objects: BTreeMap<ObjectId, TrackedObject>,
    next_id: ObjectId,
    ordinals: HashMap<String, u32>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Id the next registration will receive.
    #[inline]
    pub fn next_id(&self) -> ObjectId {
        self.next_id
    }

    #[inline]
    pub fn get(&self, id: ObjectId) -> Option<&TrackedObject> {
        self.objects.get(&id)
    }

    #[inline]
    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut TrackedObject> {
        self.objects.get_mut(&id)
    }

    #[inline]
    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    /// Live objects in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &TrackedObject> {
        self.objects.values()
    }

    pub fn ids(&self) -> Vec<ObjectId> {
        self.objects.keys().copied().collect()
    }

    /// Registers `det` as a new object and returns its id.
    ///
    /// `name` is the display name for the detection's class; the label gets the
    /// class ordinal appended, e.g. `"Car 3"` for the third car registered.
    pub fn register(&mut self, det: &Detection, name: &str) -> ObjectId {
        let ordinal = self.ordinals.entry(det.class.clone()).or_insert(0);
        *ordinal += 1;

        let id = self.next_id;
        self.next_id += 1;

        let label = format!("{} {}", name, ordinal);
        tracing::debug!(id, class = %det.class, %label, "registered");

        self.objects.insert(id, TrackedObject::new(id, det, label));

        id
    }

    pub fn deregister(&mut self, id: ObjectId) -> Option<TrackedObject> {
        let obj = self.objects.remove(&id)?;

        tracing::debug!(id, label = %obj.label, "deregistered");

        Some(obj)
    }

    /// Drops every object and restarts class ordinals. Ids keep increasing.
    pub fn clear(&mut self) {
        self.objects.clear();
        self.ordinals.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(class: &str, x: i32, y: i32) -> Detection {
        Detection::new(BBox::ltrb(x - 5, y - 5, x + 5, y + 5), class, 0.9)
    }

    #[test]
    fn ids_increase_and_labels_count_per_class() {
        let mut reg = Registry::new();

        let a = reg.register(&det("car", 10, 10), "Auto");
        let b = reg.register(&det("person", 20, 20), "Persona");
        let c = reg.register(&det("car", 30, 30), "Auto");

        assert_eq!((a, b, c), (0, 1, 2));
        assert_eq!(reg.get(a).unwrap().label, "Auto 1");
        assert_eq!(reg.get(b).unwrap().label, "Persona 1");
        assert_eq!(reg.get(c).unwrap().label, "Auto 2");
        assert_eq!(reg.get(c).unwrap().disappeared, 0);
        assert_eq!(reg.len(), 3);
    }

    #[test]
    fn deregister_leaves_remaining_ids_in_order() {
        let mut reg = Registry::new();
        let ids: Vec<_> = (0..4).map(|i| reg.register(&det("car", i, i), "Car")).collect();

        assert!(reg.deregister(ids[1]).is_some());
        assert!(reg.deregister(ids[1]).is_none());
        assert!(!reg.contains(ids[1]));
        assert_eq!(reg.ids(), vec![0, 2, 3]);

        reg.deregister(ids[0]);
        assert_eq!(reg.ids(), vec![2, 3]);
        assert!(reg.get(0).is_none());
        assert_eq!(reg.get(3).unwrap().id, 3);
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn long_lived_object_does_not_pin_evicted_ids() {
        let mut reg = Registry::new();
        let parked = reg.register(&det("car", 10, 10), "Car");

        for _ in 0..10_000 {
            let id = reg.register(&det("person", 500, 500), "Person");
            assert!(reg.deregister(id).is_some());
        }

        assert_eq!(reg.len(), 1);
        assert_eq!(reg.objects.len(), 1);
        assert_eq!(reg.iter().count(), 1);
        assert_eq!(reg.ids(), vec![parked]);
        assert_eq!(reg.next_id(), 10_001);
    }

    #[test]
    fn clear_never_reuses_ids() {
        let mut reg = Registry::new();
        reg.register(&det("car", 0, 0), "Car");
        reg.register(&det("car", 0, 0), "Car");
        reg.clear();

        assert!(reg.is_empty());
        assert!(reg.get(0).is_none());

        let id = reg.register(&det("car", 0, 0), "Car");
        assert_eq!(id, 2);
        assert_eq!(reg.get(id).unwrap().label, "Car 1");
    }

    #[test]
    fn unknown_ids_are_absent() {
        let mut reg = Registry::new();
        reg.register(&det("car", 0, 0), "Car");

        assert!(reg.get(42).is_none());
        assert!(reg.get_mut(42).is_none());
        assert!(reg.deregister(42).is_none());
    }
}
