use nalgebra as na;

const MS_TO_KMH: f64 = 3.6;

#[inline]
pub fn pixel_distance(a: &na::Point2<i32>, b: &na::Point2<i32>) -> f64 {
    na::distance(&a.cast::<f64>(), &b.cast::<f64>())
}

/// Converts a displacement in pixels over `seconds` into km/h.
#[inline]
pub fn kmh(pixels: f64, seconds: f64, pixels_per_meter: f64) -> f64 {
    let meters = pixels / pixels_per_meter;

    (meters / seconds) * MS_TO_KMH
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_euclidean() {
        let d = pixel_distance(&na::Point2::new(0, 0), &na::Point2::new(3, 4));
        assert_eq!(d, 5.0);
    }

    #[test]
    fn kmh_from_pixels() {
        assert_eq!(kmh(88.0, 2.0, 8.8), 18.0);
    }
}
