use nalgebra as na;
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;

pub trait BBoxFormat: std::fmt::Debug {}

/// Left-top-right-bottom format, contains left top and right bottom corners
#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
pub struct Ltrb;
impl BBoxFormat for Ltrb {}

/// Integer pixel box tagged with its layout.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct BBox<F: BBoxFormat + Serialize + Deserialize<'static> + PartialEq>(
    [i32; 4],
    PhantomData<F>,
);

impl<F: BBoxFormat + Serialize + Deserialize<'static> + PartialEq> From<BBox<F>> for [i32; 4] {
    fn from(bbox: BBox<F>) -> Self {
        bbox.0
    }
}

impl<F: BBoxFormat + Serialize + Deserialize<'static> + PartialEq> BBox<F> {
    #[inline]
    pub fn as_slice(&self) -> &[i32; 4] {
        &self.0
    }
}

impl BBox<Ltrb> {
    #[inline]
    pub fn ltrb(xmin: i32, ymin: i32, xmax: i32, ymax: i32) -> Self {
        BBox([xmin, ymin, xmax, ymax], Default::default())
    }

    #[inline(always)]
    pub fn left(&self) -> i32 {
        self.0[0]
    }

    #[inline(always)]
    pub fn top(&self) -> i32 {
        self.0[1]
    }

    #[inline(always)]
    pub fn right(&self) -> i32 {
        self.0[2]
    }

    #[inline(always)]
    pub fn bottom(&self) -> i32 {
        self.0[3]
    }

    /// Pixel centroid, rounded toward negative infinity on both axes.
    #[inline]
    pub fn centroid(&self) -> na::Point2<i32> {
        na::Point2::new(
            (self.left() + self.right()).div_euclid(2),
            (self.top() + self.bottom()).div_euclid(2),
        )
    }

    /// Exact geometric center.
    #[inline]
    pub fn center(&self) -> na::Point2<f64> {
        na::Point2::new(
            (self.left() + self.right()) as f64 / 2.0,
            (self.top() + self.bottom()) as f64 / 2.0,
        )
    }
}
