//! Coordinate transformation applied to every decoded coordinate pair.
//!
//! The store does not know what coordinate system the file uses or what the
//! consumer wants; callers inject a [`CoordinateTransform`] at open time and
//! every coordinate pair passes through it before storage.

/// A projection from file coordinates to consumer coordinates.
pub trait CoordinateTransform {
    /// Full-precision transform of one coordinate pair.
    fn transform(&self, x: f64, y: f64) -> (f64, f64);

    /// Reduced-precision form for consumers that render with f32 vertices.
    fn transform_reduced(&self, x: f64, y: f64) -> (f32, f32) {
        let (tx, ty) = self.transform(x, y);
        (tx as f32, ty as f32)
    }
}

/// Passes coordinates through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityTransform;

impl CoordinateTransform for IdentityTransform {
    fn transform(&self, x: f64, y: f64) -> (f64, f64) {
        (x, y)
    }
}

impl<F> CoordinateTransform for F
where
    F: Fn(f64, f64) -> (f64, f64),
{
    fn transform(&self, x: f64, y: f64) -> (f64, f64) {
        self(x, y)
    }
}
