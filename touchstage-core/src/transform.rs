//! Affine transform utilities
//!
//! Builds and takes apart the translate/rotate/uniform-scale transforms that
//! gestures produce. Transforms are `kurbo::Affine` values with coefficients
//! `[a, b, c, d, e, f]`, mapping `(x, y)` to `(a·x + c·y + e, b·x + d·y + f)`.

use crate::error::{Error, Result};
use kurbo::{Affine, Point, Vec2};
use serde::{Deserialize, Serialize};

/// Translation, uniform scale and rotation extracted from a transform
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DecomposedTransform {
    pub translation: Vec2,
    pub scale: f64,
    /// Rotation in radians
    pub rotation: f64,
}

impl Default for DecomposedTransform {
    fn default() -> Self {
        Self {
            translation: Vec2::ZERO,
            scale: 1.0,
            rotation: 0.0,
        }
    }
}

/// Build a transform from rotation, uniform scale and translation
///
/// With a pivot the result is
/// `translate(pivot) · rotate · scale · translate(-pivot) · translate(translation)`,
/// otherwise `translate(translation) · rotate · scale`. The factor order is
/// fixed; reassociating it changes the visual result.
pub fn compose(pivot: Option<Point>, rotation: f64, scale: f64, translation: Vec2) -> Affine {
    match pivot {
        Some(pivot) => {
            let pivot = pivot.to_vec2();
            Affine::translate(pivot)
                * Affine::rotate(rotation)
                * Affine::scale(scale)
                * Affine::translate(-pivot)
                * Affine::translate(translation)
        }
        None => Affine::translate(translation) * Affine::rotate(rotation) * Affine::scale(scale),
    }
}

/// Extract translation, scale and rotation from a transform
///
/// `scale` is the magnitude of the first column and `rotation` its angle, so
/// the result is only exact for uniform-scale transforms. Gestures never
/// produce anything else; a transform with different x/y scale (or skew)
/// decomposes to an approximation.
pub fn decompose(transform: Affine) -> DecomposedTransform {
    let [a, b, _c, _d, e, f] = transform.as_coeffs();
    DecomposedTransform {
        translation: Vec2::new(e, f),
        scale: (a * a + b * b).sqrt(),
        rotation: b.atan2(a),
    }
}

/// Matrix product `left · right`
///
/// `right` acts in the local frame already established by `left`.
pub fn multiply(left: Affine, right: Affine) -> Affine {
    left * right
}

/// Invert a transform, failing when it is singular
pub fn invert(transform: Affine) -> Result<Affine> {
    let determinant = transform.determinant();
    if !determinant.is_finite() || determinant.abs() < f64::EPSILON {
        return Err(Error::SingularTransform { determinant });
    }
    Ok(transform.inverse())
}

pub fn transform_point(transform: Affine, point: Point) -> Point {
    transform * point
}
