use thiserror::Error;

use super::Vec2;

/// Returned by [`Matrix2D::invert`] when the determinant is zero or not finite.
#[derive(Debug, Copy, Clone, PartialEq, Error)]
#[error("matrix is not invertible (determinant = {determinant})")]
pub struct SingularMatrixError {
    pub determinant: f32,
}

/// 2D affine transform.
///
/// Maps a point `(x, y)` to:
///
/// ```text
/// x' = a * x + c * y + tx
/// y' = b * x + d * y + ty
/// ```
///
/// All composing operations (`scale`, `rotate`, `translate`, `append`) apply
/// *after* the transform already held by the receiver. Building a local
/// transform as `identity → scale → rotate → translate` therefore scales first
/// and translates last.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Matrix2D {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub tx: f32,
    pub ty: f32,
}

impl Matrix2D {
    pub const IDENTITY: Self = Self::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);

    #[inline]
    pub const fn new(a: f32, b: f32, c: f32, d: f32, tx: f32, ty: f32) -> Self {
        Self { a, b, c, d, tx, ty }
    }

    #[inline]
    pub const fn identity() -> Self {
        Self::IDENTITY
    }

    /// Resets the receiver to the identity transform.
    #[inline]
    pub fn set_identity(&mut self) {
        *self = Self::IDENTITY;
    }

    #[inline]
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    #[inline]
    pub fn determinant(&self) -> f32 {
        self.a * self.d - self.b * self.c
    }

    /// Scales the current transform by `(sx, sy)`.
    pub fn scale(&mut self, sx: f32, sy: f32) -> &mut Self {
        if sx != 1.0 {
            self.a *= sx;
            self.c *= sx;
            self.tx *= sx;
        }
        if sy != 1.0 {
            self.b *= sy;
            self.d *= sy;
            self.ty *= sy;
        }
        self
    }

    /// Rotates the current transform by `angle` radians (clockwise in +Y-down space).
    pub fn rotate(&mut self, angle: f32) -> &mut Self {
        if angle == 0.0 {
            return self;
        }
        let (sin, cos) = angle.sin_cos();
        let Self { a, b, c, d, tx, ty } = *self;

        self.a = a * cos - b * sin;
        self.b = a * sin + b * cos;
        self.c = c * cos - d * sin;
        self.d = c * sin + d * cos;
        self.tx = tx * cos - ty * sin;
        self.ty = tx * sin + ty * cos;
        self
    }

    /// Moves the current transform by `(dx, dy)`.
    #[inline]
    pub fn translate(&mut self, dx: f32, dy: f32) -> &mut Self {
        self.tx += dx;
        self.ty += dy;
        self
    }

    /// Concatenates `other` onto the receiver.
    ///
    /// The result first applies the receiver's original transform, then `other`.
    /// Walking from a node up to an ancestor and appending each local transform
    /// in turn yields the node → ancestor mapping.
    pub fn append(&mut self, other: &Matrix2D) -> &mut Self {
        let Self { a, b, c, d, tx, ty } = *self;

        self.a = a * other.a + b * other.c;
        self.b = a * other.b + b * other.d;
        self.c = c * other.a + d * other.c;
        self.d = c * other.b + d * other.d;
        self.tx = tx * other.a + ty * other.c + other.tx;
        self.ty = tx * other.b + ty * other.d + other.ty;
        self
    }

    /// Returns `self` followed by `other` without mutating either.
    #[inline]
    pub fn then(&self, other: &Matrix2D) -> Matrix2D {
        let mut out = *self;
        out.append(other);
        out
    }

    /// Replaces the receiver by its inverse.
    ///
    /// On failure the receiver is left untouched.
    pub fn invert(&mut self) -> Result<&mut Self, SingularMatrixError> {
        let det = self.determinant();
        if det == 0.0 || !det.is_finite() {
            return Err(SingularMatrixError { determinant: det });
        }

        let inv = 1.0 / det;
        let Self { a, b, c, d, tx, ty } = *self;

        self.a = d * inv;
        self.b = -b * inv;
        self.c = -c * inv;
        self.d = a * inv;
        self.tx = -(self.a * tx + self.c * ty);
        self.ty = -(self.b * tx + self.d * ty);
        Ok(self)
    }

    /// Returns the inverse without mutating the receiver.
    #[inline]
    pub fn inverted(&self) -> Result<Matrix2D, SingularMatrixError> {
        let mut out = *self;
        out.invert()?;
        Ok(out)
    }

    #[inline]
    pub fn transform_point(&self, p: Vec2) -> Vec2 {
        Vec2::new(
            self.a * p.x + self.c * p.y + self.tx,
            self.b * p.x + self.d * p.y + self.ty,
        )
    }

    /// Rotation encoded in the linear part, in radians.
    ///
    /// Exact only for transforms without skew.
    #[inline]
    pub fn rotation(&self) -> f32 {
        self.b.atan2(self.a)
    }
}

impl Default for Matrix2D {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::f32::consts::{FRAC_PI_2, PI};

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    fn approx_pt(p: Vec2, x: f32, y: f32) -> bool {
        approx_eq(p.x, x) && approx_eq(p.y, y)
    }

    // ── primitives ────────────────────────────────────────────────────────

    #[test]
    fn identity_leaves_points_unchanged() {
        let m = Matrix2D::identity();
        assert!(m.is_identity());
        assert_eq!(m.transform_point(Vec2::new(3.0, -4.0)), Vec2::new(3.0, -4.0));
    }

    #[test]
    fn scale_then_translate() {
        let mut m = Matrix2D::identity();
        m.scale(2.0, 3.0).translate(10.0, 20.0);
        assert!(approx_pt(m.transform_point(Vec2::new(1.0, 1.0)), 12.0, 23.0));
    }

    #[test]
    fn translate_then_scale_scales_translation() {
        let mut m = Matrix2D::identity();
        m.translate(10.0, 0.0).scale(2.0, 2.0);
        assert!(approx_pt(m.transform_point(Vec2::zero()), 20.0, 0.0));
    }

    #[test]
    fn rotate_quarter_turn_maps_x_to_y() {
        let mut m = Matrix2D::identity();
        m.rotate(FRAC_PI_2);
        assert!(approx_pt(m.transform_point(Vec2::new(1.0, 0.0)), 0.0, 1.0));
        assert!(approx_eq(m.rotation(), FRAC_PI_2));
    }

    #[test]
    fn canonical_order_scale_rotate_translate() {
        let mut m = Matrix2D::identity();
        m.scale(2.0, 1.0).rotate(PI).translate(5.0, 5.0);
        // (1, 0) → scale (2, 0) → rotate (-2, 0) → translate (3, 5)
        assert!(approx_pt(m.transform_point(Vec2::new(1.0, 0.0)), 3.0, 5.0));
    }

    // ── append ────────────────────────────────────────────────────────────

    #[test]
    fn append_applies_receiver_first() {
        let mut child = Matrix2D::identity();
        child.translate(10.0, 0.0);
        let mut parent = Matrix2D::identity();
        parent.scale(2.0, 2.0);

        let composed = child.then(&parent);
        assert!(approx_pt(composed.transform_point(Vec2::new(1.0, 1.0)), 22.0, 2.0));
    }

    #[test]
    fn append_identity_is_noop() {
        let mut m = Matrix2D::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0);
        let before = m;
        m.append(&Matrix2D::IDENTITY);
        assert_eq!(m, before);
    }

    // ── invert ────────────────────────────────────────────────────────────

    #[test]
    fn invert_round_trips_points() {
        let mut m = Matrix2D::identity();
        m.scale(2.0, 0.5).rotate(0.7).translate(-3.0, 8.0);
        let inv = m.inverted().unwrap();

        let p = Vec2::new(4.0, -2.0);
        let q = inv.transform_point(m.transform_point(p));
        assert!(approx_pt(q, p.x, p.y));
    }

    #[test]
    fn invert_singular_is_error() {
        let mut m = Matrix2D::identity();
        m.scale(0.0, 1.0);
        let before = m;
        let err = m.invert().unwrap_err();
        assert_eq!(err.determinant, 0.0);
        assert_eq!(m, before, "failed inversion must not mutate the receiver");
    }

    #[test]
    fn invert_non_finite_is_error() {
        let m = Matrix2D::new(f32::INFINITY, 0.0, 0.0, 1.0, 0.0, 0.0);
        assert!(m.inverted().is_err());
    }
}
