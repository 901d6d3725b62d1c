//! Small geometric primitives in origin-relative single precision.
//!
//! Everything a surface stores is relative to its origin, so `f32` keeps
//! sub-millimetre accuracy near the observer. Absolute positions stay in
//! `DVec3` until they are re-based.

use glam::{DVec3, Vec3};

/// Observer position and forward direction, relative to a surface origin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraRay {
  pub position: Vec3,
  pub direction: Vec3,
}

impl CameraRay {
  /// Placeholder ray that no node can be close to.
  pub const INVALID: Self = Self {
    position: Vec3::splat(f32::MAX),
    direction: Vec3::ZERO,
  };

  pub fn new(position: Vec3, direction: Vec3) -> Self {
    Self { position, direction }
  }

  /// True if every component is finite.
  #[inline]
  pub fn is_finite(&self) -> bool {
    self.position.is_finite() && self.direction.is_finite()
  }
}

/// Observer state in absolute coordinates, as pushed by the host each frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Observer {
  pub position: DVec3,
  pub direction: DVec3,
}

impl Observer {
  pub fn new(position: DVec3, direction: DVec3) -> Self {
    Self { position, direction }
  }

  #[inline]
  pub fn is_finite(&self) -> bool {
    self.position.is_finite() && self.direction.is_finite()
  }

  /// Re-base onto `origin`, narrowing to single precision.
  #[inline]
  pub fn camera_ray(&self, origin: DVec3) -> CameraRay {
    CameraRay {
      position: (self.position - origin).as_vec3(),
      direction: self.direction.as_vec3(),
    }
  }
}

impl Default for Observer {
  fn default() -> Self {
    Self {
      position: DVec3::ZERO,
      direction: DVec3::NEG_Z,
    }
  }
}

/// Sphere used for collision queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sphere3 {
  pub center: Vec3,
  pub radius: f32,
}

impl Sphere3 {
  pub fn new(center: Vec3, radius: f32) -> Self {
    Self { center, radius }
  }
}

/// Triangle with counter-clockwise winding seen from outside.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Triangle3 {
  pub points: [Vec3; 3],
}

impl Triangle3 {
  pub fn new(a: Vec3, b: Vec3, c: Vec3) -> Self {
    Self { points: [a, b, c] }
  }

  /// Non-normalised normal; its length is twice the area.
  #[inline]
  pub fn normal(&self) -> Vec3 {
    (self.points[1] - self.points[0]).cross(self.points[2] - self.points[0])
  }

  #[inline]
  pub fn unit_normal(&self) -> Vec3 {
    self.normal().normalize_or_zero()
  }

  #[inline]
  pub fn area(&self) -> f32 {
    self.normal().length() * 0.5
  }

  #[inline]
  pub fn center(&self) -> Vec3 {
    (self.points[0] + self.points[1] + self.points[2]) * (1.0 / 3.0)
  }

  /// Signed distance from the triangle's plane; positive on the normal side.
  #[inline]
  pub fn plane_distance(&self, point: Vec3) -> f32 {
    let normal = self.unit_normal();
    normal.dot(point - self.points[0])
  }

  /// Exact closest point on the triangle to `point`.
  pub fn closest_point(&self, point: Vec3) -> Vec3 {
    let [a, b, c] = self.points;
    let ab = b - a;
    let ac = c - a;
    let ap = point - a;
    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
      return a;
    }

    let bp = point - b;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
      return b;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
      let v = d1 / (d1 - d3);
      return a + ab * v;
    }

    let cp = point - c;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
      return c;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
      let w = d2 / (d2 - d6);
      return a + ac * w;
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
      let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
      return b + (c - b) * w;
    }

    let denom = 1.0 / (va + vb + vc);
    let v = vb * denom;
    let w = vc * denom;
    a + ab * v + ac * w
  }

  /// True if the sphere touches the triangle.
  #[inline]
  pub fn intersects_sphere(&self, sphere: &Sphere3) -> bool {
    self.closest_point(sphere.center).distance_squared(sphere.center) <= sphere.radius * sphere.radius
  }
}

/// Does `sphere` reach into the infinite pyramid with apex `tip` whose side
/// faces pass through the edges of `base`?
///
/// Conservative: a sphere straddling any side plane counts as touching.
pub fn touches_projection(tip: Vec3, base: &Triangle3, sphere: &Sphere3) -> bool {
  let [a, b, c] = base.points;
  let sides = [
    Triangle3::new(tip, a, c),
    Triangle3::new(tip, b, a),
    Triangle3::new(tip, c, b),
  ];
  sides.iter().all(|side| side.plane_distance(sphere.center) <= sphere.radius)
}

#[cfg(test)]
#[path = "geom_test.rs"]
mod geom_test;
