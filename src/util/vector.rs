//! Minimal 2D vector for positions and velocities

use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

/// A vector in world units
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector2 {
    pub x: f32,
    pub y: f32,
}

impl Vector2 {
    pub const ZERO: Vector2 = Vector2 { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Unit vector pointing at `angle` radians
    pub fn from_angle(angle: f32) -> Self {
        Self {
            x: angle.cos(),
            y: angle.sin(),
        }
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn scale(&self, scalar: f32) -> Self {
        Self {
            x: self.x * scalar,
            y: self.y * scalar,
        }
    }

    pub fn distance(&self, other: &Vector2) -> f32 {
        (*self - *other).length()
    }
}

impl Add for Vector2 {
    type Output = Vector2;

    fn add(self, rhs: Vector2) -> Vector2 {
        Vector2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vector2 {
    type Output = Vector2;

    fn sub(self, rhs: Vector2) -> Vector2 {
        Vector2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vector2 {
    type Output = Vector2;

    fn mul(self, rhs: f32) -> Vector2 {
        self.scale(rhs)
    }
}

impl AddAssign for Vector2 {
    fn add_assign(&mut self, rhs: Vector2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl SubAssign for Vector2 {
    fn sub_assign(&mut self, rhs: Vector2) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn test_from_angle_is_unit_length() {
        for angle in [0.0, FRAC_PI_2, PI, -PI / 3.0, 10.0] {
            let v = Vector2::from_angle(angle);
            assert!(approx(v.length(), 1.0), "angle {}", angle);
        }

        let right = Vector2::from_angle(0.0);
        assert!(approx(right.x, 1.0) && approx(right.y, 0.0));

        let up = Vector2::from_angle(FRAC_PI_2);
        assert!(approx(up.x, 0.0) && approx(up.y, 1.0));
    }

    #[test]
    fn test_arithmetic() {
        let a = Vector2::new(1.0, 2.0);
        let b = Vector2::new(-3.0, 0.5);

        assert_eq!(a + b, Vector2::new(-2.0, 2.5));
        assert_eq!(a - b, Vector2::new(4.0, 1.5));
        assert_eq!(a * 2.0, Vector2::new(2.0, 4.0));

        let mut c = a;
        c += b;
        c -= b;
        assert_eq!(c, a);
    }

    #[test]
    fn test_distance() {
        let a = Vector2::new(0.0, 0.0);
        let b = Vector2::new(3.0, 4.0);
        assert!(approx(a.distance(&b), 5.0));
        assert_eq!(Vector2::ZERO.length(), 0.0);
    }
}
