use std::ops::{Add, Mul, Sub};

// Point
// Continuous image coordinates, pixel (x, y) covers [x, x + 1) x [y, y + 1)
//------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn dist_sq(&self, other: &Point) -> f64 {
        (self.x - other.x).powi(2) + (self.y - other.y).powi(2)
    }

    pub fn dist(&self, other: &Point) -> f64 {
        self.dist_sq(other).sqrt()
    }

    // Z component of (b - a) x (c - a). Positive when a, b, c turn clockwise
    // on screen, since y grows downwards
    pub fn cross(a: &Point, b: &Point, c: &Point) -> f64 {
        (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
    }

    // Cosine of the angle at b between ba and bc
    pub fn cos_angle(a: &Point, b: &Point, c: &Point) -> f64 {
        let (ba, bc) = (*a - *b, *c - *b);
        let mag = (ba.x.hypot(ba.y)) * (bc.x.hypot(bc.y));
        if mag == 0.0 {
            return 1.0;
        }
        ((ba.x * bc.x + ba.y * bc.y) / mag).clamp(-1.0, 1.0)
    }

    // Pixel holding this point
    pub fn pixel(&self) -> (i32, i32) {
        (self.x.floor() as i32, self.y.floor() as i32)
    }
}

impl Add for Point {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self::Output {
        Self::new(self.x * rhs, self.y * rhs)
    }
}


// Axis
//------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    pub fn step(self, (x, y): (i32, i32), by: i32) -> (i32, i32) {
        match self {
            Self::X => (x + by, y),
            Self::Y => (x, y + by),
        }
    }

    pub fn coord(self, (x, y): (i32, i32)) -> i32 {
        match self {
            Self::X => x,
            Self::Y => y,
        }
    }
}
