use nalgebra::{Point3, Vector3};
use serde::Serialize;
use std::collections::VecDeque;

/// Which end of a streamline a propagation pass grows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FiberEnd {
    Front,
    Back,
}

/// One reconstructed fibre: world-space points plus the unit step
/// direction recorded for every point except the seed.
#[derive(Clone, Debug, Default, Serialize)]
pub struct Streamline {
    pub points: VecDeque<Point3<f32>>,
    pub directions: VecDeque<Vector3<f32>>,
}

impl Streamline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Streamline made of the given points only (no direction history).
    pub fn from_points(points: impl IntoIterator<Item = Point3<f32>>) -> Self {
        Self {
            points: points.into_iter().collect(),
            directions: VecDeque::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn front(&self) -> Option<&Point3<f32>> {
        self.points.front()
    }

    pub fn back(&self) -> Option<&Point3<f32>> {
        self.points.back()
    }

    /// Append a propagated point and the direction that reached it.
    pub fn push_step(&mut self, end: FiberEnd, point: Point3<f32>, direction: Vector3<f32>) {
        match end {
            FiberEnd::Front => {
                self.points.push_front(point);
                self.directions.push_front(direction);
            }
            FiberEnd::Back => {
                self.points.push_back(point);
                self.directions.push_back(direction);
            }
        }
    }

    /// Polyline arc length in millimetres.
    pub fn arc_length(&self) -> f32 {
        self.points
            .iter()
            .zip(self.points.iter().skip(1))
            .map(|(a, b)| (b - a).norm())
            .sum()
    }

    pub fn clear(&mut self) {
        self.points.clear();
        self.directions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grows_at_both_ends() {
        let mut fib = Streamline::new();
        fib.push_step(FiberEnd::Back, Point3::new(1.0, 0.0, 0.0), Vector3::x());
        fib.push_step(FiberEnd::Front, Point3::new(-1.0, 0.0, 0.0), -Vector3::x());
        fib.points.push_front(Point3::new(-2.0, 0.0, 0.0));
        assert_eq!(fib.len(), 3);
        assert_eq!(fib.directions.len(), 2);
        assert_eq!(fib.front(), Some(&Point3::new(-2.0, 0.0, 0.0)));
        assert!((fib.arc_length() - 3.0).abs() < 1e-6);
    }
}
