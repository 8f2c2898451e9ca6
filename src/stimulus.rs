// src/stimulus.rs
//
// Stimulus identities (shapes + colors), their geometry, and the per-session
// pools that hand out disjoint identities to each block.
//
// Geometry is pure: the renderer receives vertex lists / radii and never
// feeds anything back into the experiment logic.

use std::f64::consts::PI;
use std::fmt;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{ExperimentError, Result};

/// Shape kinds available to the stimulus pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    Star5,
    Star4,
    Star3,
    Triangle,
    Circle,
    Square,
    Rhombus,
    SemiCircle,
}

/// Renderer-facing geometry, in pixels, centred on the origin.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeGeometry {
    /// Filled polygon; vertices in drawing order.
    Polygon(Vec<(f64, f64)>),
    Circle { radius: f64 },
    /// Pie slice. Angles in degrees, 0 = straight up, clockwise positive.
    Arc {
        radius: f64,
        start_deg: f64,
        end_deg: f64,
        center: (f64, f64),
    },
}

impl ShapeKind {
    pub const ALL: [ShapeKind; 8] = [
        ShapeKind::Star5,
        ShapeKind::Star4,
        ShapeKind::Star3,
        ShapeKind::Triangle,
        ShapeKind::Circle,
        ShapeKind::Square,
        ShapeKind::Rhombus,
        ShapeKind::SemiCircle,
    ];

    /// Plural name used in instructions ("stars", "triangles").
    pub fn name(&self) -> &'static str {
        match self {
            ShapeKind::Star5 => "stars",
            ShapeKind::Star4 => "four-pointed stars",
            ShapeKind::Star3 => "three-pointed stars",
            ShapeKind::Triangle => "triangles",
            ShapeKind::Circle => "circles",
            ShapeKind::Square => "squares",
            ShapeKind::Rhombus => "diamonds",
            ShapeKind::SemiCircle => "half moons",
        }
    }

    pub fn parse(s: &str) -> Option<ShapeKind> {
        match s.trim().to_ascii_lowercase().as_str() {
            "star" | "star5" | "stars" => Some(ShapeKind::Star5),
            "star4" => Some(ShapeKind::Star4),
            "star3" => Some(ShapeKind::Star3),
            "triangle" | "triangles" => Some(ShapeKind::Triangle),
            "circle" | "circles" => Some(ShapeKind::Circle),
            "square" | "squares" => Some(ShapeKind::Square),
            "rhombus" | "diamond" | "diamonds" => Some(ShapeKind::Rhombus),
            "semicircle" | "semi_circle" | "half_moon" => Some(ShapeKind::SemiCircle),
            _ => None,
        }
    }

    /// Geometry for a stimulus of nominal size `size` (pixels).
    pub fn geometry(&self, size: f64) -> ShapeGeometry {
        match self {
            ShapeKind::Star5 => ShapeGeometry::Polygon(star_points(size, 5, 2.0)),
            ShapeKind::Star4 => ShapeGeometry::Polygon(star_points(size, 4, 2.0)),
            // Drawn upside down so the single point faces downwards.
            ShapeKind::Star3 => ShapeGeometry::Polygon(
                star_points(size, 3, 1.5)
                    .into_iter()
                    .map(|(x, y)| (-x, -y))
                    .collect(),
            ),
            ShapeKind::Triangle => ShapeGeometry::Polygon(
                (0..3)
                    .map(|i| {
                        let angle = PI / 2.0 + (i as f64) * 2.0 * PI / 3.0;
                        (size / 2.0 * angle.cos(), size / 2.0 * angle.sin())
                    })
                    .collect(),
            ),
            ShapeKind::Circle => ShapeGeometry::Circle { radius: size / 2.0 },
            ShapeKind::Square => {
                // Same diagonal as the circle's diameter.
                let half = (size * size / 2.0).sqrt() / 2.0;
                ShapeGeometry::Polygon(vec![
                    (-half, half),
                    (half, half),
                    (half, -half),
                    (-half, -half),
                ])
            }
            ShapeKind::Rhombus => ShapeGeometry::Polygon(vec![
                (0.0, size / 2.0),
                (size / 4.0, 0.0),
                (0.0, -size / 2.0),
                (-size / 4.0, 0.0),
            ]),
            ShapeKind::SemiCircle => ShapeGeometry::Arc {
                radius: size / 2.0,
                start_deg: -90.0,
                end_deg: 90.0,
                center: (0.0, -size / 4.0),
            },
        }
    }
}

impl fmt::Display for ShapeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Vertices of a star polygon, counter-clockwise from the top point.
///
/// Even indices sit on the outer radius `size / 2`; odd indices on the
/// inner radius `size / ((1 + √5) / inner_circle)² / 2`. Point `i` is at
/// angle `π/2 + i·π/n_points`.
pub fn star_points(size: f64, n_points: usize, inner_circle: f64) -> Vec<(f64, f64)> {
    let golden = (1.0 + 5.0_f64.sqrt()) / inner_circle;
    let inner_r = size / (golden * golden) / 2.0;
    let outer_r = size / 2.0;

    (0..2 * n_points)
        .map(|i| {
            let r = if i % 2 == 0 { outer_r } else { inner_r };
            let angle = PI / 2.0 + (i as f64) * (PI / n_points as f64);
            (r * angle.cos(), r * angle.sin())
        })
        .collect()
}

/// Named stimulus colors. RGB components are in [-1, 1].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorId {
    Purple,
    Blue,
    Yellow,
    Pink,
    // Reserved for feedback / acknowledgment, never pooled by default.
    Red,
    Green,
    Black,
}

impl ColorId {
    pub fn name(&self) -> &'static str {
        match self {
            ColorId::Purple => "purple",
            ColorId::Blue => "blue",
            ColorId::Yellow => "yellow",
            ColorId::Pink => "pink",
            ColorId::Red => "red",
            ColorId::Green => "green",
            ColorId::Black => "black",
        }
    }

    pub fn rgb(&self) -> (f64, f64, f64) {
        match self {
            ColorId::Purple => (0.003_921_568_627_451, -1.0, 0.003_921_568_627_451),
            ColorId::Blue => (-1.0, -1.0, 1.0),
            ColorId::Yellow => (1.0, 1.0, -1.0),
            ColorId::Pink => (1.0, -0.176_470_588_235_294, 0.411_764_705_882_353),
            ColorId::Red => (1.0, -1.0, -1.0),
            ColorId::Green => (-1.0, 0.003_921_568_627_451, -1.0),
            ColorId::Black => (-1.0, -1.0, -1.0),
        }
    }

    pub fn parse(s: &str) -> Option<ColorId> {
        match s.trim().to_ascii_lowercase().as_str() {
            "purple" => Some(ColorId::Purple),
            "blue" => Some(ColorId::Blue),
            "yellow" => Some(ColorId::Yellow),
            "pink" => Some(ColorId::Pink),
            "red" => Some(ColorId::Red),
            "green" => Some(ColorId::Green),
            "black" => Some(ColorId::Black),
            _ => None,
        }
    }
}

impl fmt::Display for ColorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Consumable pool of stimulus identities.
///
/// Shuffled exactly once at construction; `allocate` removes items, so two
/// blocks can never receive the same identity.
#[derive(Debug, Clone)]
pub struct StimulusPool<T> {
    label: &'static str,
    items: Vec<T>,
}

impl<T: Copy> StimulusPool<T> {
    pub fn new<R: Rng + ?Sized>(label: &'static str, items: &[T], rng: &mut R) -> Self {
        let mut items = items.to_vec();
        items.shuffle(rng);
        Self { label, items }
    }

    pub fn remaining(&self) -> usize {
        self.items.len()
    }

    /// Remove and return `n` distinct items.
    pub fn allocate(&mut self, n: usize) -> Result<Vec<T>> {
        if n > self.items.len() {
            return Err(ExperimentError::PoolExhausted {
                pool: self.label,
                requested: n,
                remaining: self.items.len(),
            });
        }
        let split = self.items.len() - n;
        let mut taken = self.items.split_off(split);
        // Pop order: last item of the shuffled pool comes out first.
        taken.reverse();
        Ok(taken)
    }
}

/// Both pools of a session.
#[derive(Debug, Clone)]
pub struct StimulusPools {
    pub shapes: StimulusPool<ShapeKind>,
    pub colors: StimulusPool<ColorId>,
}

impl StimulusPools {
    pub fn new<R: Rng + ?Sized>(shapes: &[ShapeKind], colors: &[ColorId], rng: &mut R) -> Self {
        Self {
            shapes: StimulusPool::new("shape", shapes, rng),
            colors: StimulusPool::new("color", colors, rng),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashSet;

    fn close(a: (f64, f64), b: (f64, f64)) -> bool {
        (a.0 - b.0).abs() < 1e-9 && (a.1 - b.1).abs() < 1e-9
    }

    #[test]
    fn five_point_star_has_exact_coordinates() {
        let pts = star_points(2.0, 5, 2.0);
        assert_eq!(pts.len(), 10);

        // Top point on the outer radius (1.0).
        assert!(close(pts[0], (0.0, 1.0)));

        // First inner point: radius 1/φ², angle π/2 + π/5.
        let inner_r = 1.0 / (((1.0 + 5.0_f64.sqrt()) / 2.0).powi(2));
        let a = PI / 2.0 + PI / 5.0;
        assert!(close(pts[1], (inner_r * a.cos(), inner_r * a.sin())));
        assert!((inner_r - 0.381_966_011_250_105).abs() < 1e-12);

        // Bottom-right outer point at angle π/2 + 8π/5.
        let a = PI / 2.0 + 8.0 * PI / 5.0;
        assert!(close(pts[8], (a.cos(), a.sin())));
    }

    #[test]
    fn star_alternates_outer_and_inner_radius() {
        let pts = star_points(300.0, 4, 2.0);
        assert_eq!(pts.len(), 8);
        for (i, (x, y)) in pts.iter().enumerate() {
            let r = (x * x + y * y).sqrt();
            if i % 2 == 0 {
                assert!((r - 150.0).abs() < 1e-9);
            } else {
                assert!(r < 150.0);
            }
        }
    }

    #[test]
    fn three_point_star_is_flipped() {
        match ShapeKind::Star3.geometry(2.0) {
            ShapeGeometry::Polygon(pts) => assert!(close(pts[0], (0.0, -1.0))),
            other => panic!("unexpected geometry {other:?}"),
        }
    }

    #[test]
    fn pool_allocations_are_disjoint() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut pool = StimulusPool::new("shape", &ShapeKind::ALL, &mut rng);

        let a = pool.allocate(2).unwrap();
        let b = pool.allocate(2).unwrap();
        assert_eq!(pool.remaining(), 4);

        let sa: HashSet<_> = a.iter().collect();
        assert!(b.iter().all(|s| !sa.contains(s)));
    }

    #[test]
    fn pool_exhaustion_is_reported() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut pool = StimulusPool::new("color", &[ColorId::Blue, ColorId::Pink], &mut rng);
        pool.allocate(2).unwrap();

        match pool.allocate(1) {
            Err(ExperimentError::PoolExhausted {
                pool,
                requested,
                remaining,
            }) => {
                assert_eq!(pool, "color");
                assert_eq!(requested, 1);
                assert_eq!(remaining, 0);
            }
            other => panic!("expected PoolExhausted, got {other:?}"),
        }
    }
}
