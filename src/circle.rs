//! Filled unit-circle approximation as a triangle fan around the origin.
//!
//! Not drawn by the quad renderer.
#![allow(dead_code)]

use std::f32::consts::PI;

pub const STEPS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColoredVertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

pub type Triangle = [ColoredVertex; 3];

/// Emits `steps + 1` triangles, each spanning the center and two
/// consecutive rim points. The rim starts and ends at (0, 1).
pub fn fan(color: [f32; 3], steps: usize) -> Vec<Triangle> {
    if steps == 0 {
        return Vec::new();
    }

    let radius = 1.0;
    let angle = PI * 2.0 / steps as f32;
    let vertex = |x: f32, y: f32| ColoredVertex {
        position: [x, y, 0.0],
        color,
    };

    let mut triangles = Vec::with_capacity(steps + 1);
    let (mut old_x, mut old_y) = (0.0, radius);
    for i in 0..=steps {
        let new_x = radius * (angle * i as f32).sin();
        let new_y = radius * (angle * i as f32).cos();

        triangles.push([vertex(0.0, 0.0), vertex(old_x, old_y), vertex(new_x, new_y)]);

        old_x = new_x;
        old_y = new_y;
    }
    triangles
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    fn close_to(p: [f32; 3], x: f32, y: f32) -> bool {
        (p[0] - x).abs() < EPSILON && (p[1] - y).abs() < EPSILON && p[2] == 0.0
    }

    #[test]
    fn emits_one_more_triangle_than_steps() {
        assert_eq!(fan([1.0, 0.0, 0.0], STEPS).len(), STEPS + 1);
    }

    #[test]
    fn fan_is_closed() {
        let triangles = fan([0.0, 1.0, 0.0], STEPS);
        let first = triangles.first().unwrap();
        let last = triangles.last().unwrap();
        assert!(close_to(first[1].position, 0.0, 1.0));
        assert!(close_to(first[2].position, 0.0, 1.0));
        assert!(close_to(last[2].position, 0.0, 1.0));
    }

    #[test]
    fn triangles_share_the_center_and_chain_rim_points() {
        let triangles = fan([0.0, 0.0, 1.0], STEPS);
        for pair in triangles.windows(2) {
            assert_eq!(pair[0][2].position, pair[1][1].position);
        }
        for tri in &triangles {
            assert_eq!(tri[0].position, [0.0, 0.0, 0.0]);
            for v in tri.iter() {
                assert_eq!(v.color, [0.0, 0.0, 1.0]);
            }
            let [x, y, _] = tri[2].position;
            assert!(((x * x + y * y).sqrt() - 1.0).abs() < EPSILON);
        }
    }

    #[test]
    fn quarter_turn_lands_on_positive_x() {
        let triangles = fan([1.0, 1.0, 1.0], 4);
        assert!(close_to(triangles[1][2].position, 1.0, 0.0));
        assert!(close_to(triangles[2][2].position, 0.0, -1.0));
    }

    #[test]
    fn no_steps_no_triangles() {
        assert!(fan([1.0, 1.0, 1.0], 0).is_empty());
    }
}
