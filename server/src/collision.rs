//! Geometric hit tests used by bullet resolution.

use arena_shared::vec2::Vec2;

/// Does the segment `start -> end` cross the circle boundary within this
/// segment? Solves |start + t*(end - start) - center|^2 = r^2 for t and
/// accepts a root only when t is in [0, 1].
pub fn segment_hits_circle(start: Vec2, end: Vec2, center: Vec2, radius: f64) -> bool {
    let d = end - start;
    let f = start - center;

    let a = d.dot(d);
    let b = 2.0 * f.dot(d);
    let c = f.dot(f) - radius * radius;

    if a < 1e-12 {
        // Degenerate segment: a stationary point
        return c <= 0.0;
    }

    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return false;
    }

    let sqrt_disc = disc.sqrt();
    let t1 = (-b - sqrt_disc) / (2.0 * a);
    let t2 = (-b + sqrt_disc) / (2.0 * a);

    (0.0..=1.0).contains(&t1) || (0.0..=1.0).contains(&t2)
}

/// Simple proximity test.
pub fn point_in_circle(point: Vec2, center: Vec2, radius: f64) -> bool {
    point.distance(center) <= radius
}
