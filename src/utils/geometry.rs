use imageproc::point::Point;

/// Area enclosed by a closed polygon (shoelace formula)
pub fn polygon_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut twice_area = 0i64;
    for (i, p) in points.iter().enumerate() {
        let q = &points[(i + 1) % points.len()];
        twice_area += p.x as i64 * q.y as i64 - q.x as i64 * p.y as i64;
    }
    twice_area.abs() as f64 / 2.0
}

/// Orientation of a segment in degrees, folded into [0, 90].
///
/// 0 is horizontal, 90 is vertical. A segment with `x1 == x2` is vertical
/// by definition.
pub fn segment_angle(x1: i32, y1: i32, x2: i32, y2: i32) -> f32 {
    let dx = (x2 - x1).abs() as f32;
    let dy = (y2 - y1).abs() as f32;
    if dx == 0.0 {
        return 90.0;
    }
    dy.atan2(dx).to_degrees()
}

/// Median of a set of values; the mean of the two middle values for even counts
pub fn median(values: &[f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}
