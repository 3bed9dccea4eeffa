//! Wrap-aware distances on the toroidal field.
//!
//! The field's edges are joined, so the shortest path between two cells may
//! cross an edge. Each axis is handled independently: the distance along an
//! axis is the shorter of the direct gap and the gap going around the edge.

/// Shortest wrap-aware distance between two coordinates on one axis.
///
/// Both coordinates must lie in `[0, extent)`. When the direct and the
/// around-the-edge distances are equal the direct one is reported.
pub fn axis_distance(from: u32, to: u32, extent: u32) -> u32 {
    let direct = from.abs_diff(to);
    let around = extent.saturating_sub(direct);
    direct.min(around)
}

/// Signed wrap-aware offset from `from` to `to` on one axis.
///
/// Positive values point towards increasing coordinates. The magnitude
/// always equals [`axis_distance`].
pub fn axis_offset(from: u32, to: u32, extent: u32) -> i64 {
    let extent = i64::from(extent);
    let direct = i64::from(to) - i64::from(from);
    let around = if direct >= 0 {
        direct - extent
    } else {
        direct + extent
    };

    if direct.abs() <= around.abs() {
        direct
    } else {
        around
    }
}

/// Per-axis shortest distances `(dx, dy)` between two points on the field.
pub fn toroidal_distance(from: (u32, u32), to: (u32, u32), width: u32, height: u32) -> (u32, u32) {
    (
        axis_distance(from.0, to.0, width),
        axis_distance(from.1, to.1, height),
    )
}

/// Where a target appears on an observer-centred radar canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadarProjection {
    pub distance_x: u32,
    pub distance_y: u32,
    /// Canvas coordinates, with the observer at the canvas centre.
    pub draw_x: f32,
    pub draw_y: f32,
    /// Bearing from the observer in degrees, `[0, 360)`, clockwise from the
    /// positive x axis (0 = right, 90 = down).
    pub degree: f32,
}

impl RadarProjection {
    /// Whether the target falls inside a canvas of the given size.
    pub fn is_visible(&self, canvas_width: u32, canvas_height: u32) -> bool {
        self.distance_x <= canvas_width / 2 && self.distance_y <= canvas_height / 2
    }
}

/// Projects `target` onto a radar canvas centred on `observer`.
pub fn radar_projection(
    observer: (u32, u32),
    target: (u32, u32),
    width: u32,
    height: u32,
    canvas_width: u32,
    canvas_height: u32,
) -> RadarProjection {
    let offset_x = axis_offset(observer.0, target.0, width);
    let offset_y = axis_offset(observer.1, target.1, height);

    let center_x = canvas_width as f32 / 2.0;
    let center_y = canvas_height as f32 / 2.0;
    let draw_x = center_x + offset_x as f32;
    let draw_y = center_y + offset_y as f32;

    let degree = ((center_y - draw_y).atan2(center_x - draw_x).to_degrees() + 180.0)
        .rem_euclid(360.0);

    RadarProjection {
        distance_x: offset_x.unsigned_abs() as u32,
        distance_y: offset_y.unsigned_abs() as u32,
        draw_x,
        draw_y,
        degree,
    }
}
