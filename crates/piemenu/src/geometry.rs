use std::f64::consts::{PI, TAU};
use std::ops::{Add, Sub};

/// Angle of the upward vertical axis. Angles grow counterclockwise from the +x axis.
pub const NORTH: f64 = PI / 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub origin: Point,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            origin: Point::new(x, y),
            width,
            height,
        }
    }

    /// Bounding square of a circle.
    pub fn around(center: Point, radius: f64) -> Self {
        Self::new(center.x - radius, center.y - radius, 2.0 * radius, 2.0 * radius)
    }

    pub fn center(&self) -> Point {
        Point::new(
            self.origin.x + self.width / 2.0,
            self.origin.y + self.height / 2.0,
        )
    }

    pub fn right(&self) -> f64 {
        self.origin.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.origin.y + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Polar {
    pub distance: f64,
    pub theta: f64,
}

/// Converts a screen point to polar coordinates around `center`, theta in `[0, 2π)`.
pub fn polar(point: Point, center: Point) -> Polar {
    let (dx, dy) = (point.x - center.x, point.y - center.y);
    // screen y grows downward
    let theta = (-dy).atan2(dx).rem_euclid(TAU);
    Polar {
        distance: dx.hypot(dy),
        theta: if theta >= TAU { 0.0 } else { theta },
    }
}

pub fn cartesian(center: Point, theta: f64, radius: f64) -> Point {
    Point::new(
        center.x + radius * theta.cos(),
        center.y - radius * theta.sin(),
    )
}

/// Boundary between the last and the first slice.
///
/// With more than one item the first slice is centered on north unless
/// `line_north` asks for a boundary line pointing north instead.
pub fn start_angle(item_count: usize, line_north: bool) -> f64 {
    if line_north || item_count <= 1 {
        NORTH
    } else {
        NORTH - (TAU / item_count as f64) / 2.0
    }
}

/// Keeps a circle of `radius` around `center` inside `screen`.
///
/// The far edges are clamped first so that a menu larger than the screen
/// ends up pinned to the top-left corner.
pub fn clamp_center(center: Point, radius: f64, screen: Rect) -> Point {
    let clamp = |value: f64, low: f64, high: f64| {
        let mut fixed = value;
        if value + radius > high {
            fixed = high - radius;
        }
        if value - radius < low {
            fixed = low + radius;
        }
        fixed
    };

    Point::new(
        clamp(center.x, screen.origin.x, screen.right()),
        clamp(center.y, screen.origin.y, screen.bottom()),
    )
}

/// The circular layout of one menu in its own coordinate space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dial {
    pub center: Point,
    pub outer: f64,
    pub inner: f64,
    pub item_count: usize,
    pub line_north: bool,
}

impl Dial {
    pub fn step(&self) -> f64 {
        TAU / self.item_count.max(1) as f64
    }

    pub fn start_angle(&self) -> f64 {
        start_angle(self.item_count, self.line_north)
    }

    /// Resolves the slice under `point`; `None` is the center (cancel) zone.
    pub fn slice_index(&self, point: Point) -> Option<usize> {
        let polar = polar(point, self.center);
        if self.item_count == 0 || polar.distance < self.inner {
            return None;
        }

        let count = self.item_count;
        let step = self.step();
        let start = self.start_angle();

        // walk down from theta + 2π so slices wrapping past 2π still match
        let mut theta = TAU + polar.theta;
        for candidate in 0..2 * count {
            if start <= theta && theta < start + step {
                return Some(candidate % count);
            }
            theta -= step;
        }

        log::debug!("no slice matched theta {:.4}", polar.theta);
        None
    }

    pub fn contains_outer(&self, point: Point) -> bool {
        point.distance(self.center) <= self.outer
    }

    pub fn contains_inner(&self, point: Point) -> bool {
        point.distance(self.center) < self.inner
    }

    /// Point on the bisector of slice `index`, `radius` away from the center.
    pub fn slice_center(&self, index: usize, radius: f64) -> Point {
        if self.item_count == 0 {
            return self.center;
        }
        let angle = self.start_angle() + (index as f64 + 0.5) * self.step();
        cartesian(self.center, angle, radius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dial(item_count: usize, line_north: bool) -> Dial {
        Dial {
            center: Point::new(100.0, 100.0),
            outer: 100.0,
            inner: 20.0,
            item_count,
            line_north,
        }
    }

    #[test]
    fn test_polar_inverts_screen_y() {
        let center = Point::new(10.0, 10.0);
        let above = polar(Point::new(10.0, 0.0), center);
        assert!((above.theta - NORTH).abs() < 1e-9);
        assert!((above.distance - 10.0).abs() < 1e-9);

        let below = polar(Point::new(10.0, 20.0), center);
        assert!((below.theta - 3.0 * NORTH).abs() < 1e-9);

        let west = polar(Point::new(0.0, 10.0), center);
        assert!((west.theta - PI).abs() < 1e-9);
    }

    #[test]
    fn test_cartesian_round_trips_polar() {
        let center = Point::new(50.0, 70.0);
        for theta in [0.3, 1.2, 2.9, 4.0, 5.5] {
            let point = cartesian(center, theta, 42.0);
            let back = polar(point, center);
            assert!((back.theta - theta).abs() < 1e-9);
            assert!((back.distance - 42.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_center_zone_resolves_to_none() {
        let dial = dial(4, false);
        assert_eq!(dial.slice_index(Point::new(100.0, 100.0)), None);
        assert_eq!(dial.slice_index(Point::new(110.0, 105.0)), None);
        assert_eq!(dial.slice_index(Point::new(100.0, 81.0)), None);
    }

    #[test]
    fn test_four_items_resolve_on_bisectors() {
        let dial = dial(4, false);
        for k in 0..4 {
            let point = cartesian(dial.center, NORTH + k as f64 * NORTH, 100.0);
            assert_eq!(dial.slice_index(point), Some(k), "bisector of slice {k}");
        }
    }

    #[test]
    fn test_slices_follow_counterclockwise_order() {
        for count in 1..=9 {
            for line_north in [false, true] {
                let dial = dial(count, line_north);
                for k in 0..count {
                    let angle = dial.start_angle() + (k as f64 + 0.5) * dial.step();
                    for radius in [25.0, 60.0, 99.0, 150.0] {
                        let point = cartesian(dial.center, angle, radius);
                        assert_eq!(dial.slice_index(point), Some(k));
                    }
                }
            }
        }
    }

    #[test]
    fn test_boundary_neighbourhood() {
        let dial = dial(4, false);
        let boundary = dial.start_angle() + dial.step();
        let before = cartesian(dial.center, boundary - 1e-6, 50.0);
        let after = cartesian(dial.center, boundary + 1e-6, 50.0);
        assert_eq!(dial.slice_index(before), Some(0));
        assert_eq!(dial.slice_index(after), Some(1));
    }

    #[test]
    fn test_empty_dial_is_inert() {
        let dial = dial(0, false);
        assert_eq!(dial.slice_index(Point::new(100.0, 10.0)), None);
        assert_eq!(dial.slice_index(Point::new(190.0, 100.0)), None);
        assert_eq!(dial.slice_center(0, 50.0), dial.center);
    }

    #[test]
    fn test_single_item_ignores_line_north() {
        assert_eq!(start_angle(1, false), NORTH);
        assert_eq!(start_angle(1, true), NORTH);
        let dial = dial(1, false);
        assert_eq!(dial.slice_index(Point::new(100.0, 190.0)), Some(0));
        assert_eq!(dial.slice_index(Point::new(30.0, 100.0)), Some(0));
    }

    #[test]
    fn test_line_north_moves_first_boundary() {
        let centered = dial(4, false);
        let lined = dial(4, true);
        let north_east = cartesian(centered.center, NORTH - 0.2, 60.0);
        let north_west = cartesian(centered.center, NORTH + 0.2, 60.0);
        assert_eq!(centered.slice_index(north_east), Some(0));
        assert_eq!(centered.slice_index(north_west), Some(0));
        assert_eq!(lined.slice_index(north_east), Some(3));
        assert_eq!(lined.slice_index(north_west), Some(0));
    }

    #[test]
    fn test_contains_outer() {
        let dial = dial(4, false);
        assert!(dial.contains_outer(Point::new(0.0, 100.0)));
        assert!(dial.contains_outer(Point::new(150.0, 150.0)));
        assert!(!dial.contains_outer(Point::new(190.0, 190.0)));
    }

    #[test]
    fn test_clamp_center_keeps_menu_on_screen() {
        let screen = Rect::new(0.0, 0.0, 800.0, 600.0);
        assert_eq!(
            clamp_center(Point::new(400.0, 300.0), 100.0, screen),
            Point::new(400.0, 300.0)
        );
        assert_eq!(
            clamp_center(Point::new(20.0, 590.0), 100.0, screen),
            Point::new(100.0, 500.0)
        );
        assert_eq!(
            clamp_center(Point::new(790.0, 5.0), 100.0, screen),
            Point::new(700.0, 100.0)
        );
    }

    #[test]
    fn test_slice_center_is_on_bisector() {
        let dial = dial(4, false);
        let west = dial.slice_center(1, 65.0);
        assert!((west.x - 35.0).abs() < 1e-9);
        assert!((west.y - 100.0).abs() < 1e-9);
        assert_eq!(dial.slice_index(west), Some(1));
    }
}
