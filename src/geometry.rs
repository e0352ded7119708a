//! Frame-space and screen-space geometry.
//!
//! Everything in here is pure: no logging, no shared state. The capture loop
//! calls these once per frame, but they are equally usable from any thread.

use thiserror::Error;

/// A 2D point in either frame-pixel or screen-pixel space.
pub type Point2D = nalgebra::Point2<f64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GeometryError {
    #[error("invalid bounds {width}x{height}: both dimensions must be positive")]
    InvalidBounds { width: i64, height: i64 },
}

/// Width and height of a pixel coordinate space. Both are always > 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    width: u32,
    height: u32,
}

/// Camera image dimensions.
pub type FrameBounds = Bounds;
/// Display dimensions.
pub type ScreenBounds = Bounds;

impl Bounds {
    pub fn new(width: i64, height: i64) -> Result<Self, GeometryError> {
        let invalid = GeometryError::InvalidBounds { width, height };
        let w = u32::try_from(width).map_err(|_| invalid)?;
        let h = u32::try_from(height).map_err(|_| invalid)?;
        if w == 0 || h == 0 {
            return Err(invalid);
        }
        Ok(Self { width: w, height: h })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

/// Euclidean distance between `(x1, y1)` and `(x2, y2)`.
pub fn distance(x1: f64, y1: f64, x2: f64, y2: f64) -> f64 {
    (x2 - x1).hypot(y2 - y1)
}

/// [`distance`] over two points.
pub fn point_distance(a: &Point2D, b: &Point2D) -> f64 {
    distance(a.x, a.y, b.x, b.y)
}

/// Clamp `(x, y)` into the frame, then rescale it into the screen.
///
/// Coordinates outside the frame (negative ones included) are pulled to the
/// nearest edge. Results are truncated toward zero, and a point on the far
/// frame edge lands exactly on the far screen edge.
pub fn map_coordinates(
    x: f64,
    y: f64,
    frame_width: i64,
    frame_height: i64,
    screen_width: i64,
    screen_height: i64,
) -> Result<(i32, i32), GeometryError> {
    let frame = Bounds::new(frame_width, frame_height)?;
    let screen = Bounds::new(screen_width, screen_height)?;
    Ok(CoordinateMapper::new(frame, screen).map(x, y))
}

/// Frame-to-screen mapping with bounds validated up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinateMapper {
    frame: FrameBounds,
    screen: ScreenBounds,
}

impl CoordinateMapper {
    pub fn new(frame: FrameBounds, screen: ScreenBounds) -> Self {
        Self { frame, screen }
    }

    pub fn frame(&self) -> FrameBounds {
        self.frame
    }

    pub fn screen(&self) -> ScreenBounds {
        self.screen
    }

    pub fn map(&self, x: f64, y: f64) -> (i32, i32) {
        (
            rescale(x, self.frame.width, self.screen.width),
            rescale(y, self.frame.height, self.screen.height),
        )
    }

    pub fn map_point(&self, point: &Point2D) -> (i32, i32) {
        self.map(point.x, point.y)
    }
}

fn rescale(value: f64, from: u32, to: u32) -> i32 {
    let from = f64::from(from);
    let clamped = value.clamp(0.0, from);
    // Multiply before dividing so `from` maps onto `to` without rounding loss.
    (clamped * f64::from(to) / from) as i32
}
