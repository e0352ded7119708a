//! Gesture decisions derived from landmark proximity and wrist height.

use crate::geometry::{point_distance, Point2D};

/// Fingertip distance, in frame pixels, at or under which a pinch counts.
pub const DEFAULT_DISTANCE_THRESHOLD: f64 = 30.0;

/// Band, in frame pixels, along the top and bottom edges that triggers scrolling.
pub const DEFAULT_SCROLL_MARGIN: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gesture {
    /// Index tip close to thumb tip.
    Click,
    /// Index tip close to middle tip.
    RightClick,
}

impl Gesture {
    pub const ALL: [Gesture; 2] = [Gesture::Click, Gesture::RightClick];

    pub fn name(&self) -> &'static str {
        match self {
            Gesture::Click => "click",
            Gesture::RightClick => "right_click",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|g| g.name() == name)
    }
}

/// Result of one classification. The two flags are independent and may
/// both be set in the same frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GestureState {
    pub click: bool,
    pub right_click: bool,
}

impl GestureState {
    pub fn is_active(&self, gesture: Gesture) -> bool {
        match gesture {
            Gesture::Click => self.click,
            Gesture::RightClick => self.right_click,
        }
    }

    /// Look a flag up by its gesture name (`"click"`, `"right_click"`).
    pub fn get(&self, name: &str) -> Option<bool> {
        Gesture::from_name(name).map(|g| self.is_active(g))
    }

    pub fn active(&self) -> impl Iterator<Item = Gesture> + '_ {
        Gesture::ALL.into_iter().filter(move |g| self.is_active(*g))
    }
}

/// Classify a hand pose. A distance equal to the threshold counts as detected.
pub fn detect_gestures(
    index_tip: &Point2D,
    thumb_tip: &Point2D,
    middle_tip: &Point2D,
    distance_threshold: f64,
) -> GestureState {
    GestureState {
        click: point_distance(index_tip, thumb_tip) <= distance_threshold,
        right_click: point_distance(index_tip, middle_tip) <= distance_threshold,
    }
}

/// Stateless classifier carrying its threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureClassifier {
    distance_threshold: f64,
}

impl Default for GestureClassifier {
    fn default() -> Self {
        Self {
            distance_threshold: DEFAULT_DISTANCE_THRESHOLD,
        }
    }
}

impl GestureClassifier {
    pub fn new(distance_threshold: f64) -> Self {
        Self { distance_threshold }
    }

    pub fn distance_threshold(&self) -> f64 {
        self.distance_threshold
    }

    pub fn classify(
        &self,
        index_tip: &Point2D,
        thumb_tip: &Point2D,
        middle_tip: &Point2D,
    ) -> GestureState {
        detect_gestures(index_tip, thumb_tip, middle_tip, self.distance_threshold)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Up,
    Down,
}

impl ScrollDirection {
    /// Signed scroll amount, positive meaning up.
    pub fn signed(&self, amount: i32) -> i32 {
        match self {
            ScrollDirection::Up => amount,
            ScrollDirection::Down => -amount,
        }
    }
}

/// Wrist near the bottom edge scrolls down, near the top edge scrolls up.
pub fn scroll_direction(wrist_y: f64, frame_height: f64, margin: f64) -> Option<ScrollDirection> {
    if wrist_y > frame_height - margin {
        Some(ScrollDirection::Down)
    } else if wrist_y < margin {
        Some(ScrollDirection::Up)
    } else {
        None
    }
}

/// What a detected click gesture emits. The two modes never combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClickMode {
    #[default]
    Single,
    Double,
}
