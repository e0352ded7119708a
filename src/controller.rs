//! Turns one tracked hand per frame into pointer commands.

use std::time::{Duration, Instant};

use anyhow::Result;

use crate::geometry::{CoordinateMapper, FrameBounds, Point2D, ScreenBounds};
use crate::gesture::{
    scroll_direction, ClickMode, GestureClassifier, GestureState, ScrollDirection,
    DEFAULT_DISTANCE_THRESHOLD, DEFAULT_SCROLL_MARGIN,
};
use crate::input::{InputSink, MouseButton};

/// Landmarks the controller needs, in frame-pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HandPoints {
    pub index_tip: Point2D,
    pub thumb_tip: Point2D,
    pub middle_tip: Point2D,
    pub wrist: Point2D,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ControlSettings {
    pub distance_threshold: f64,
    pub click_cooldown: Duration,
    pub click_mode: ClickMode,
    pub scroll_margin: f64,
    pub scroll_amount: i32,
}

impl Default for ControlSettings {
    fn default() -> Self {
        Self {
            distance_threshold: DEFAULT_DISTANCE_THRESHOLD,
            click_cooldown: Duration::from_millis(300),
            click_mode: ClickMode::Single,
            scroll_margin: DEFAULT_SCROLL_MARGIN,
            scroll_amount: 10,
        }
    }
}

/// What happened during one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameReport {
    pub pointer: (i32, i32),
    pub gestures: GestureState,
    pub scroll: Option<ScrollDirection>,
    pub clicked: bool,
    pub right_clicked: bool,
}

/// Fixed minimum interval between two firings of one action.
#[derive(Debug, Clone)]
struct Cooldown {
    period: Duration,
    last_fired: Option<Instant>,
}

impl Cooldown {
    fn new(period: Duration) -> Self {
        Self {
            period,
            last_fired: None,
        }
    }

    /// Returns true and restarts the period if the action may fire at `now`.
    fn try_fire(&mut self, now: Instant) -> bool {
        let ready = match self.last_fired {
            Some(last) => now.saturating_duration_since(last) >= self.period,
            None => true,
        };
        if ready {
            self.last_fired = Some(now);
        }
        ready
    }
}

pub struct MouseController<S> {
    sink: S,
    screen: ScreenBounds,
    classifier: GestureClassifier,
    settings: ControlSettings,
    click_cooldown: Cooldown,
    right_click_cooldown: Cooldown,
}

impl<S: InputSink> MouseController<S> {
    pub fn new(sink: S, screen: ScreenBounds, settings: ControlSettings) -> Self {
        Self {
            sink,
            screen,
            classifier: GestureClassifier::new(settings.distance_threshold),
            click_cooldown: Cooldown::new(settings.click_cooldown),
            right_click_cooldown: Cooldown::new(settings.click_cooldown),
            settings,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn screen(&self) -> ScreenBounds {
        self.screen
    }

    pub fn settings(&self) -> &ControlSettings {
        &self.settings
    }

    /// Process one hand. A sink failure aborts the rest of the frame.
    pub fn on_hand(&mut self, hand: &HandPoints, frame: FrameBounds, now: Instant) -> Result<FrameReport> {
        let mapper = CoordinateMapper::new(frame, self.screen);
        let pointer = mapper.map_point(&hand.index_tip);
        self.sink.move_to(pointer.0, pointer.1)?;

        let gestures = self
            .classifier
            .classify(&hand.index_tip, &hand.thumb_tip, &hand.middle_tip);

        let mut clicked = false;
        if gestures.click && self.click_cooldown.try_fire(now) {
            match self.settings.click_mode {
                ClickMode::Single => self.sink.click(MouseButton::Left)?,
                ClickMode::Double => self.sink.double_click(MouseButton::Left)?,
            }
            clicked = true;
        }

        let mut right_clicked = false;
        if gestures.right_click && self.right_click_cooldown.try_fire(now) {
            self.sink.click(MouseButton::Right)?;
            right_clicked = true;
        }

        let scroll = scroll_direction(hand.wrist.y, f64::from(frame.height()), self.settings.scroll_margin);
        if let Some(direction) = scroll {
            self.sink.scroll(direction.signed(self.settings.scroll_amount))?;
        }

        log::debug!(
            "pointer=({}, {}) click={} right_click={} scroll={:?}",
            pointer.0,
            pointer.1,
            gestures.click,
            gestures.right_click,
            scroll
        );

        Ok(FrameReport {
            pointer,
            gestures,
            scroll,
            clicked,
            right_clicked,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Bounds;

    #[derive(Debug, Clone, PartialEq)]
    enum Cmd {
        Move(i32, i32),
        Click(MouseButton),
        DoubleClick(MouseButton),
        Scroll(i32),
    }

    #[derive(Default)]
    struct Recorder {
        cmds: Vec<Cmd>,
        fail_clicks: bool,
    }

    impl InputSink for Recorder {
        fn move_to(&mut self, x: i32, y: i32) -> Result<()> {
            self.cmds.push(Cmd::Move(x, y));
            Ok(())
        }
        fn click(&mut self, button: MouseButton) -> Result<()> {
            if self.fail_clicks {
                anyhow::bail!("click rejected");
            }
            self.cmds.push(Cmd::Click(button));
            Ok(())
        }
        fn double_click(&mut self, button: MouseButton) -> Result<()> {
            self.cmds.push(Cmd::DoubleClick(button));
            Ok(())
        }
        fn scroll(&mut self, amount: i32) -> Result<()> {
            self.cmds.push(Cmd::Scroll(amount));
            Ok(())
        }
    }

    fn frame() -> FrameBounds {
        Bounds::new(640, 480).unwrap()
    }

    fn controller(settings: ControlSettings) -> MouseController<Recorder> {
        MouseController::new(Recorder::default(), Bounds::new(1920, 1080).unwrap(), settings)
    }

    fn hand(index: (f64, f64), thumb: (f64, f64), middle: (f64, f64), wrist_y: f64) -> HandPoints {
        HandPoints {
            index_tip: Point2D::new(index.0, index.1),
            thumb_tip: Point2D::new(thumb.0, thumb.1),
            middle_tip: Point2D::new(middle.0, middle.1),
            wrist: Point2D::new(index.0, wrist_y),
        }
    }

    #[test]
    fn test_open_hand_only_moves_pointer() {
        let mut c = controller(ControlSettings::default());
        let report = c
            .on_hand(&hand((320.0, 240.0), (400.0, 300.0), (320.0, 120.0), 300.0), frame(), Instant::now())
            .unwrap();
        assert_eq!(report.pointer, (960, 540));
        assert!(!report.clicked && !report.right_clicked);
        assert_eq!(report.scroll, None);
        assert_eq!(c.sink().cmds, vec![Cmd::Move(960, 540)]);
    }

    #[test]
    fn test_click_respects_cooldown() {
        let mut c = controller(ControlSettings::default());
        let pinch = hand((100.0, 100.0), (110.0, 110.0), (300.0, 300.0), 300.0);
        let t0 = Instant::now();

        assert!(c.on_hand(&pinch, frame(), t0).unwrap().clicked);
        assert!(!c.on_hand(&pinch, frame(), t0 + Duration::from_millis(100)).unwrap().clicked);
        assert!(c.on_hand(&pinch, frame(), t0 + Duration::from_millis(300)).unwrap().clicked);

        let clicks = c.sink().cmds.iter().filter(|cmd| matches!(cmd, Cmd::Click(_))).count();
        assert_eq!(clicks, 2);
    }

    #[test]
    fn test_double_click_mode_never_single_clicks() {
        let settings = ControlSettings {
            click_mode: ClickMode::Double,
            ..ControlSettings::default()
        };
        let mut c = controller(settings);
        let pinch = hand((100.0, 100.0), (110.0, 110.0), (300.0, 300.0), 300.0);
        c.on_hand(&pinch, frame(), Instant::now()).unwrap();
        assert_eq!(
            c.sink().cmds,
            vec![Cmd::Move(300, 225), Cmd::DoubleClick(MouseButton::Left)]
        );
    }

    #[test]
    fn test_click_and_right_click_fire_independently() {
        let settings = ControlSettings {
            distance_threshold: 75.0,
            ..ControlSettings::default()
        };
        let mut c = controller(settings);
        let both = hand((100.0, 100.0), (150.0, 150.0), (115.0, 115.0), 300.0);
        let report = c.on_hand(&both, frame(), Instant::now()).unwrap();
        assert!(report.clicked && report.right_clicked);
        assert!(c.sink().cmds.contains(&Cmd::Click(MouseButton::Left)));
        assert!(c.sink().cmds.contains(&Cmd::Click(MouseButton::Right)));
    }

    #[test]
    fn test_wrist_near_edges_scrolls() {
        let mut c = controller(ControlSettings::default());
        let t = Instant::now();
        let low = c
            .on_hand(&hand((320.0, 240.0), (500.0, 240.0), (320.0, 0.0), 470.0), frame(), t)
            .unwrap();
        let high = c
            .on_hand(&hand((320.0, 240.0), (500.0, 240.0), (320.0, 0.0), 10.0), frame(), t)
            .unwrap();
        assert_eq!(low.scroll, Some(ScrollDirection::Down));
        assert_eq!(high.scroll, Some(ScrollDirection::Up));
        assert!(c.sink().cmds.contains(&Cmd::Scroll(-10)));
        assert!(c.sink().cmds.contains(&Cmd::Scroll(10)));
    }

    #[test]
    fn test_sink_failure_is_reported() {
        let mut c = controller(ControlSettings::default());
        c.sink.fail_clicks = true;
        let pinch = hand((100.0, 100.0), (110.0, 110.0), (300.0, 300.0), 300.0);
        assert!(c.on_hand(&pinch, frame(), Instant::now()).is_err());
    }
}
