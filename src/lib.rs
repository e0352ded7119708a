//! Webcam hand tracking driving the mouse pointer.
//!
//! The index fingertip steers the pointer, an index-thumb pinch clicks, an
//! index-middle pinch right-clicks, and holding the wrist near the top or
//! bottom of the frame scrolls.

pub mod config;
pub mod controller;
pub mod geometry;
pub mod gesture;
pub mod hand_tracker;
pub mod input;
pub mod pipeline;
pub mod preview;

pub use controller::{ControlSettings, FrameReport, HandPoints, MouseController};
pub use geometry::{distance, map_coordinates, Bounds, CoordinateMapper, GeometryError, Point2D};
pub use gesture::{detect_gestures, GestureClassifier, GestureState, ScrollDirection};
pub use input::{InputSink, MouseButton};
