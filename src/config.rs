//! Command line options.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::controller::ControlSettings;
use crate::geometry::{Bounds, ScreenBounds};
use crate::gesture::{ClickMode, DEFAULT_DISTANCE_THRESHOLD, DEFAULT_SCROLL_MARGIN};
use crate::hand_tracker::TrackerConfig;

#[derive(Parser, Debug, Clone)]
#[command(name = "virtual-mouse", about = "Control the mouse pointer with hand gestures")]
pub struct Cli {
    /// Camera index (e.g. 0) or device path (e.g. /dev/video4)
    #[arg(long, default_value = "0")]
    pub camera: String,

    /// Requested capture width
    #[arg(long, default_value_t = 640)]
    pub width: u32,

    /// Requested capture height
    #[arg(long, default_value_t = 480)]
    pub height: u32,

    /// Fingertip distance in frame pixels at or under which a pinch registers
    #[arg(long, default_value_t = DEFAULT_DISTANCE_THRESHOLD, value_parser = parse_positive)]
    pub distance_threshold: f64,

    /// Minimum time between two clicks of the same button
    #[arg(long, default_value_t = 300)]
    pub click_cooldown_ms: u64,

    /// Emit a double click instead of a single click on pinch
    #[arg(long)]
    pub double_click: bool,

    /// Height in frame pixels of the top and bottom scroll bands
    #[arg(long, default_value_t = DEFAULT_SCROLL_MARGIN, value_parser = parse_positive)]
    pub scroll_margin: f64,

    /// Scroll steps per frame while the wrist is inside a scroll band
    #[arg(long, default_value_t = 10)]
    pub scroll_amount: i32,

    /// Minimum hand detection confidence
    #[arg(long, default_value_t = 0.7)]
    pub min_confidence: f32,

    /// Do not mirror the camera image
    #[arg(long)]
    pub no_mirror: bool,

    /// Python interpreter with mediapipe installed
    #[arg(long, default_value = ".venv/bin/python")]
    pub python: PathBuf,

    /// Detector script
    #[arg(long, default_value = "hand_detect.py")]
    pub detector_script: PathBuf,

    /// Run without the preview window
    #[arg(long)]
    pub headless: bool,

    /// Log input commands instead of injecting them
    #[arg(long)]
    pub dry_run: bool,

    /// Screen size as WIDTHxHEIGHT instead of querying the display
    #[arg(long, value_parser = parse_screen_size)]
    pub screen_size: Option<ScreenBounds>,
}

fn parse_screen_size(s: &str) -> Result<ScreenBounds, String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {s:?}"))?;
    let width: i64 = w.trim().parse().map_err(|e| format!("width: {e}"))?;
    let height: i64 = h.trim().parse().map_err(|e| format!("height: {e}"))?;
    Bounds::new(width, height).map_err(|e| e.to_string())
}

fn parse_positive(s: &str) -> Result<f64, String> {
    let value: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(format!("{value} is not a positive number"))
    }
}

/// Where frames come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraSource {
    Index(i32),
    Path(String),
}

impl CameraSource {
    pub fn parse(s: &str) -> Self {
        match s.parse() {
            Ok(index) => CameraSource::Index(index),
            Err(_) => CameraSource::Path(s.to_string()),
        }
    }
}

/// Resolved runtime settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub camera: CameraSource,
    pub capture_size: (u32, u32),
    pub mirror: bool,
    pub headless: bool,
    pub dry_run: bool,
    /// Overrides the size reported by the display
    pub screen_size: Option<ScreenBounds>,
    pub control: ControlSettings,
    pub tracker: TrackerConfig,
}

impl From<Cli> for Settings {
    fn from(cli: Cli) -> Self {
        Self {
            camera: CameraSource::parse(&cli.camera),
            capture_size: (cli.width, cli.height),
            mirror: !cli.no_mirror,
            headless: cli.headless,
            dry_run: cli.dry_run,
            screen_size: cli.screen_size,
            control: ControlSettings {
                distance_threshold: cli.distance_threshold,
                click_cooldown: Duration::from_millis(cli.click_cooldown_ms),
                click_mode: if cli.double_click {
                    ClickMode::Double
                } else {
                    ClickMode::Single
                },
                scroll_margin: cli.scroll_margin,
                scroll_amount: cli.scroll_amount,
            },
            tracker: TrackerConfig {
                python: cli.python,
                script: cli.detector_script,
                min_confidence: cli.min_confidence.clamp(0.0, 1.0),
            },
        }
    }
}
