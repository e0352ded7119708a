//! Capture loop: camera frame -> landmarks -> pointer commands -> preview.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use opencv::{
    core::{self, Mat},
    imgproc,
    prelude::*,
    videoio::{self, VideoCapture, CAP_ANY},
};

use crate::config::{CameraSource, Settings};
use crate::controller::MouseController;
use crate::geometry::{Bounds, FrameBounds, ScreenBounds};
use crate::gesture::{GestureState, ScrollDirection};
use crate::hand_tracker::HandTracker;
use crate::input::{DryRunSink, EnigoSink, InputSink};

/// Latest frame and tracking result, published for the preview window.
#[derive(Debug, Default)]
pub struct Snapshot {
    /// RGB bytes, `frame_width * frame_height * 3` long
    pub frame: Option<Vec<u8>>,
    pub frame_width: u32,
    pub frame_height: u32,
    /// All 21 landmarks in frame pixels, when a hand is visible
    pub landmarks: Option<Vec<(f32, f32)>>,
    pub gestures: GestureState,
    pub scroll: Option<ScrollDirection>,
    pub pointer: Option<(i32, i32)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureStatus {
    Running,
    Stopped,
    /// The capture loop gave up; holds the reason.
    Failed(String),
}

/// State shared between the capture thread and the UI.
#[derive(Debug)]
pub struct SharedState {
    running: AtomicBool,
    failure: Mutex<Option<String>>,
    snapshot: Mutex<Snapshot>,
}

impl Default for SharedState {
    fn default() -> Self {
        Self {
            running: AtomicBool::new(true),
            failure: Mutex::new(None),
            snapshot: Mutex::new(Snapshot::default()),
        }
    }
}

impl SharedState {
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    /// Stop and keep `reason` for the UI. The first failure wins.
    pub fn fail(&self, reason: impl Into<String>) {
        self.failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_or_insert_with(|| reason.into());
        self.stop();
    }

    pub fn status(&self) -> CaptureStatus {
        if self.is_running() {
            return CaptureStatus::Running;
        }
        match self.failure.lock().unwrap_or_else(PoisonError::into_inner).clone() {
            Some(reason) => CaptureStatus::Failed(reason),
            None => CaptureStatus::Stopped,
        }
    }

    pub fn snapshot(&self) -> MutexGuard<'_, Snapshot> {
        self.snapshot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn open_camera(source: &CameraSource, (width, height): (u32, u32)) -> Result<VideoCapture> {
    let mut cap = match source {
        CameraSource::Index(index) => VideoCapture::new(*index, CAP_ANY),
        CameraSource::Path(path) => VideoCapture::from_file(path, CAP_ANY),
    }
    .with_context(|| format!("Failed to open camera {:?}", source))?;

    if !cap.is_opened()? {
        anyhow::bail!("Camera {:?} is not opened", source);
    }

    let _ = cap.set(videoio::CAP_PROP_FRAME_WIDTH, f64::from(width));
    let _ = cap.set(videoio::CAP_PROP_FRAME_HEIGHT, f64::from(height));
    Ok(cap)
}

/// Build the configured sink and the screen bounds it drives.
///
/// A dry run with `--screen-size` never touches the input backend.
fn build_controller(settings: &Settings) -> Result<MouseController<Box<dyn InputSink>>> {
    let (sink, screen): (Box<dyn InputSink>, ScreenBounds) = if settings.dry_run {
        log::info!("Dry run: input commands are logged, not injected");
        let screen = match settings.screen_size {
            Some(screen) => screen,
            None => EnigoSink::new()
                .and_then(|enigo| enigo.screen_bounds())
                .context("Failed to query the display for a dry run, pass --screen-size")?,
        };
        (Box::new(DryRunSink), screen)
    } else {
        let enigo = EnigoSink::new()?;
        let screen = match settings.screen_size {
            Some(screen) => screen,
            None => enigo.screen_bounds()?,
        };
        (Box::new(enigo), screen)
    };
    log::info!("Screen size: {}x{}", screen.width(), screen.height());
    Ok(MouseController::new(sink, screen, settings.control.clone()))
}

/// Run until `state` is stopped. Per-frame failures are logged and the frame
/// is skipped; only setup failures are returned.
pub fn run(state: Arc<SharedState>, settings: Settings) -> Result<()> {
    log::info!("Opening camera {:?}", settings.camera);
    let mut cap = open_camera(&settings.camera, settings.capture_size)?;
    log::info!("Camera opened successfully");

    let mut tracker = HandTracker::spawn(&settings.tracker)?;
    let mut controller = build_controller(&settings)?;

    let mut raw = Mat::default();
    let mut mirrored = Mat::default();

    while state.is_running() {
        match cap.read(&mut raw) {
            Ok(true) if !raw.empty() => {}
            Ok(_) => {
                log::warn!("Empty frame from camera");
                thread::sleep(Duration::from_millis(10));
                continue;
            }
            Err(e) => {
                log::warn!("Failed to read frame: {}", e);
                thread::sleep(Duration::from_millis(100));
                continue;
            }
        }

        let frame = if settings.mirror {
            if let Err(e) = core::flip(&raw, &mut mirrored, 1) {
                log::warn!("Failed to mirror frame: {}", e);
                continue;
            }
            &mirrored
        } else {
            &raw
        };

        let bounds = match Bounds::new(frame.cols().into(), frame.rows().into()) {
            Ok(bounds) => bounds,
            Err(e) => {
                log::warn!("Skipping frame: {}", e);
                continue;
            }
        };

        let mut update = Snapshot::default();
        match tracker.detect(frame) {
            Ok(Some(hand)) => {
                update.landmarks = Some(hand.all_pixels(bounds));
                match controller.on_hand(&hand.points(bounds), bounds, Instant::now()) {
                    Ok(report) => {
                        update.gestures = report.gestures;
                        update.scroll = report.scroll;
                        update.pointer = Some(report.pointer);
                    }
                    Err(e) => log::warn!("Input injection failed: {:#}", e),
                }
            }
            Ok(None) => {}
            Err(e) => log::warn!("Hand detection failed: {:#}", e),
        }

        publish(&state, frame, bounds, update);
    }

    log::info!("Capture loop stopped");
    Ok(())
}

fn publish(state: &SharedState, frame: &Mat, bounds: FrameBounds, mut update: Snapshot) {
    let mut rgb = Mat::default();
    if imgproc::cvt_color(frame, &mut rgb, imgproc::COLOR_BGR2RGB, 0).is_ok() {
        if let Ok(data) = rgb.data_bytes() {
            update.frame = Some(data.to_vec());
        }
    }
    update.frame_width = bounds.width();
    update.frame_height = bounds.height();
    *state.snapshot() = update;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Cli;
    use clap::Parser;

    #[test]
    fn test_shared_state_stops() {
        let state = SharedState::default();
        assert!(state.is_running());
        state.stop();
        assert!(!state.is_running());
        assert_eq!(state.status(), CaptureStatus::Stopped);
    }

    #[test]
    fn test_setup_failure_is_kept_for_the_ui() {
        let state = SharedState::default();
        assert_eq!(state.status(), CaptureStatus::Running);
        state.fail("Python interpreter not found");
        state.fail("later error");
        assert!(!state.is_running());
        assert_eq!(
            state.status(),
            CaptureStatus::Failed("Python interpreter not found".into())
        );
    }

    #[test]
    fn test_dry_run_with_screen_size_skips_input_backend() {
        let cli = Cli::parse_from(["virtual-mouse", "--dry-run", "--screen-size", "1280x720"]);
        let controller = build_controller(&Settings::from(cli)).unwrap();
        assert_eq!(controller.screen(), Bounds::new(1280, 720).unwrap());
    }

    #[test]
    fn test_snapshot_is_replaced_wholesale() {
        let state = SharedState::default();
        state.snapshot().pointer = Some((1, 2));
        *state.snapshot() = Snapshot {
            frame_width: 640,
            ..Snapshot::default()
        };
        let snap = state.snapshot();
        assert_eq!(snap.pointer, None);
        assert_eq!(snap.frame_width, 640);
    }
}
