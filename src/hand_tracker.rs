//! Hand landmark source backed by MediaPipe running in a Python subprocess.
//!
//! The subprocess is `hand_detect.py` at the repository root. It prints
//! `READY` once the model is loaded, then for every frame reads a header
//! (width, height, channels as little-endian `u32`) followed by raw BGR bytes
//! and answers with a single JSON line.
//!
//! # Setup
//!
//! python3 -m venv .venv && .venv/bin/pip install mediapipe numpy

use anyhow::{Context, Result};
use opencv::{core::Mat, prelude::*};
use serde::Deserialize;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdout, Command, Stdio};

use crate::controller::HandPoints;
use crate::geometry::{FrameBounds, Point2D};

/// Hand landmark indices (MediaPipe hand landmark model convention)
pub mod landmarks {
    pub const COUNT: usize = 21;

    pub const WRIST: usize = 0;
    pub const THUMB_CMC: usize = 1;
    pub const THUMB_MCP: usize = 2;
    pub const THUMB_IP: usize = 3;
    pub const THUMB_TIP: usize = 4;
    pub const INDEX_FINGER_MCP: usize = 5;
    pub const INDEX_FINGER_PIP: usize = 6;
    pub const INDEX_FINGER_DIP: usize = 7;
    pub const INDEX_FINGER_TIP: usize = 8;
    pub const MIDDLE_FINGER_MCP: usize = 9;
    pub const MIDDLE_FINGER_PIP: usize = 10;
    pub const MIDDLE_FINGER_DIP: usize = 11;
    pub const MIDDLE_FINGER_TIP: usize = 12;
    pub const RING_FINGER_MCP: usize = 13;
    pub const RING_FINGER_PIP: usize = 14;
    pub const RING_FINGER_DIP: usize = 15;
    pub const RING_FINGER_TIP: usize = 16;
    pub const PINKY_MCP: usize = 17;
    pub const PINKY_PIP: usize = 18;
    pub const PINKY_DIP: usize = 19;
    pub const PINKY_TIP: usize = 20;

    /// Bones drawn in the preview overlay.
    pub const CONNECTIONS: [(usize, usize); 21] = [
        (WRIST, THUMB_CMC), (THUMB_CMC, THUMB_MCP), (THUMB_MCP, THUMB_IP), (THUMB_IP, THUMB_TIP),
        (WRIST, INDEX_FINGER_MCP), (INDEX_FINGER_MCP, INDEX_FINGER_PIP),
        (INDEX_FINGER_PIP, INDEX_FINGER_DIP), (INDEX_FINGER_DIP, INDEX_FINGER_TIP),
        (INDEX_FINGER_MCP, MIDDLE_FINGER_MCP), (MIDDLE_FINGER_MCP, MIDDLE_FINGER_PIP),
        (MIDDLE_FINGER_PIP, MIDDLE_FINGER_DIP), (MIDDLE_FINGER_DIP, MIDDLE_FINGER_TIP),
        (MIDDLE_FINGER_MCP, RING_FINGER_MCP), (RING_FINGER_MCP, RING_FINGER_PIP),
        (RING_FINGER_PIP, RING_FINGER_DIP), (RING_FINGER_DIP, RING_FINGER_TIP),
        (RING_FINGER_MCP, PINKY_MCP), (WRIST, PINKY_MCP),
        (PINKY_MCP, PINKY_PIP), (PINKY_PIP, PINKY_DIP), (PINKY_DIP, PINKY_TIP),
    ];
}

/// A single landmark, normalised to the image size.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize)]
pub struct Landmark {
    /// 0.0 to 1.0 across the image width
    pub x: f32,
    /// 0.0 to 1.0 down the image height
    pub y: f32,
    /// Depth relative to the wrist
    #[serde(default)]
    pub z: f32,
}

/// The first detected hand.
#[derive(Clone, Debug, PartialEq)]
pub struct HandLandmarks {
    pub landmarks: [Landmark; landmarks::COUNT],
    pub confidence: f32,
    /// "Left" or "Right"
    pub handedness: String,
}

impl HandLandmarks {
    /// One landmark in frame-pixel coordinates, `None` past the last index.
    pub fn pixel(&self, index: usize, frame: FrameBounds) -> Option<Point2D> {
        self.landmarks.get(index).map(|lm| to_pixel(lm, frame))
    }

    /// The landmarks that drive the pointer, in frame-pixel coordinates.
    pub fn points(&self, frame: FrameBounds) -> HandPoints {
        let lm = &self.landmarks;
        HandPoints {
            index_tip: to_pixel(&lm[landmarks::INDEX_FINGER_TIP], frame),
            thumb_tip: to_pixel(&lm[landmarks::THUMB_TIP], frame),
            middle_tip: to_pixel(&lm[landmarks::MIDDLE_FINGER_TIP], frame),
            wrist: to_pixel(&lm[landmarks::WRIST], frame),
        }
    }

    /// All landmarks as pixel coordinates for visualization
    pub fn all_pixels(&self, frame: FrameBounds) -> Vec<(f32, f32)> {
        let (w, h) = (frame.width() as f32, frame.height() as f32);
        self.landmarks.iter().map(|lm| (lm.x * w, lm.y * h)).collect()
    }
}

fn to_pixel(lm: &Landmark, frame: FrameBounds) -> Point2D {
    Point2D::new(
        f64::from(lm.x) * f64::from(frame.width()),
        f64::from(lm.y) * f64::from(frame.height()),
    )
}

#[derive(Deserialize, Debug)]
struct HandJson {
    handedness: String,
    score: f32,
    landmarks: Vec<Landmark>,
}

#[derive(Deserialize, Debug)]
struct DetectionResult {
    hands: Vec<HandJson>,
    #[serde(default)]
    error: Option<String>,
}

/// Parse one response line from the detector.
///
/// Returns the first hand scoring at least `min_confidence` with a complete
/// set of landmarks. A detector-reported error means no hand this frame.
pub fn parse_detection(line: &str, min_confidence: f32) -> Result<Option<HandLandmarks>> {
    let result: DetectionResult = serde_json::from_str(line.trim())
        .with_context(|| format!("Failed to parse detector response: {}", line.trim()))?;

    if let Some(error) = result.error {
        log::warn!("Detector error: {}", error);
        return Ok(None);
    }

    for hand in result.hands {
        if hand.score < min_confidence {
            continue;
        }
        let Ok(points) = <[Landmark; landmarks::COUNT]>::try_from(hand.landmarks.as_slice()) else {
            log::warn!(
                "Expected {} landmarks, got {}",
                landmarks::COUNT,
                hand.landmarks.len()
            );
            continue;
        };
        return Ok(Some(HandLandmarks {
            landmarks: points,
            confidence: hand.score,
            handedness: hand.handedness,
        }));
    }

    Ok(None)
}

/// Block until the detector prints its `READY` line.
fn wait_for_ready<R: BufRead>(reader: &mut R) -> Result<()> {
    let mut ready_line = String::new();
    reader
        .read_line(&mut ready_line)
        .context("Failed to read detector handshake")?;
    if ready_line.trim() != "READY" {
        anyhow::bail!("Detector did not signal ready, got: {:?}", ready_line);
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    pub python: PathBuf,
    pub script: PathBuf,
    /// Clamped into [0, 1]
    pub min_confidence: f32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            python: PathBuf::from(".venv/bin/python"),
            script: PathBuf::from("hand_detect.py"),
            min_confidence: 0.7,
        }
    }
}

/// Hand tracker using MediaPipe via Python subprocess
pub struct HandTracker {
    process: Child,
    stdout_reader: BufReader<ChildStdout>,
    min_confidence: f32,
}

impl HandTracker {
    /// Start the detector and wait until it reports ready.
    pub fn spawn(config: &TrackerConfig) -> Result<Self> {
        if !config.script.exists() {
            anyhow::bail!("Hand detection script not found at {:?}", config.script);
        }
        if !config.python.exists() {
            anyhow::bail!(
                "Python interpreter not found at {:?}. Run: python3 -m venv .venv && .venv/bin/pip install mediapipe numpy",
                config.python
            );
        }

        log::info!("Starting MediaPipe hand detector subprocess...");

        let min_confidence = config.min_confidence.clamp(0.0, 1.0);
        let mut process = Command::new(&config.python)
            .arg(&config.script)
            .arg("--min-confidence")
            .arg(min_confidence.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .context("Failed to start Python subprocess")?;

        let ready = process
            .stdout
            .take()
            .context("Failed to get detector stdout")
            .map(BufReader::new)
            .and_then(|mut reader| wait_for_ready(&mut reader).map(|()| reader));
        let stdout_reader = match ready {
            Ok(reader) => reader,
            Err(e) => {
                let _ = process.kill();
                let _ = process.wait();
                return Err(e);
            }
        };

        log::info!("MediaPipe hand detector ready");

        Ok(Self {
            process,
            stdout_reader,
            min_confidence,
        })
    }

    /// Detect the first hand in a BGR frame.
    pub fn detect(&mut self, frame: &Mat) -> Result<Option<HandLandmarks>> {
        if frame.empty() {
            return Ok(None);
        }

        let width = frame.cols() as u32;
        let height = frame.rows() as u32;
        let channels = frame.channels() as u32;
        let data = frame.data_bytes()?;

        let stdin = self.process.stdin.as_mut().context("Failed to get detector stdin")?;
        stdin.write_all(&width.to_le_bytes())?;
        stdin.write_all(&height.to_le_bytes())?;
        stdin.write_all(&channels.to_le_bytes())?;
        stdin.write_all(data)?;
        stdin.flush()?;

        let mut response = String::new();
        if self.stdout_reader.read_line(&mut response)? == 0 {
            anyhow::bail!("Detector subprocess closed its output");
        }

        let hand = parse_detection(&response, self.min_confidence)?;
        if let Some(hand) = &hand {
            let wrist = hand.landmarks[landmarks::WRIST];
            let tip = hand.landmarks[landmarks::INDEX_FINGER_TIP];
            log::debug!(
                "Hand detected: {} (confidence={:.2}), wrist=({:.3},{:.3}), index_tip=({:.3},{:.3})",
                hand.handedness, hand.confidence, wrist.x, wrist.y, tip.x, tip.y
            );
        }
        Ok(hand)
    }
}

impl Drop for HandTracker {
    fn drop(&mut self) {
        let _ = self.process.kill();
        let _ = self.process.wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Bounds;
    use std::io::Cursor;

    fn hand_json(score: f32, count: usize) -> String {
        let landmarks: Vec<String> = (0..count)
            .map(|i| format!(r#"{{"x":{},"y":0.5,"z":0.0}}"#, i as f32 / 40.0))
            .collect();
        format!(
            r#"{{"handedness":"Right","score":{},"landmarks":[{}]}}"#,
            score,
            landmarks.join(",")
        )
    }

    #[test]
    fn test_parse_picks_first_confident_hand() {
        let line = format!(r#"{{"hands":[{},{}]}}"#, hand_json(0.4, 21), hand_json(0.9, 21));
        let hand = parse_detection(&line, 0.7).unwrap().unwrap();
        assert_eq!(hand.confidence, 0.9);
        assert_eq!(hand.handedness, "Right");
        assert_eq!(hand.landmarks[8].x, 8.0 / 40.0);
    }

    #[test]
    fn test_parse_skips_incomplete_hand() {
        let line = format!(r#"{{"hands":[{}]}}"#, hand_json(0.9, 20));
        assert!(parse_detection(&line, 0.5).unwrap().is_none());
    }

    #[test]
    fn test_parse_error_and_empty_responses() {
        assert!(parse_detection(r#"{"hands":[],"error":"bad frame"}"#, 0.5).unwrap().is_none());
        assert!(parse_detection("{\"hands\":[]}\n", 0.5).unwrap().is_none());
        assert!(parse_detection("not json", 0.5).is_err());
    }

    #[test]
    fn test_points_scale_to_frame_pixels() {
        let line = format!(r#"{{"hands":[{}]}}"#, hand_json(1.0, 21));
        let hand = parse_detection(&line, 0.5).unwrap().unwrap();
        let points = hand.points(Bounds::new(640, 480).unwrap());
        assert!((points.index_tip.x - 128.0).abs() < 1e-3);
        assert!((points.index_tip.y - 240.0).abs() < 1e-3);
        assert!((points.thumb_tip.x - 64.0).abs() < 1e-3);
        assert_eq!(points.wrist.x, 0.0);
    }

    #[test]
    fn test_pixel_out_of_range_is_none() {
        let line = format!(r#"{{"hands":[{}]}}"#, hand_json(1.0, 21));
        let hand = parse_detection(&line, 0.5).unwrap().unwrap();
        let frame = Bounds::new(640, 480).unwrap();
        let tip = hand.pixel(landmarks::INDEX_FINGER_TIP, frame).unwrap();
        assert_eq!(tip, hand.points(frame).index_tip);
        assert!(hand.pixel(landmarks::PINKY_TIP, frame).is_some());
        assert!(hand.pixel(landmarks::COUNT, frame).is_none());
    }

    struct BrokenPipe;

    impl std::io::Read for BrokenPipe {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "detector died"))
        }
    }

    #[test]
    fn test_handshake() {
        assert!(wait_for_ready(&mut Cursor::new("READY\n")).is_ok());
        assert!(wait_for_ready(&mut Cursor::new("Traceback (most recent call last):\n")).is_err());
        assert!(wait_for_ready(&mut Cursor::new("")).is_err());
        assert!(wait_for_ready(&mut BufReader::new(BrokenPipe)).is_err());
    }
}
