//! Screen capture: pixel grabs, PNG persistence, bounds validation

use crate::error::{Error, Result};
use crate::host::MonitorGeometry;
use chrono::{DateTime, Utc};
use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// Capture region relative to one monitor's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// What a capture call produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureResult {
    /// Whether the image file exists on disk after the call.
    pub saved: bool,
    /// File name inside the shared image folder.
    pub file: String,
    /// Recognized text; empty when recognition was not requested.
    pub text: String,
}

/// Pixel source seam over the monitor hardware.
pub trait ScreenSource {
    fn monitors(&self) -> Result<Vec<MonitorGeometry>>;

    /// Grab one monitor's frame, optionally cropped to a region.
    fn grab(&self, monitor: usize, region: Option<Region>) -> Result<RgbaImage>;
}

/// Captures through the compositor.
pub struct XcapScreen;

impl ScreenSource for XcapScreen {
    fn monitors(&self) -> Result<Vec<MonitorGeometry>> {
        let monitors =
            xcap::Monitor::all().map_err(|e| Error::capture_failed(&e.to_string()))?;
        Ok(monitors
            .iter()
            .map(|m| MonitorGeometry {
                x: m.x(),
                y: m.y(),
                width: m.width(),
                height: m.height(),
            })
            .collect())
    }

    fn grab(&self, monitor: usize, region: Option<Region>) -> Result<RgbaImage> {
        let monitors =
            xcap::Monitor::all().map_err(|e| Error::capture_failed(&e.to_string()))?;
        let monitor = monitors
            .get(monitor)
            .ok_or_else(|| Error::capture_failed(&format!("no monitor {}", monitor)))?;
        let frame = monitor
            .capture_image()
            .map_err(|e| Error::capture_failed(&e.to_string()))?;
        match region {
            None => Ok(frame),
            Some(r) => {
                if r.x + r.width > frame.width() || r.y + r.height > frame.height() {
                    return Err(Error::capture_failed("region exceeds monitor bounds"));
                }
                Ok(image::imageops::crop_imm(&frame, r.x, r.y, r.width, r.height).to_image())
            }
        }
    }
}

/// Capture file name: epoch timestamp digits with the decimal point removed,
/// truncated to a 14-digit window, `.png` suffix.
pub(crate) fn capture_filename(now: DateTime<Utc>) -> String {
    let digits = format!("{}{:06}", now.timestamp(), now.timestamp_subsec_micros());
    let window: String = digits.chars().take(14).collect();
    format!("{}.png", window)
}

/// Validate a flat bounds slice into one region per monitor. The slice must
/// hold exactly four non-negative values (x, y, w, h) per attached monitor.
pub(crate) fn regions_from_bounds(bounds: &[i32], monitor_count: usize) -> Result<Vec<Region>> {
    if bounds.len() != 4 * monitor_count {
        return Err(Error::invalid_argument(format!(
            "bounds must hold 4 values per monitor: expected {}, got {}",
            4 * monitor_count,
            bounds.len()
        )));
    }
    let mut regions = Vec::with_capacity(monitor_count);
    for quad in bounds.chunks_exact(4) {
        let [x, y, w, h] = [quad[0], quad[1], quad[2], quad[3]];
        if x < 0 || y < 0 || w <= 0 || h <= 0 {
            return Err(Error::invalid_argument(format!(
                "bounds quad ({}, {}, {}, {}) must be non-negative with positive size",
                x, y, w, h
            )));
        }
        regions.push(Region {
            x: x as u32,
            y: y as u32,
            width: w as u32,
            height: h as u32,
        });
    }
    Ok(regions)
}

/// Stitch per-monitor frames side by side, left to right.
pub(crate) fn compose(frames: &[RgbaImage]) -> RgbaImage {
    let width: u32 = frames.iter().map(|f| f.width()).sum();
    let height: u32 = frames.iter().map(|f| f.height()).max().unwrap_or(0);
    let mut canvas = RgbaImage::new(width, height);
    let mut offset: i64 = 0;
    for frame in frames {
        image::imageops::replace(&mut canvas, frame, offset, 0);
        offset += i64::from(frame.width());
    }
    canvas
}
