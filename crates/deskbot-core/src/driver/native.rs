//! Default driver: live captures + template matching + synthesized input

use super::{Modifier, ScreenDriver};
use crate::error::{Error, Result};
use enigo::{Button, Coordinate, Direction, Enigo, Key, Keyboard, Mouse, Settings};
use image::GrayImage;
use imageproc::template_matching::{find_extremes, match_template, MatchTemplateMethod};
use log::{debug, trace};
use std::path::Path;
use std::time::{Duration, Instant};

/// Normalized cross-correlation score required to accept a match.
const MATCH_THRESHOLD: f32 = 0.95;
/// Poll cadence while waiting for a template to appear.
const WAIT_POLL: Duration = Duration::from_millis(500);
/// Built-in ceiling on [`ScreenDriver::wait`], mirroring the engine's
/// default find timeout.
const WAIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Matches template images against monitor captures and drives the mouse
/// and keyboard through the OS input queue.
pub struct NativeDriver {
    enigo: Enigo,
}

impl NativeDriver {
    pub fn new() -> Result<Self> {
        let enigo = Enigo::new(&Settings::default())
            .map_err(|e| Error::action_failed("input init", &e.to_string()))?;
        Ok(Self { enigo })
    }

    /// Find the screen coordinates of the template's center, scanning every
    /// monitor in order. None when no monitor scores above the threshold.
    fn locate(&self, template: &Path) -> Result<Option<(i32, i32)>> {
        let tmpl: GrayImage = image::open(template)
            .map_err(|e| Error::action_failed("template load", &e.to_string()))?
            .to_luma8();

        let monitors =
            xcap::Monitor::all().map_err(|e| Error::capture_failed(&e.to_string()))?;
        for monitor in monitors {
            let shot = monitor
                .capture_image()
                .map_err(|e| Error::capture_failed(&e.to_string()))?;
            let gray = image::DynamicImage::ImageRgba8(shot).to_luma8();
            if gray.width() < tmpl.width() || gray.height() < tmpl.height() {
                continue;
            }
            let scores = match_template(
                &gray,
                &tmpl,
                MatchTemplateMethod::CrossCorrelationNormalized,
            );
            let extremes = find_extremes(&scores);
            trace!(
                "{}: best score {:.3} on monitor at {},{}",
                template.display(),
                extremes.max_value,
                monitor.x(),
                monitor.y()
            );
            if extremes.max_value >= MATCH_THRESHOLD {
                let (mx, my) = extremes.max_value_location;
                let cx = monitor.x() + mx as i32 + (tmpl.width() / 2) as i32;
                let cy = monitor.y() + my as i32 + (tmpl.height() / 2) as i32;
                return Ok(Some((cx, cy)));
            }
        }
        Ok(None)
    }
}

impl ScreenDriver for NativeDriver {
    fn exists(&mut self, image: &Path) -> Result<bool> {
        Ok(self.locate(image)?.is_some())
    }

    fn click(&mut self, image: &Path) -> Result<()> {
        let (x, y) = self
            .locate(image)?
            .ok_or_else(|| Error::action_failed("click", "template not visible"))?;
        debug!("click {} at {},{}", image.display(), x, y);
        self.enigo
            .move_mouse(x, y, Coordinate::Abs)
            .map_err(|e| Error::action_failed("mouse move", &e.to_string()))?;
        self.enigo
            .button(Button::Left, Direction::Click)
            .map_err(|e| Error::action_failed("click", &e.to_string()))?;
        Ok(())
    }

    fn wait(&mut self, image: &Path) -> Result<()> {
        let started = Instant::now();
        loop {
            if self.locate(image)?.is_some() {
                return Ok(());
            }
            if started.elapsed() >= WAIT_TIMEOUT {
                return Err(Error::action_failed(
                    "wait",
                    &format!(
                        "{} did not appear within {}s",
                        image.display(),
                        WAIT_TIMEOUT.as_secs()
                    ),
                ));
            }
            std::thread::sleep(WAIT_POLL);
        }
    }

    fn type_key(&mut self, key: &str) -> Result<()> {
        let key = parse_key(key)?;
        self.enigo
            .key(key, Direction::Click)
            .map_err(|e| Error::action_failed("key press", &e.to_string()))?;
        Ok(())
    }

    fn key_chord(&mut self, key: &str, modifiers: &[Modifier]) -> Result<()> {
        let main = parse_key(key)?;
        for modifier in modifiers {
            self.enigo
                .key(modifier_key(*modifier), Direction::Press)
                .map_err(|e| Error::action_failed("modifier press", &e.to_string()))?;
        }
        let pressed = self.enigo.key(main, Direction::Click);
        // Release held modifiers even when the main key failed.
        for modifier in modifiers.iter().rev() {
            self.enigo
                .key(modifier_key(*modifier), Direction::Release)
                .map_err(|e| Error::action_failed("modifier release", &e.to_string()))?;
        }
        pressed.map_err(|e| Error::action_failed("key press", &e.to_string()))?;
        Ok(())
    }
}

fn modifier_key(modifier: Modifier) -> Key {
    match modifier {
        Modifier::Control => Key::Control,
        Modifier::Alt => Key::Alt,
        Modifier::Shift => Key::Shift,
        Modifier::Meta => Key::Meta,
    }
}

/// Map a key name to the input engine's key type.
fn parse_key(name: &str) -> Result<Key> {
    match name.to_lowercase().as_str() {
        "return" | "enter" => Ok(Key::Return),
        "tab" => Ok(Key::Tab),
        "space" => Ok(Key::Space),
        "backspace" => Ok(Key::Backspace),
        "escape" | "esc" => Ok(Key::Escape),
        "delete" => Ok(Key::Delete),
        "home" => Ok(Key::Home),
        "end" => Ok(Key::End),
        "pageup" => Ok(Key::PageUp),
        "pagedown" => Ok(Key::PageDown),
        "left" => Ok(Key::LeftArrow),
        "right" => Ok(Key::RightArrow),
        "up" => Ok(Key::UpArrow),
        "down" => Ok(Key::DownArrow),
        "f1" => Ok(Key::F1),
        "f2" => Ok(Key::F2),
        "f3" => Ok(Key::F3),
        "f4" => Ok(Key::F4),
        "f5" => Ok(Key::F5),
        "f6" => Ok(Key::F6),
        "f7" => Ok(Key::F7),
        "f8" => Ok(Key::F8),
        "f9" => Ok(Key::F9),
        "f10" => Ok(Key::F10),
        "f11" => Ok(Key::F11),
        "f12" => Ok(Key::F12),
        single if single.chars().count() == 1 => {
            Ok(Key::Unicode(single.chars().next().unwrap()))
        }
        other => Err(Error::invalid_argument(format!("unknown key: {}", other))),
    }
}
