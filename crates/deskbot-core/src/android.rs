//! Android device listing and mirroring conveniences

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// One `<serial>\t<type>` line of device-listing output. Descriptors are
/// derived fresh on every call and never cached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AndroidDevice {
    pub serial: String,
    /// Listing state, e.g. "device" or "unauthorized".
    pub kind: String,
}

/// Mirroring shortcut keys, each sent as a control-modified keystroke to the
/// mirroring window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceKey {
    Home,
    Back,
    AppSwitch,
    VolumeUp,
    VolumeDown,
    Power,
    Paste,
    FpsToggle,
}

impl DeviceKey {
    /// Key pressed together with Control for this shortcut.
    pub(crate) fn key_name(self) -> &'static str {
        match self {
            DeviceKey::Home => "h",
            DeviceKey::Back => "b",
            DeviceKey::AppSwitch => "s",
            DeviceKey::VolumeUp => "up",
            DeviceKey::VolumeDown => "down",
            DeviceKey::Power => "p",
            DeviceKey::Paste => "v",
            DeviceKey::FpsToggle => "i",
        }
    }
}

impl std::str::FromStr for DeviceKey {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> crate::error::Result<Self> {
        match s {
            "home" => Ok(DeviceKey::Home),
            "back" => Ok(DeviceKey::Back),
            "app-switch" => Ok(DeviceKey::AppSwitch),
            "volume-up" => Ok(DeviceKey::VolumeUp),
            "volume-down" => Ok(DeviceKey::VolumeDown),
            "power" => Ok(DeviceKey::Power),
            "paste" => Ok(DeviceKey::Paste),
            "fps" => Ok(DeviceKey::FpsToggle),
            other => Err(crate::error::Error::invalid_argument(format!(
                "unknown device key: {}",
                other
            ))),
        }
    }
}

static DEVICE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^(\S+)\t(\S+)\s*$").expect("device line pattern"));

/// Parse `adb devices` output. The banner line carries no tab and falls
/// through; malformed lines are dropped rather than guessed at.
pub(crate) fn parse_devices(output: &str) -> Vec<AndroidDevice> {
    DEVICE_LINE
        .captures_iter(output)
        .map(|caps| AndroidDevice {
            serial: caps[1].to_string(),
            kind: caps[2].to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_device_lines_give_two_descriptors() {
        let output = "List of devices attached\nR58M123ABC\tdevice\nemulator-5554\tunauthorized\n\n";
        let devices = parse_devices(output);
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].serial, "R58M123ABC");
        assert_eq!(devices[0].kind, "device");
        assert_eq!(devices[1].serial, "emulator-5554");
        assert_eq!(devices[1].kind, "unauthorized");
    }

    #[test]
    fn empty_and_headers_only_outputs_give_none() {
        assert!(parse_devices("").is_empty());
        assert!(parse_devices("List of devices attached\n\n").is_empty());
    }

    #[test]
    fn windows_line_endings_are_tolerated() {
        let output = "List of devices attached\r\nR58M123ABC\tdevice\r\n\r\n";
        let devices = parse_devices(output);
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].serial, "R58M123ABC");
    }

    #[test]
    fn device_keys_parse_from_cli_names() {
        assert_eq!("home".parse::<DeviceKey>().unwrap(), DeviceKey::Home);
        assert_eq!("fps".parse::<DeviceKey>().unwrap(), DeviceKey::FpsToggle);
        assert!("flip".parse::<DeviceKey>().is_err());
    }
}
