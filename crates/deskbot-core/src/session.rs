//! Automaton session, the entry point tying probe, cache, driver and shell
//! together
//!
//! One `Session` is constructed per test script. Construction probes the
//! host once and initializes the cache; every other operation is an
//! independent, synchronous call in whatever order the script dictates.
//!
//! Two failure conventions hold throughout: bad argument values are hard
//! typed errors raised before any external action, while delegate failures
//! (non-zero exit codes, templates that never match) come back as `false`.

use crate::android::{self, AndroidDevice, DeviceKey};
use crate::cache::{Cache, ConsolePrompt, DriftDecision, DriftPrompt};
use crate::capture::{self, CaptureResult, ScreenSource, XcapScreen};
use crate::config::SessionConfig;
use crate::driver::{Modifier, NativeDriver, ScreenDriver};
use crate::error::{Error, Result};
use crate::host::HostEnv;
use crate::ocr::{self, TesseractCli, TextRecognizer};
use crate::shell::{self, CommandRunner, SystemShell};
use chrono::Utc;
use log::{debug, info, warn};
use std::fmt;
use std::fs;
use std::path::Path;
use std::thread;
use std::time::Duration;

pub struct Session {
    env: HostEnv,
    config: SessionConfig,
    cache: Option<Cache>,
    driver: Box<dyn ScreenDriver>,
    shell: Box<dyn CommandRunner>,
    screen: Box<dyn ScreenSource>,
    recognizer: Box<dyn TextRecognizer>,
    mirroring_started: bool,
}

/// Assembles a session, with hooks to replace any collaborator.
#[derive(Default)]
pub struct SessionBuilder {
    config: Option<SessionConfig>,
    host: Option<HostEnv>,
    driver: Option<Box<dyn ScreenDriver>>,
    shell: Option<Box<dyn CommandRunner>>,
    screen: Option<Box<dyn ScreenSource>>,
    recognizer: Option<Box<dyn TextRecognizer>>,
    prompt: Option<Box<dyn DriftPrompt>>,
}

impl SessionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Use pre-probed host facts instead of querying the platform.
    pub fn host(mut self, host: HostEnv) -> Self {
        self.host = Some(host);
        self
    }

    pub fn driver(mut self, driver: Box<dyn ScreenDriver>) -> Self {
        self.driver = Some(driver);
        self
    }

    pub fn shell(mut self, shell: Box<dyn CommandRunner>) -> Self {
        self.shell = Some(shell);
        self
    }

    pub fn screen(mut self, screen: Box<dyn ScreenSource>) -> Self {
        self.screen = Some(screen);
        self
    }

    pub fn recognizer(mut self, recognizer: Box<dyn TextRecognizer>) -> Self {
        self.recognizer = Some(recognizer);
        self
    }

    pub fn prompt(mut self, prompt: Box<dyn DriftPrompt>) -> Self {
        self.prompt = Some(prompt);
        self
    }

    pub fn build(self) -> Result<Session> {
        let config = self.config.unwrap_or_default();
        let screen = self.screen.unwrap_or_else(|| Box::new(XcapScreen));
        let env = match self.host {
            Some(env) => env,
            None => HostEnv::probe(screen.as_ref())?,
        };
        // The interaction primitives are OS-specific; this is a fatal
        // precondition, not something to degrade around.
        if !env.is_windows() {
            return Err(Error::unsupported_platform("session", &env.os_type));
        }
        let driver = match self.driver {
            Some(driver) => driver,
            None => Box::new(NativeDriver::new()?),
        };
        let shell = self.shell.unwrap_or_else(|| Box::new(SystemShell));
        let recognizer = self.recognizer.unwrap_or_else(|| Box::new(TesseractCli));

        let cache = if config.cache_enabled {
            let cache = Cache::open(&config.cache_dir)?;
            let prompt = self.prompt.unwrap_or_else(|| Box::new(ConsolePrompt));
            match cache.initialize(&env, prompt.as_ref())? {
                DriftDecision::Proceed => Some(cache),
                DriftDecision::Abort => {
                    info!("operator declined to continue after a screen change; exiting");
                    std::process::exit(0);
                }
            }
        } else {
            None
        };

        info!(
            "session ready on {} ({} {}, {} monitor(s))",
            env.hostname,
            env.os_type,
            env.os_version,
            env.monitor_count()
        );
        Ok(Session {
            env,
            config,
            cache,
            driver,
            shell,
            screen,
            recognizer,
            mirroring_started: false,
        })
    }
}

impl Session {
    /// Probe the host and open the cache with default collaborators.
    pub fn new() -> Result<Self> {
        SessionBuilder::new().build()
    }

    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    pub fn env(&self) -> &HostEnv {
        &self.env
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Cache handle; None when caching is disabled for this session.
    pub fn cache(&self) -> Option<&Cache> {
        self.cache.as_ref()
    }

    // === Image-driven interaction ===

    /// Click the template if it is currently visible. Returns false without
    /// clicking when it is not; optionally clicks a second template that
    /// shows up after the first click.
    pub fn check_and_click(
        &mut self,
        image: &Path,
        delay_secs: f64,
        after: Option<&Path>,
    ) -> Result<bool> {
        check_delay(delay_secs)?;
        ensure_image(image)?;
        if let Some(after) = after {
            ensure_image(after)?;
        }
        if !self.driver.exists(image)? {
            return Ok(false);
        }
        self.driver.click(image)?;
        if let Some(after) = after {
            if self.driver.exists(after)? {
                self.driver.click(after)?;
            }
        }
        sleep_secs(delay_secs);
        Ok(true)
    }

    /// Block until the template appears, then click it. The wait ceiling is
    /// the driver's own policy and is not exposed here.
    pub fn wait_and_click(&mut self, image: &Path, delay_secs: f64) -> Result<()> {
        check_delay(delay_secs)?;
        ensure_image(image)?;
        self.driver.wait(image)?;
        self.driver.click(image)?;
        sleep_secs(delay_secs);
        Ok(())
    }

    /// Press a named key `count` times, sleeping between presses.
    pub fn type_key_n_times(&mut self, count: u32, key: &str, delay_secs: f64) -> Result<()> {
        check_delay(delay_secs)?;
        for _ in 0..count {
            self.driver.type_key(key)?;
            sleep_secs(delay_secs);
        }
        Ok(())
    }

    // === Process control ===

    /// Run a shell command synchronously. True iff the exit code is zero.
    pub fn run_command(&self, command: &str, delay_secs: f64) -> Result<bool> {
        check_delay(delay_secs)?;
        ensure_value("command", command)?;
        let code = self.shell.run(command)?;
        debug!("`{}` exited with {}", command, code);
        sleep_secs(delay_secs);
        Ok(code == 0)
    }

    /// Start a program in the background, optionally from a working
    /// directory and with arguments.
    pub fn start_program(
        &self,
        program: &str,
        working_dir: Option<&str>,
        args: Option<&str>,
        delay_secs: f64,
    ) -> Result<bool> {
        check_delay(delay_secs)?;
        ensure_value("program", program)?;
        let command = shell::start_command(&self.env.os_type, program, working_dir, args)?;
        let ok = self.shell.run(&command)? == 0;
        sleep_secs(delay_secs);
        Ok(ok)
    }

    /// True when a process with the program's image name is running.
    pub fn check_program_running(&self, program: &str) -> Result<bool> {
        ensure_value("program", program)?;
        let command = shell::check_command(&self.env.os_type, program)?;
        Ok(self.shell.run(&command)? == 0)
    }

    /// Force-kill every process with the program's image name.
    pub fn kill_program(&self, program: &str, delay_secs: f64) -> Result<bool> {
        check_delay(delay_secs)?;
        ensure_value("program", program)?;
        let command = shell::kill_command(&self.env.os_type, program)?;
        let ok = self.shell.run(&command)? == 0;
        sleep_secs(delay_secs);
        Ok(ok)
    }

    /// Open a URL in the default browser, give the page its warm-up time,
    /// then toggle full screen.
    pub fn start_website(&mut self, url: &str, delay_secs: f64) -> Result<bool> {
        check_delay(delay_secs)?;
        ensure_value("url", url)?;
        if let Err(e) = open::that(url) {
            warn!("could not open {}: {}", url, e);
            return Ok(false);
        }
        sleep_secs(self.config.web_warmup_secs);
        sleep_secs(delay_secs);
        self.driver.type_key("f11")?;
        Ok(true)
    }

    // === Capture & recognition ===

    /// Capture the desktop (or one region per monitor), persist the frame as
    /// a PNG in the shared image folder, optionally recognize text on it,
    /// and record the screenshot in the cache.
    pub fn capture_screen(
        &mut self,
        bounds: Option<&[i32]>,
        with_text: bool,
        language: Option<&str>,
    ) -> Result<CaptureResult> {
        let lang = language.unwrap_or(&self.config.ocr_language).to_string();
        if with_text || language.is_some() {
            ocr::check_language(&lang)?;
        }
        let regions = match bounds {
            Some(values) => Some(capture::regions_from_bounds(values, self.env.monitor_count())?),
            None => None,
        };

        let mut frames = Vec::with_capacity(self.env.monitor_count());
        for index in 0..self.env.monitor_count() {
            let region = regions.as_ref().map(|r| r[index]);
            frames.push(self.screen.grab(index, region)?);
        }
        let frame = capture::compose(&frames);

        fs::create_dir_all(&self.config.image_dir)?;
        let file = capture::capture_filename(Utc::now());
        let path = self.config.image_dir.join(&file);
        frame
            .save(&path)
            .map_err(|e| Error::capture_failed(&e.to_string()))?;

        let text = if with_text {
            match self.recognizer.recognize(&path, &lang) {
                Ok(text) => text,
                Err(e) => {
                    let _ = fs::remove_file(&path);
                    return Err(e);
                }
            }
        } else {
            String::new()
        };

        if let Some(cache) = self.cache.as_ref() {
            // File and row travel together: when the row cannot be written,
            // the file is removed and the capture fails as a unit.
            if let Err(e) = cache.record_screenshot(&file, &self.env.hostname, &text) {
                let _ = fs::remove_file(&path);
                return Err(e);
            }
        }

        Ok(CaptureResult {
            saved: path.is_file(),
            file,
            text,
        })
    }

    /// Run recognition over an existing image file.
    pub fn recognize_text(&self, image: &Path, language: Option<&str>) -> Result<String> {
        let lang = language.unwrap_or(&self.config.ocr_language);
        ocr::check_language(lang)?;
        if !image.is_file() {
            return Err(Error::image_not_found(image));
        }
        self.recognizer.recognize(image, lang)
    }

    /// Capture with recognition, drop the transient image file, return only
    /// the text. The cache row stays as history.
    pub fn get_screen_text(
        &mut self,
        bounds: Option<&[i32]>,
        language: Option<&str>,
    ) -> Result<String> {
        let result = self.capture_screen(bounds, true, language)?;
        let path = self.config.image_dir.join(&result.file);
        if let Err(e) = fs::remove_file(&path) {
            warn!("could not remove transient capture {}: {}", path.display(), e);
        }
        Ok(result.text)
    }

    // === Android mirroring ===

    /// Descriptors for every connected device, derived fresh on each call.
    pub fn list_devices(&self) -> Result<Vec<AndroidDevice>> {
        let adb = self.config.scrcpy_dir.join(&self.config.adb_program);
        let output = self.shell.output(&adb, &["devices"], None)?;
        Ok(android::parse_devices(&output))
    }

    pub fn device_connected(&self) -> Result<bool> {
        Ok(!self.list_devices()?.is_empty())
    }

    pub fn device_count(&self) -> Result<usize> {
        Ok(self.list_devices()?.len())
    }

    /// Start mirroring when exactly one device is connected; false
    /// otherwise.
    pub fn start_mirroring(&mut self, delay_secs: f64) -> Result<bool> {
        check_delay(delay_secs)?;
        if self.device_count()? != 1 {
            return Ok(false);
        }
        let working_dir = self.config.scrcpy_dir.display().to_string();
        let program = self.config.scrcpy_program.clone();
        let started = self.start_program(&program, Some(&working_dir), None, delay_secs)?;
        if started {
            self.mirroring_started = true;
        }
        Ok(started)
    }

    pub fn check_mirroring(&self) -> Result<bool> {
        let program = self.config.scrcpy_program.clone();
        self.check_program_running(&program)
    }

    pub fn stop_mirroring(&mut self) -> Result<bool> {
        let program = self.config.scrcpy_program.clone();
        let stopped = self.kill_program(&program, 0.0)?;
        if stopped {
            self.mirroring_started = false;
        }
        Ok(stopped)
    }

    /// Every mirroring shortcut funnels through this control-modified
    /// keystroke to the mirroring window.
    pub fn send_device_key(&mut self, key: DeviceKey) -> Result<()> {
        self.driver.key_chord(key.key_name(), &[Modifier::Control])
    }

    pub fn device_home(&mut self) -> Result<()> {
        self.send_device_key(DeviceKey::Home)
    }

    pub fn device_back(&mut self) -> Result<()> {
        self.send_device_key(DeviceKey::Back)
    }

    pub fn device_app_switch(&mut self) -> Result<()> {
        self.send_device_key(DeviceKey::AppSwitch)
    }

    pub fn device_volume_up(&mut self) -> Result<()> {
        self.send_device_key(DeviceKey::VolumeUp)
    }

    pub fn device_volume_down(&mut self) -> Result<()> {
        self.send_device_key(DeviceKey::VolumeDown)
    }

    pub fn device_power(&mut self) -> Result<()> {
        self.send_device_key(DeviceKey::Power)
    }

    pub fn device_paste(&mut self) -> Result<()> {
        self.send_device_key(DeviceKey::Paste)
    }

    pub fn device_fps_toggle(&mut self) -> Result<()> {
        self.send_device_key(DeviceKey::FpsToggle)
    }

    // === Lifetime ===

    /// Drop the cache handle and delete the cache directory recursively.
    /// Returns whether the directory is absent afterwards.
    pub fn purge_cache(&mut self) -> Result<bool> {
        self.cache = None;
        Cache::purge(&self.config.cache_dir)
    }

    /// Explicitly release the session, stopping mirroring when this session
    /// started it. Teardown never rides on drop timing.
    pub fn close(mut self) -> Result<()> {
        if self.mirroring_started && self.check_mirroring()? {
            self.stop_mirroring()?;
        }
        Ok(())
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} automaton executed on a {} {} computer",
            self.env.runtime_version, self.env.os_type, self.env.os_version
        )
    }
}

fn check_delay(delay_secs: f64) -> Result<()> {
    if !delay_secs.is_finite() || delay_secs < 0.0 {
        return Err(Error::invalid_argument(
            "delay must be a non-negative number of seconds",
        ));
    }
    Ok(())
}

fn sleep_secs(delay_secs: f64) {
    if delay_secs > 0.0 {
        thread::sleep(Duration::from_secs_f64(delay_secs));
    }
}

fn ensure_image(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(Error::image_not_found(path))
    }
}

fn ensure_value(what: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(Error::invalid_argument(format!("{} must not be empty", what)))
    } else {
        Ok(())
    }
}
