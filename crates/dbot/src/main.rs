//! dbot - deskbot CLI
//!
//! Windows GUI automation from the command line: image-driven clicks,
//! process control, capture with text recognition, Android mirroring and
//! script export.

use anyhow::Result;
use clap::{Parser, Subcommand};
use deskbot_core::prelude::*;
use deskbot_core::Cache;
use serde::Serialize;
use std::path::PathBuf;

use deskbot_export::{ExportLayout, Exporter};

#[derive(Parser)]
#[command(name = "dbot")]
#[command(about = "deskbot - Windows GUI automation and script export")]
#[command(version)]
struct Cli {
    /// Disable writes to the local cache store
    #[arg(long, global = true)]
    no_cache: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    // === Session ===
    /// Print the probed host environment
    Info,

    // === Image-driven interaction ===
    /// Click a template image if it is currently visible
    Click {
        image: PathBuf,
        #[arg(short, long, default_value = "0")]
        delay: f64,
        /// Second template to click if it shows up after the first click
        #[arg(long)]
        after: Option<PathBuf>,
    },
    /// Wait for a template image to appear, then click it
    WaitClick {
        image: PathBuf,
        #[arg(short, long, default_value = "0")]
        delay: f64,
    },
    /// Press a named key repeatedly
    Type {
        key: String,
        #[arg(short, long, default_value = "1")]
        count: u32,
        #[arg(short, long, default_value = "0")]
        delay: f64,
    },

    // === Process control ===
    /// Run a shell command; success means exit code 0
    Run {
        command: String,
        #[arg(short, long, default_value = "0")]
        delay: f64,
    },
    /// Start a program in the background
    Start {
        program: String,
        #[arg(long)]
        dir: Option<String>,
        #[arg(long)]
        args: Option<String>,
        #[arg(short, long, default_value = "0")]
        delay: f64,
    },
    /// Check whether a program is running
    Ps { program: String },
    /// Force-kill a program by image name
    Kill {
        program: String,
        #[arg(short, long, default_value = "0")]
        delay: f64,
    },
    /// Open a URL in the default browser and toggle full screen
    Open {
        url: String,
        #[arg(short, long, default_value = "0")]
        delay: f64,
    },

    // === Capture & recognition ===
    /// Capture the desktop, optionally with text recognition
    Capture {
        /// Flat bounds: four values (x y w h) per monitor
        #[arg(long, num_args = 4.., allow_negative_numbers = true)]
        bounds: Option<Vec<i32>>,
        #[arg(long)]
        text: bool,
        #[arg(long)]
        lang: Option<String>,
    },
    /// Recognize text on an existing image file
    Ocr {
        image: PathBuf,
        #[arg(long)]
        lang: Option<String>,
    },
    /// Capture, recognize, drop the transient file, print only the text
    ScreenText {
        #[arg(long, num_args = 4.., allow_negative_numbers = true)]
        bounds: Option<Vec<i32>>,
        #[arg(long)]
        lang: Option<String>,
    },

    // === Android mirroring ===
    /// List connected Android devices
    Devices,
    /// Control the mirroring window
    Mirror {
        #[command(subcommand)]
        action: MirrorAction,
    },
    /// Send a device shortcut to the mirroring window
    Key {
        /// home, back, app-switch, volume-up, volume-down, power, paste, fps
        shortcut: String,
    },

    // === Export & maintenance ===
    /// Export a recorded project as a module or standalone script
    Export {
        project: String,
        #[arg(long)]
        script: bool,
    },
    /// Delete the local cache store
    Purge,
}

#[derive(Subcommand)]
enum MirrorAction {
    Start {
        #[arg(short, long, default_value = "0")]
        delay: f64,
    },
    Stop,
    Status,
}

#[derive(Serialize)]
struct Output<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<Error>,
}

impl<T: Serialize> Output<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn err(e: Error) -> Output<()> {
        Output {
            success: false,
            data: None,
            error: Some(e),
        }
    }
}

fn print_json<T: Serialize>(output: &T) {
    println!("{}", serde_json::to_string_pretty(output).unwrap());
}

fn session(no_cache: bool) -> deskbot_core::Result<Session> {
    let config = SessionConfig {
        cache_enabled: !no_cache,
        ..SessionConfig::default()
    };
    Session::builder().config(config).build()
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let outcome = run(cli.command, cli.no_cache);
    match outcome {
        Ok(()) => Ok(()),
        Err(e) => {
            print_json(&Output::<()>::err(e));
            std::process::exit(1);
        }
    }
}

fn run(command: Commands, no_cache: bool) -> deskbot_core::Result<()> {
    match command {
        Commands::Info => {
            let session = session(no_cache)?;
            print_json(&Output::ok(session.env().clone()));
        }
        Commands::Click { image, delay, after } => {
            let mut session = session(no_cache)?;
            let clicked = session.check_and_click(&image, delay, after.as_deref())?;
            print_json(&Output::ok(serde_json::json!({ "clicked": clicked })));
        }
        Commands::WaitClick { image, delay } => {
            let mut session = session(no_cache)?;
            session.wait_and_click(&image, delay)?;
            print_json(&Output::ok(serde_json::json!({ "clicked": true })));
        }
        Commands::Type { key, count, delay } => {
            let mut session = session(no_cache)?;
            session.type_key_n_times(count, &key, delay)?;
            print_json(&Output::ok(serde_json::json!({ "typed": count })));
        }
        Commands::Run { command, delay } => {
            let session = session(no_cache)?;
            let ok = session.run_command(&command, delay)?;
            print_json(&Output::ok(serde_json::json!({ "ok": ok })));
        }
        Commands::Start { program, dir, args, delay } => {
            let session = session(no_cache)?;
            let ok = session.start_program(&program, dir.as_deref(), args.as_deref(), delay)?;
            print_json(&Output::ok(serde_json::json!({ "started": ok })));
        }
        Commands::Ps { program } => {
            let session = session(no_cache)?;
            let running = session.check_program_running(&program)?;
            print_json(&Output::ok(serde_json::json!({ "running": running })));
        }
        Commands::Kill { program, delay } => {
            let session = session(no_cache)?;
            let killed = session.kill_program(&program, delay)?;
            print_json(&Output::ok(serde_json::json!({ "killed": killed })));
        }
        Commands::Open { url, delay } => {
            let mut session = session(no_cache)?;
            let opened = session.start_website(&url, delay)?;
            print_json(&Output::ok(serde_json::json!({ "opened": opened })));
        }
        Commands::Capture { bounds, text, lang } => {
            let mut session = session(no_cache)?;
            let result = session.capture_screen(bounds.as_deref(), text, lang.as_deref())?;
            print_json(&Output::ok(result));
        }
        Commands::Ocr { image, lang } => {
            let session = session(no_cache)?;
            let text = session.recognize_text(&image, lang.as_deref())?;
            print_json(&Output::ok(serde_json::json!({ "text": text })));
        }
        Commands::ScreenText { bounds, lang } => {
            let mut session = session(no_cache)?;
            let text = session.get_screen_text(bounds.as_deref(), lang.as_deref())?;
            print_json(&Output::ok(serde_json::json!({ "text": text })));
        }
        Commands::Devices => {
            let session = session(no_cache)?;
            let devices = session.list_devices()?;
            print_json(&Output::ok(devices));
        }
        Commands::Mirror { action } => {
            let mut session = session(no_cache)?;
            match action {
                MirrorAction::Start { delay } => {
                    let started = session.start_mirroring(delay)?;
                    print_json(&Output::ok(serde_json::json!({ "mirroring": started })));
                }
                MirrorAction::Stop => {
                    let stopped = session.stop_mirroring()?;
                    print_json(&Output::ok(serde_json::json!({ "stopped": stopped })));
                }
                MirrorAction::Status => {
                    let mirroring = session.check_mirroring()?;
                    print_json(&Output::ok(serde_json::json!({ "mirroring": mirroring })));
                }
            }
        }
        Commands::Key { shortcut } => {
            let key: DeviceKey = shortcut.parse()?;
            let mut session = session(no_cache)?;
            session.send_device_key(key)?;
            print_json(&Output::ok(serde_json::json!({ "sent": shortcut })));
        }
        Commands::Export { project, script } => {
            let exporter = Exporter::with_layout(ExportLayout::default());
            let exported = if script {
                exporter.export_as_script(&project)?
            } else {
                exporter.export_as_module(&project)?
            };
            print_json(&Output::ok(serde_json::json!({ "exported": exported })));
        }
        Commands::Purge => {
            // No session here: constructing one would immediately recreate
            // the store being deleted.
            let config = SessionConfig::default();
            let purged = Cache::purge(&config.cache_dir)?;
            print_json(&Output::ok(serde_json::json!({ "purged": purged })));
        }
    }
    Ok(())
}
