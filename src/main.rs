use std::sync::Arc;
use std::thread;

use anyhow::Result;
use clap::Parser;
use eframe::egui;

use virtual_mouse::config::{Cli, Settings};
use virtual_mouse::pipeline::{self, SharedState};
use virtual_mouse::preview::PreviewApp;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = Settings::from(Cli::parse());

    log::info!("Starting Virtual Mouse");
    log::info!("Camera: {:?}", settings.camera);

    let state = Arc::new(SharedState::default());

    if settings.headless {
        return pipeline::run(state, settings);
    }

    let capture_state = state.clone();
    let capture = thread::spawn(move || {
        match pipeline::run(capture_state.clone(), settings) {
            Ok(()) => capture_state.stop(),
            Err(e) => {
                log::error!("Capture loop failed: {:#}", e);
                capture_state.fail(format!("{:#}", e));
            }
        }
    });

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([960.0, 720.0])
            .with_title("Virtual Mouse"),
        ..Default::default()
    };

    eframe::run_native(
        "Virtual Mouse",
        options,
        Box::new(|_cc| Ok(Box::new(PreviewApp::new(state.clone())))),
    )
    .map_err(|e| anyhow::anyhow!("Failed to run preview window: {}", e))?;

    state.stop();
    if capture.join().is_err() {
        log::error!("Capture thread panicked");
    }

    Ok(())
}
