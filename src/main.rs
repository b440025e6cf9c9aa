#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use anyhow::Result;
use clap::Parser;
use rfd::{MessageDialog, MessageLevel};
use std::process::ExitCode;
use std::thread;

use ocrsnip::capture::{CaptureFinalizer, CaptureStore, ScreenGrabber, XcapGrabber};
use ocrsnip::config::Config;
use ocrsnip::outcome::CaptureOutcome;
use ocrsnip::overlay;
use ocrsnip::session::{self, OverlayController, SessionContext};

fn snip(config: &Config, ctx: &SessionContext) -> Result<CaptureOutcome> {
    // let whatever launched us get off the screen first
    thread::sleep(config.startup_delay());

    let grabber = XcapGrabber;
    let snapshot = grabber.grab()?;
    let (w, h) = snapshot.dimensions();
    log::info!("[session {}] Overlay opened on a {}x{} screen", ctx.id(), w, h);

    let controller = OverlayController::new(ctx.clone(), w, h, config.min_size);
    overlay::run_overlay(snapshot, controller, config.magnifier())?;

    let store = CaptureStore::new(&config.captures_dir);
    let finalizer = CaptureFinalizer::new(&grabber, &store)
        .settle(config.settle())
        .contrast_cutoff(config.contrast_cutoff);
    Ok(session::conclude(ctx, &finalizer))
}

fn notify(outcome: &CaptureOutcome) {
    match outcome {
        CaptureOutcome::Failed { error } => {
            MessageDialog::new()
                .set_level(MessageLevel::Error)
                .set_title("Capture failed")
                .set_description(error)
                .show();
        }
        CaptureOutcome::Accepted { blank: true, path, .. } => {
            MessageDialog::new()
                .set_level(MessageLevel::Warning)
                .set_title("Capture looks blank")
                .set_description(format!("{} is almost entirely black or white.", path.display()))
                .show();
        }
        _ => {}
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::parse();
    let ctx = SessionContext::new();
    log::info!("[session {}] --- New Capture Session ---", ctx.id());

    let outcome = match snip(&config, &ctx) {
        Ok(outcome) => outcome,
        Err(e) => {
            log::error!("[session {}] Error in capture session: {:#}", ctx.id(), e);
            CaptureOutcome::failed(format!("{e:#}"))
        }
    };

    if config.notify {
        notify(&outcome);
    }

    // stdout carries exactly one line: the outcome
    match outcome.to_json_line() {
        Ok(line) => println!("{line}"),
        Err(e) => log::error!("[session {}] Could not encode outcome: {}", ctx.id(), e),
    }
    ExitCode::from(outcome.exit_code() as u8)
}
