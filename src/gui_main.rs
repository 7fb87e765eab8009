//! Desktop periodicity explorer
//!
//! Run with: cargo run --features gui --bin periodicity-vis -- [dataset key]

use eframe::egui;
use periodicity_vis::app::PeriodicityApp;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> eframe::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,periodicity_vis=debug"));
    fmt().with_env_filter(filter).with_target(true).init();

    let initial_dataset = std::env::args().nth(1).filter(|a| !a.starts_with("--"));
    info!(dataset = ?initial_dataset, "Starting periodicity explorer");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 900.0])
            .with_min_inner_size([800.0, 600.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Periodicity",
        options,
        Box::new(move |cc| Ok(Box::new(PeriodicityApp::new(cc, initial_dataset)))),
    )
}
