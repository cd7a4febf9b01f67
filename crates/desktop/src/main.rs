//! Omni Chat Desktop — application entry.

mod app;

use anyhow::Context;
use eframe::egui;

fn main() -> anyhow::Result<()> {
    app::install_logger();

    let (config, config_path) = omnichat::config::load_config(None)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .context("starting async runtime")?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([900.0, 760.0])
            .with_min_inner_size([480.0, 420.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Omni Chat",
        options,
        Box::new(move |_cc| Box::new(app::OmniChatApp::new(config, config_path, runtime))),
    )
    .map_err(|e| anyhow::anyhow!("desktop ui failed: {}", e))
}
