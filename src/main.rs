mod app;
mod backend;
mod config;
mod layout;
mod live;
mod pipeline;
mod util;

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Args, Settings};

fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| "relion_dash=info".into()),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.log_level.as_deref());

    let settings = Settings::from_args(&args)?;
    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([1440.0, 920.0])
            .with_title("relion-dash"),
        ..Default::default()
    };

    eframe::run_native(
        "relion-dash",
        options,
        Box::new(move |cc| {
            let app = app::DashboardApp::new(cc, settings)?;
            Ok(Box::new(app))
        }),
    )
    .map_err(|error| anyhow::anyhow!("dashboard window failed: {error}"))
}
