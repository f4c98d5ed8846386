mod api;
mod app;
mod application;
mod domain;
mod ui;
mod utils;

use iced::window;
use tracing_subscriber::EnvFilter;

fn main() -> iced::Result {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = api::ApiConfig::from_env();
    tracing::info!(base_url = %config.base_url, "using download server");

    iced::application(
        move || app::DownloadApp::new(config.clone()),
        app::update,
        app::view,
    )
    .title("Stream Media Downloader")
    .window(window::Settings {
        size: iced::Size::new(560.0, 420.0),
        ..Default::default()
    })
    .run()
}
