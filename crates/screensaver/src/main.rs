use anyhow::Result;

use screensaver_engine::logging::{LoggingConfig, init_logging};

mod app;

use app::Screensaver;

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let mut app = Screensaver::new()
        .title("Screensaver GL")
        .size(800.0, 600.0);

    // Optional: an image to start with.
    if let Some(path) = std::env::args_os().nth(1) {
        app = app.texture(path);
    }

    log::info!("keys: O open texture, X delete, Enter/Esc confirm/cancel, 1-4 + arrows color, Space pause, Q quit");
    app.run()
}
