//! Immersion screen.

use clap::Parser;
use escape_props::app::{self, AppError, Cli};
use escape_props::config::PropSettings;
use escape_props::hardware::InputGuard;
use escape_props::runtime::input_channel;
use escape_props::screens::immersion::{DEFAULTS, ImmersionScreen};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    let settings = PropSettings::from_env(DEFAULTS);
    let (_input_tx, input_rx) = input_channel();
    app::run(settings, cli.mock, ImmersionScreen::new(), input_rx, InputGuard::none()).await
}
