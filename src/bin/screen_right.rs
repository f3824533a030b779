//! Right screen.

use clap::Parser;
use escape_props::app::{self, AppError, Cli};
use escape_props::config::{PropSettings, load_prop_config};
use escape_props::hardware::InputGuard;
use escape_props::runtime::input_channel;
use escape_props::screens::right::{DEFAULTS, RightScreen, RightScreenConfig};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    let settings = PropSettings::from_env(DEFAULTS);
    let config: RightScreenConfig = load_prop_config(settings.prop_config.as_deref())?;

    let (_input_tx, input_rx) = input_channel();
    app::run(settings, cli.mock, RightScreen::new(config), input_rx, InputGuard::none()).await
}
