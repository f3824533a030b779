//! Puzzle 1 — Simon button grid.

use clap::Parser;
use escape_props::app::{self, AppError, Cli};
use escape_props::config::{PropSettings, load_prop_config};
use escape_props::hardware::gpio::{self, BUTTON_DEBOUNCE};
use escape_props::hardware::{InputGuard, leds_or_mock};
use escape_props::puzzles::simon::{DEFAULTS, Simon, SimonConfig, SimonInput};
use escape_props::runtime::input_channel;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    let settings = PropSettings::from_env(DEFAULTS);
    let config: SimonConfig = load_prop_config(settings.prop_config.as_deref())?;

    let (input_tx, input_rx) = input_channel();
    let leds = leds_or_mock(cli.mock, &config.led_pins());
    let guard = if cli.mock {
        InputGuard::none()
    } else {
        gpio::or_mock(gpio::watch_buttons(&config.button_pins(), BUTTON_DEBOUNCE, input_tx, SimonInput::Press), "buttons")
    };

    let machine = Simon::with_entropy(config, leds);
    app::run(settings, cli.mock, machine, input_rx, guard).await
}
