//! Puzzle 3 — Gadget Code keypad and video sequence.

use clap::Parser;
use escape_props::app::{self, AppError, Cli};
use escape_props::config::{PropSettings, load_prop_config};
use escape_props::hardware::gpio;
use escape_props::hardware::{InputGuard, leds_or_mock};
use escape_props::puzzles::gadget_code::{DEFAULTS, GadgetCode, GadgetCodeConfig, GadgetInput};
use escape_props::runtime::input_channel;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    let settings = PropSettings::from_env(DEFAULTS);
    let config: GadgetCodeConfig = load_prop_config(settings.prop_config.as_deref())?;

    let (input_tx, input_rx) = input_channel();
    let leds = leds_or_mock(cli.mock, &config.led_pins);
    let guard = if cli.mock {
        InputGuard::none()
    } else {
        let pins = config.keypad_pins;
        gpio::or_mock(gpio::watch_wiegand(pins.d0, pins.d1, input_tx, GadgetInput::from), "keypad")
    };

    let machine = GadgetCode::new(config, leds);
    app::run(settings, cli.mock, machine, input_rx, guard).await
}
