//! Puzzle 5 — Missile path reversal on an eight-way joystick.

use clap::Parser;
use escape_props::app::{self, AppError, Cli};
use escape_props::config::{PropSettings, load_prop_config};
use escape_props::hardware::InputGuard;
use escape_props::hardware::gpio;
use escape_props::puzzles::missile::{DEFAULTS, Missile, MissileConfig, MissileInput};
use escape_props::runtime::input_channel;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    let settings = PropSettings::from_env(DEFAULTS);
    let config: MissileConfig = load_prop_config(settings.prop_config.as_deref())?;

    let (input_tx, input_rx) = input_channel();
    let guard = if cli.mock {
        InputGuard::none()
    } else {
        let joystick = gpio::poll_joystick(config.joystick_pins.as_array(), input_tx, MissileInput::Push);
        gpio::or_mock(joystick, "joystick")
    };

    let machine = Missile::new(config);
    app::run(settings, cli.mock, machine, input_rx, guard).await
}
