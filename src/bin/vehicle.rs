//! Puzzle 4 — Vehicle selector with lever code.

use clap::Parser;
use escape_props::app::{self, AppError, Cli};
use escape_props::config::{PropSettings, load_prop_config};
use escape_props::hardware::InputGuard;
use escape_props::hardware::gpio::{self, BUTTON_DEBOUNCE};
use escape_props::puzzles::vehicle::{DEFAULTS, Nav, VehicleConfig, VehicleInput, VehicleSelect};
use escape_props::runtime::input_channel;

const NAV_LEFT: u8 = 0;
const NAV_RIGHT: u8 = 1;
const VALIDATE: u8 = 2;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    let settings = PropSettings::from_env(DEFAULTS);
    let config: VehicleConfig = load_prop_config(settings.prop_config.as_deref())?;

    let (input_tx, input_rx) = input_channel();
    let mut guard = InputGuard::none();
    if !cli.mock {
        let nav = config.navigation_pins;
        let buttons = [(NAV_LEFT, nav.left), (NAV_RIGHT, nav.right), (VALIDATE, config.validate_pin)];
        let presses = gpio::watch_buttons(&buttons, BUTTON_DEBOUNCE, input_tx.clone(), |id| match id {
            NAV_LEFT => VehicleInput::Navigate(Nav::Left),
            NAV_RIGHT => VehicleInput::Navigate(Nav::Right),
            _ => VehicleInput::Validate,
        });
        guard.merge(gpio::or_mock(presses, "buttons"));
        let levers = gpio::poll_levers(&config.lever_wiring(), input_tx, VehicleInput::SetLevers);
        guard.merge(gpio::or_mock(levers, "levers"));
    }

    let machine = VehicleSelect::new(config);
    app::run(settings, cli.mock, machine, input_rx, guard).await
}
