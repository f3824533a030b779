//! Puzzle 2 — World Map crosshair on two rotary encoders.

use clap::Parser;
use escape_props::app::{self, AppError, Cli};
use escape_props::config::{PropSettings, load_prop_config};
use escape_props::hardware::gpio;
use escape_props::hardware::{InputGuard, tone_or_mock};
use escape_props::puzzles::world_map::{Axis, DEFAULTS, WorldMap, WorldMapConfig, WorldMapInput};
use escape_props::runtime::input_channel;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();
    let settings = PropSettings::from_env(DEFAULTS);
    let config: WorldMapConfig = load_prop_config(settings.prop_config.as_deref())?;

    let (input_tx, input_rx) = input_channel();
    let tone = tone_or_mock(cli.mock, config.beep_frequency_hz, config.beep_duration_ms);
    let mut guard = InputGuard::none();
    if !cli.mock {
        for (axis, pins) in [(Axis::X, config.encoder_pins.x), (Axis::Y, config.encoder_pins.y)] {
            let turns = gpio::watch_encoder(pins.clk, pins.dt, input_tx.clone(), move |direction| WorldMapInput::Turn {
                axis,
                direction,
            });
            guard.merge(gpio::or_mock(turns, "encoder"));
        }
    }

    let machine = WorldMap::new(config, tone);
    app::run(settings, cli.mock, machine, input_rx, guard).await
}
