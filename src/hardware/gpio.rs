//! GPIO wiring on top of `rppal` (BCM numbering).
//!
//! Interrupt callbacks run on rppal's own threads. They only forward raw
//! edges into tokio channels with `try_send`; decoding happens in a tokio
//! task or in the machine. Polled surfaces (levers, joystick) run as tokio
//! tasks held by the returned `InputGuard`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rppal::gpio::{Gpio, InputPin, Level, OutputPin, Trigger};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::decode::{
    Direction, JoystickSampler, Key, LeverSampler, WiegandDecoder, WiegandFrame, joystick_direction, lever_position,
    quadrature_step,
};
use super::{GpioError, InputGuard, LedBank};

pub const BUTTON_DEBOUNCE: Duration = Duration::from_millis(50);
pub const JOYSTICK_DEBOUNCE: Duration = Duration::from_millis(80);
pub const JOYSTICK_POLL: Duration = Duration::from_millis(10);
pub const LEVER_POLL: Duration = Duration::from_millis(100);

fn claim_input(gpio: &Gpio, pin: u8) -> Result<InputPin, GpioError> {
    gpio.get(pin).map(rppal::gpio::Pin::into_input_pullup).map_err(|source| GpioError::Pin { pin, source })
}

/// Degrade a failed input surface to mock input (an empty guard).
#[must_use]
pub fn or_mock(result: Result<InputGuard, GpioError>, surface: &str) -> InputGuard {
    match result {
        Ok(guard) => {
            info!(surface, "gpio: input initialized");
            guard
        }
        Err(e) => {
            warn!(surface, error = %e, "gpio: input unavailable, using mock");
            InputGuard::none()
        }
    }
}

fn forward<I: std::fmt::Debug>(tx: &mpsc::Sender<I>, input: I) {
    if let Err(e) = tx.try_send(input) {
        debug!(error = %e, "gpio: input dropped");
    }
}

// =============================================================================
// OUTPUTS
// =============================================================================

pub struct GpioLeds {
    pins: Vec<OutputPin>,
    states: Vec<bool>,
}

impl GpioLeds {
    pub fn open(pins: &[u8]) -> Result<Self, GpioError> {
        let gpio = Gpio::new()?;
        let pins = pins
            .iter()
            .map(|&pin| gpio.get(pin).map(rppal::gpio::Pin::into_output_low).map_err(|source| GpioError::Pin { pin, source }))
            .collect::<Result<Vec<_>, _>>()?;
        let states = vec![false; pins.len()];
        Ok(Self { pins, states })
    }
}

impl LedBank for GpioLeds {
    fn len(&self) -> usize {
        self.pins.len()
    }

    fn set(&mut self, index: usize, on: bool) {
        if let Some(pin) = self.pins.get_mut(index) {
            pin.write(if on { Level::High } else { Level::Low });
            self.states[index] = on;
        }
    }

    fn get(&self, index: usize) -> bool {
        self.states.get(index).copied().unwrap_or(false)
    }

    fn is_mock(&self) -> bool {
        false
    }
}

// =============================================================================
// INPUTS
// =============================================================================

/// Pull-up push buttons, one falling-edge interrupt per `(id, pin)`.
pub fn watch_buttons<I, F>(
    buttons: &[(u8, u8)],
    debounce: Duration,
    tx: mpsc::Sender<I>,
    map: F,
) -> Result<InputGuard, GpioError>
where
    I: std::fmt::Debug + Send + 'static,
    F: Fn(u8) -> I + Send + Sync + 'static,
{
    let gpio = Gpio::new()?;
    let map = Arc::new(map);
    let mut guard = InputGuard::none();
    for &(id, pin) in buttons {
        let mut input = claim_input(&gpio, pin)?;
        let (tx, map) = (tx.clone(), Arc::clone(&map));
        input
            .set_async_interrupt(Trigger::FallingEdge, Some(debounce), move |_| forward(&tx, map(id)))
            .map_err(|source| GpioError::Pin { pin, source })?;
        guard.hold_pin(input);
    }
    Ok(guard)
}

/// Quadrature encoder: CLK interrupt on both edges, DT sampled in the
/// callback. Sends `map(±1)` per detent.
pub fn watch_encoder<I, F>(clk: u8, dt: u8, tx: mpsc::Sender<I>, map: F) -> Result<InputGuard, GpioError>
where
    I: std::fmt::Debug + Send + 'static,
    F: Fn(i8) -> I + Send + 'static,
{
    let gpio = Gpio::new()?;
    let mut clk_pin = claim_input(&gpio, clk)?;
    let dt_pin = claim_input(&gpio, dt)?;
    clk_pin
        .set_async_interrupt(Trigger::Both, None, move |event| {
            let clk_high = event.trigger == Trigger::RisingEdge;
            let step = quadrature_step(clk_high, dt_pin.is_high());
            forward(&tx, map(step));
        })
        .map_err(|source| GpioError::Pin { pin: clk, source })?;
    let mut guard = InputGuard::none();
    guard.hold_pin(clk_pin);
    Ok(guard)
}

/// Wiegand keypad on D0/D1. Pulses are decoded in a tokio task that closes
/// each frame after the silence gap.
pub fn watch_wiegand<I, F>(d0: u8, d1: u8, tx: mpsc::Sender<I>, map: F) -> Result<InputGuard, GpioError>
where
    I: std::fmt::Debug + Send + 'static,
    F: Fn(Key) -> I + Send + 'static,
{
    let gpio = Gpio::new()?;
    let (pulse_tx, mut pulse_rx) = mpsc::channel::<(u8, Instant)>(64);
    let mut guard = InputGuard::none();
    for (bit, pin) in [(0u8, d0), (1u8, d1)] {
        let mut input = claim_input(&gpio, pin)?;
        let pulse_tx = pulse_tx.clone();
        input
            .set_async_interrupt(Trigger::FallingEdge, None, move |_| {
                let _ = pulse_tx.try_send((bit, Instant::now()));
            })
            .map_err(|source| GpioError::Pin { pin, source })?;
        guard.hold_pin(input);
    }

    guard.hold_task(tokio::spawn(async move {
        let mut decoder = WiegandDecoder::default();
        loop {
            let deadline = decoder.deadline();
            tokio::select! {
                pulse = pulse_rx.recv() => {
                    let Some((bit, at)) = pulse else { break };
                    decoder.pulse(bit, at);
                }
                () = sleep_until(deadline) => {
                    match decoder.poll(Instant::now()) {
                        Some(WiegandFrame::Key(key)) => forward(&tx, map(key)),
                        Some(WiegandFrame::Card { bits }) => debug!(bits, "wiegand: card read ignored"),
                        Some(WiegandFrame::Invalid { bits }) => debug!(bits, "wiegand: invalid frame"),
                        None => {}
                    }
                }
            }
        }
    }));
    Ok(guard)
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(tokio::time::Instant::from_std(at)).await,
        None => std::future::pending().await,
    }
}

/// Four-switch joystick polled into eight directions. `pins` are
/// `[up, down, left, right]`.
pub fn poll_joystick<I, F>(pins: [u8; 4], tx: mpsc::Sender<I>, map: F) -> Result<InputGuard, GpioError>
where
    I: std::fmt::Debug + Send + 'static,
    F: Fn(Direction) -> I + Send + 'static,
{
    let gpio = Gpio::new()?;
    let switches = pins.iter().map(|&pin| claim_input(&gpio, pin)).collect::<Result<Vec<_>, _>>()?;
    let mut guard = InputGuard::none();
    guard.hold_task(tokio::spawn(async move {
        let mut sampler = JoystickSampler::new(JOYSTICK_DEBOUNCE);
        let mut ticker = tokio::time::interval(JOYSTICK_POLL);
        loop {
            ticker.tick().await;
            let closed: Vec<bool> = switches.iter().map(InputPin::is_low).collect();
            let reading = joystick_direction(closed[0], closed[1], closed[2], closed[3]);
            if let Some(dir) = sampler.sample(reading, Instant::now()) {
                forward(&tx, map(dir));
            }
        }
    }));
    Ok(guard)
}

/// Sparse-wired cam levers polled every `LEVER_POLL`. Each lever lists
/// `(position, pin)` pairs; the full reading is sent whenever it changes.
pub fn poll_levers<I, F>(levers: &[Vec<(u8, u8)>], tx: mpsc::Sender<I>, map: F) -> Result<InputGuard, GpioError>
where
    I: std::fmt::Debug + Send + 'static,
    F: Fn(Vec<Option<u8>>) -> I + Send + 'static,
{
    let gpio = Gpio::new()?;
    let mut wired: Vec<Vec<(u8, InputPin)>> = Vec::with_capacity(levers.len());
    for lever in levers {
        let pins = lever
            .iter()
            .map(|&(position, pin)| claim_input(&gpio, pin).map(|input| (position, input)))
            .collect::<Result<Vec<_>, _>>()?;
        wired.push(pins);
    }

    let mut guard = InputGuard::none();
    guard.hold_task(tokio::spawn(async move {
        let mut sampler = LeverSampler::new(wired.len());
        let mut ticker = tokio::time::interval(LEVER_POLL);
        loop {
            ticker.tick().await;
            let positions = wired
                .iter()
                .map(|pins| {
                    let readings: Vec<(u8, bool)> = pins.iter().map(|(pos, pin)| (*pos, pin.is_low())).collect();
                    lever_position(&readings)
                })
                .collect();
            if let Some(changed) = sampler.sample(positions) {
                forward(&tx, map(changed));
            }
        }
    }));
    Ok(guard)
}
