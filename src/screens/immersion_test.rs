use super::*;
use crate::frame::RoomCommand;
use crate::prop::CommandError;

#[test]
fn starts_idle_and_ignores_activate() {
    let mut s = ImmersionScreen::new();
    s.activate(Instant::now());
    assert_eq!(s.mode(), ImmersionMode::Idle);
    assert!(!s.is_inactive(), "ready never auto-activates a screen");
    assert!(s.drain_events().is_empty());
}

#[test]
fn hack_signals_switch_mode_and_report_it() {
    let mut s = ImmersionScreen::new();
    let now = Instant::now();
    s.on_hack(HackSignal::Mode, now);
    assert_eq!(s.mode(), ImmersionMode::Hack);
    let events = s.drain_events();
    assert_eq!(events, vec![ImmersionEvent::State(ImmersionSnapshot { mode: ImmersionMode::Hack })]);
    assert_eq!(events[0].room_changes(), Some(json!({ "mode": "hack" })));

    s.on_hack(HackSignal::Resolved, now);
    assert_eq!(s.snapshot(), ImmersionSnapshot { mode: ImmersionMode::Idle });
}

#[test]
fn reset_returns_to_idle_and_broadcasts_reset() {
    let mut s = ImmersionScreen::new();
    let now = Instant::now();
    s.on_hack(HackSignal::Mode, now);
    s.drain_events();

    s.reset(now);
    assert_eq!(s.mode(), ImmersionMode::Idle);
    let events = s.drain_events();
    assert!(events.contains(&ImmersionEvent::Reset));
    assert_eq!(serde_json::to_value(&events[1]).unwrap(), json!({ "type": "reset" }));
}

#[test]
fn mock_hack_messages_route_as_simulated_input() {
    let mut s = ImmersionScreen::new();
    let msg: ImmersionMessage = serde_json::from_str(r#"{"type":"hackResolved"}"#).unwrap();
    let Some(Route::Simulated(input)) = s.route(msg) else {
        panic!("hack messages from a client are mock controls");
    };
    s.handle_input(input, Instant::now());
    assert!(s.drain_events().contains(&ImmersionEvent::HackResolved));
}

#[test]
fn other_commands_are_unknown() {
    let mut s = ImmersionScreen::new();
    assert_eq!(s.room_command(&RoomCommand::new("play_clip"), Instant::now()), Err(CommandError::Unknown));
    assert_eq!(CommandError::Unknown.to_string(), "Unknown command");
}

#[test]
fn config_frame_carries_only_mock_flag() {
    let s = ImmersionScreen::new();
    let frame: Value = serde_json::from_str(&crate::frame::config_frame(true, s.manifest())).unwrap();
    assert_eq!(frame, json!({ "type": "config", "mock": true }));
}
