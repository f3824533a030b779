use super::*;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum TestMessage {
    ButtonPress { button: u8 },
}

#[test]
fn gm_controls_parse_by_type_tag() {
    assert_eq!(parse_inbound::<TestMessage>(r#"{"type":"activate"}"#), Some(Inbound::Control(GmControl::Activate)));
    assert_eq!(parse_inbound::<TestMessage>(r#"{"type":"forceSolve"}"#), Some(Inbound::Control(GmControl::ForceSolve)));
    assert_eq!(parse_inbound::<TestMessage>(r#"{"type":"ready","extra":1}"#), Some(Inbound::Control(GmControl::Ready)));
}

#[test]
fn prop_messages_fall_through_to_prop_type() {
    let parsed = parse_inbound::<TestMessage>(r#"{"type":"buttonPress","button":4}"#);
    assert_eq!(parsed, Some(Inbound::Prop(TestMessage::ButtonPress { button: 4 })));
}

#[test]
fn malformed_and_unknown_frames_are_dropped() {
    assert_eq!(parse_inbound::<TestMessage>("not json"), None);
    assert_eq!(parse_inbound::<TestMessage>(r#"{"type":"bogus"}"#), None);
    assert_eq!(parse_inbound::<TestMessage>(r#"{"type":"buttonPress","button":"x"}"#), None);
    assert_eq!(parse_inbound::<TestMessage>(r#"{"button":1}"#), None);
}

#[test]
fn config_frame_merges_manifest() {
    let text = config_frame(true, json!({ "buttons": [1, 2], "type": "ignored" }));
    let value: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value["type"], "config");
    assert_eq!(value["mock"], true);
    assert_eq!(value["buttons"], json!([1, 2]));
}

#[test]
fn state_frame_flattens_snapshot() {
    let text = state_frame(&json!({ "state": "active", "pressedCount": 3 }));
    let value: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value, json!({ "type": "state", "state": "active", "pressedCount": 3 }));
}

#[test]
fn room_outbound_envelopes() {
    let online: Value = serde_json::from_str(&RoomOutbound::online("puzzle-1").to_text()).unwrap();
    assert_eq!(online["type"], "prop_online");
    assert_eq!(online["payload"]["propId"], "puzzle-1");
    assert!(online["payload"]["timestamp"].as_u64().unwrap() > 0);

    let update: Value =
        serde_json::from_str(&RoomOutbound::update("puzzle-1", json!({ "state": "active" })).to_text()).unwrap();
    assert_eq!(update["type"], "prop_update");
    assert_eq!(update["payload"]["changes"]["state"], "active");
}

#[test]
fn ack_omits_error_on_success() {
    let ok: Value = serde_json::from_str(&RoomOutbound::ack(json!("r1"), Ok(())).to_text()).unwrap();
    assert_eq!(ok, json!({ "type": "cmd_ack", "payload": { "requestId": "r1", "success": true } }));

    let failed: Value =
        serde_json::from_str(&RoomOutbound::ack(json!(7), Err("Unknown command".into())).to_text()).unwrap();
    assert_eq!(failed["payload"]["success"], false);
    assert_eq!(failed["payload"]["error"], "Unknown command");
    assert_eq!(failed["payload"]["requestId"], 7);
}

#[test]
fn room_command_keeps_extra_arguments() {
    let cmd = parse_room_command(
        r#"{"type":"cmd","payload":{"propId":"screen-villain","requestId":"abc","command":"play_clip","filename":"a.mp4"}}"#,
    )
    .unwrap();
    assert_eq!(cmd.command, "play_clip");
    assert_eq!(cmd.request_id, Some(json!("abc")));
    assert_eq!(cmd.arg_str("filename"), Some("a.mp4"));
    assert!(cmd.is_for("screen-villain"));
    assert!(!cmd.is_for("screen-right"));
}

#[test]
fn room_command_without_prop_id_targets_everyone() {
    let cmd = parse_room_command(r#"{"type":"cmd","payload":{"command":"reset"}}"#).unwrap();
    assert!(cmd.is_for("anything"));
    assert_eq!(cmd.request_id, None);
}

#[test]
fn non_command_room_frames_are_ignored() {
    assert!(parse_room_command(r#"{"type":"hello","payload":{}}"#).is_none());
    assert!(parse_room_command(r#"{"type":"cmd"}"#).is_none());
    assert!(parse_room_command("{").is_none());
}
