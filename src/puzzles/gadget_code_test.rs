use super::*;
use crate::hardware::MockLeds;

fn machine() -> GadgetCode {
    GadgetCode::new(GadgetCodeConfig::default(), Box::new(MockLeds::new(3)))
}

fn input(m: &mut GadgetCode, input: GadgetInput) {
    m.handle_input(input, Instant::now());
}

fn type_code(m: &mut GadgetCode, code: &str) {
    for c in code.chars() {
        input(m, GadgetInput::Digit(c.to_digit(10).unwrap() as u8));
    }
    input(m, GadgetInput::Submit);
}

fn end(m: &mut GadgetCode, clip_id: &str) {
    input(m, GadgetInput::ClipEnded(clip_id.into()));
}

/// Activate and play through the intro and first situation clip.
fn at_first_situation() -> GadgetCode {
    let mut m = machine();
    m.activate(Instant::now());
    end(&mut m, "intro");
    end(&mut m, "situation-1");
    assert_eq!(m.state(), GadgetState::Situation);
    m.drain_events();
    m
}

#[test]
fn activation_plays_intro_then_first_situation() {
    let mut m = machine();
    m.activate(Instant::now());
    assert_eq!(m.state(), GadgetState::Intro);
    let events = m.drain_events();
    assert!(events.contains(&GadgetEvent::PlayClip { filename: "intro.mp4".into(), clip_id: "intro".into() }));

    end(&mut m, "intro");
    assert_eq!(m.playing(), Some(Clip::Situation(0)));
    let events = m.drain_events();
    assert!(events.contains(&GadgetEvent::PlayClip { filename: "situation-1.mp4".into(), clip_id: "situation-1".into() }));
}

#[test]
fn situation_clip_end_message_opens_input() {
    let mut m = machine();
    m.activate(Instant::now());
    end(&mut m, "intro");
    input(&mut m, GadgetInput::SituationClipEnded);
    assert_eq!(m.state(), GadgetState::Situation);
    assert!(m.drain_events().contains(&GadgetEvent::ShowIdle { situation_index: 0 }));
}

#[test]
fn digits_are_ignored_while_a_clip_plays() {
    let mut m = machine();
    m.activate(Instant::now());
    end(&mut m, "intro");
    m.drain_events();

    input(&mut m, GadgetInput::Digit(4));
    assert!(m.drain_events().is_empty());
    assert_eq!(m.snapshot().code_progress, 0);
}

#[test]
fn correct_code_advances_situation_and_lights_led() {
    let mut m = at_first_situation();
    type_code(&mut m, "4729");

    assert_eq!(m.current_situation(), 1);
    assert_eq!(m.playing(), Some(Clip::Correct));
    assert_eq!(m.snapshot().leds, vec![true, false, false]);
    let events = m.drain_events();
    assert!(events.contains(&GadgetEvent::CodeResult { correct: true, code: "4729".into() }));

    end(&mut m, "correct");
    assert_eq!(m.playing(), Some(Clip::Situation(1)));
}

#[test]
fn wrong_code_does_not_advance_or_touch_leds() {
    let mut m = at_first_situation();
    type_code(&mut m, "1111");

    assert_eq!(m.current_situation(), 0);
    assert_eq!(m.playing(), Some(Clip::Wrong));
    assert_eq!(m.snapshot().leds, vec![false, false, false]);

    end(&mut m, "wrong");
    assert_eq!(m.state(), GadgetState::Situation);
    assert_eq!(m.snapshot().code_progress, 0);
}

#[test]
fn buffer_stops_at_code_length() {
    let mut m = at_first_situation();
    for d in [4, 7, 2, 9, 5, 5] {
        input(&mut m, GadgetInput::Digit(d));
    }
    assert_eq!(m.snapshot().code_progress, 4);
    input(&mut m, GadgetInput::Submit);
    assert_eq!(m.current_situation(), 1, "extra digits were dropped, not appended");
}

#[test]
fn empty_submit_is_ignored() {
    let mut m = at_first_situation();
    input(&mut m, GadgetInput::Submit);
    assert_eq!(m.state(), GadgetState::Situation);
    assert!(m.drain_events().is_empty());
}

#[test]
fn delete_and_clear_edit_the_buffer() {
    let mut m = at_first_situation();
    input(&mut m, GadgetInput::Digit(4));
    input(&mut m, GadgetInput::Digit(7));
    input(&mut m, GadgetInput::Delete);
    assert_eq!(m.snapshot().code_progress, 1);
    input(&mut m, GadgetInput::Clear);
    assert_eq!(m.snapshot().code_progress, 0);
    let events = m.drain_events();
    assert!(events.contains(&GadgetEvent::CodeProgress { entered: 0, total: 4 }));
}

#[test]
fn full_playthrough_solves_after_solved_clip() {
    let mut m = at_first_situation();
    for (i, code) in ["4729", "8153", "3946"].iter().enumerate() {
        type_code(&mut m, code);
        end(&mut m, "correct");
        if i < 2 {
            end(&mut m, &format!("situation-{}", i + 2));
        }
    }
    assert_eq!(m.playing(), Some(Clip::Solved));
    end(&mut m, "solved");
    assert_eq!(m.state(), GadgetState::Solved);
    assert_eq!(m.snapshot().leds, vec![true, true, true]);
}

#[test]
fn stale_clip_end_is_ignored() {
    let mut m = at_first_situation();
    end(&mut m, "wrong");
    end(&mut m, "intro");
    assert_eq!(m.state(), GadgetState::Situation);
    assert!(m.drain_events().is_empty());
}

#[test]
fn force_solve_lands_in_solved_and_plays_solved_clip() {
    let mut m = at_first_situation();
    m.force_solve(Instant::now());
    assert_eq!(m.state(), GadgetState::Solved);
    assert_eq!(m.current_situation(), 3);
    let events = m.drain_events();
    assert!(events.contains(&GadgetEvent::PlayClip { filename: "solved.mp4".into(), clip_id: "solved".into() }));

    m.force_solve(Instant::now());
    assert!(m.drain_events().is_empty());
}

#[test]
fn reset_restores_initial_state() {
    let mut m = at_first_situation();
    type_code(&mut m, "4729");
    m.reset(Instant::now());
    let snapshot = m.snapshot();
    assert_eq!(snapshot.state, GadgetState::Inactive);
    assert_eq!(snapshot.current_situation, 0);
    assert_eq!(snapshot.leds, vec![false, false, false]);
    assert!(m.timers().is_empty());
}

#[test]
fn keypad_keys_map_to_inputs() {
    assert_eq!(GadgetInput::from(Key::Digit(3)), GadgetInput::Digit(3));
    assert_eq!(GadgetInput::from(Key::Star), GadgetInput::Clear);
    assert_eq!(GadgetInput::from(Key::Hash), GadgetInput::Submit);
}

#[test]
fn digit_messages_accept_text_or_numbers() {
    let m = machine();
    let text: GadgetMessage = serde_json::from_str(r#"{"type":"digit","digit":"7"}"#).unwrap();
    assert_eq!(m.route(text), Some(Route::Simulated(GadgetInput::Digit(7))));
    let number: GadgetMessage = serde_json::from_str(r#"{"type":"digit","digit":2}"#).unwrap();
    assert_eq!(m.route(number), Some(Route::Simulated(GadgetInput::Digit(2))));
    let junk: GadgetMessage = serde_json::from_str(r#"{"type":"digit","digit":"x"}"#).unwrap();
    assert_eq!(m.route(junk), None);

    let clip: GadgetMessage = serde_json::from_str(r#"{"type":"clipEnded","clipId":"intro"}"#).unwrap();
    assert_eq!(m.route(clip), Some(Route::Display(GadgetInput::ClipEnded("intro".into()))));
}

#[test]
fn room_changes_report_situation_progress() {
    let mut m = at_first_situation();
    type_code(&mut m, "4729");
    let changes = m
        .drain_events()
        .iter()
        .rev()
        .find_map(<GadgetEvent as PropEvent>::room_changes)
        .unwrap();
    assert_eq!(changes["state"], "playing_clip");
    assert!((changes["progress"].as_f64().unwrap() - 1.0 / 3.0).abs() < 1e-9);
}

#[test]
fn state_events_match_snapshot() {
    let mut m = at_first_situation();
    type_code(&mut m, "4729");
    end(&mut m, "correct");
    input(&mut m, GadgetInput::SituationClipEnded);
    input(&mut m, GadgetInput::Digit(3));
    input(&mut m, GadgetInput::Digit(8));

    let last = m
        .drain_events()
        .into_iter()
        .rev()
        .find_map(|e| match e {
            GadgetEvent::State(s) => Some(s),
            _ => None,
        })
        .unwrap();
    assert_eq!(last, m.snapshot());
    assert_eq!((last.current_situation, last.code_progress), (1, 2));
}
