use super::*;

fn feed(decoder: &mut WiegandDecoder, bits: &[u8], start: Instant) -> Instant {
    let mut at = start;
    for &bit in bits {
        decoder.pulse(bit, at);
        at += Duration::from_millis(2);
    }
    at
}

#[test]
fn wiegand_four_bit_digit() {
    let mut decoder = WiegandDecoder::default();
    let t0 = Instant::now();
    let end = feed(&mut decoder, &[0, 1, 1, 1], t0);

    assert_eq!(decoder.poll(end), None, "frame stays open until the gap passes");
    assert_eq!(decoder.poll(end + WIEGAND_FRAME_GAP), Some(WiegandFrame::Key(Key::Digit(7))));
    assert_eq!(decoder.deadline(), None);
}

#[test]
fn wiegand_four_bit_star_and_hash() {
    assert_eq!(decode_wiegand(&[1, 0, 1, 0]), WiegandFrame::Key(Key::Star));
    assert_eq!(decode_wiegand(&[1, 0, 1, 1]), WiegandFrame::Key(Key::Hash));
    assert_eq!(decode_wiegand(&[1, 1, 1, 1]), WiegandFrame::Invalid { bits: 4 });
}

#[test]
fn wiegand_eight_bit_requires_complement_nibble() {
    // 5 = 0101, complement 1010.
    assert_eq!(decode_wiegand(&[1, 0, 1, 0, 0, 1, 0, 1]), WiegandFrame::Key(Key::Digit(5)));
    assert_eq!(decode_wiegand(&[0, 0, 0, 0, 0, 1, 0, 1]), WiegandFrame::Invalid { bits: 8 });
}

#[test]
fn wiegand_card_and_noise() {
    assert_eq!(decode_wiegand(&[0; 26]), WiegandFrame::Card { bits: 26 });
    assert_eq!(decode_wiegand(&[1, 0]), WiegandFrame::Invalid { bits: 2 });
}

#[test]
fn wiegand_gap_separates_frames() {
    let mut decoder = WiegandDecoder::default();
    let t0 = Instant::now();
    let end = feed(&mut decoder, &[0, 0, 1, 0], t0);
    assert_eq!(decoder.poll(end + WIEGAND_FRAME_GAP), Some(WiegandFrame::Key(Key::Digit(2))));

    let later = end + Duration::from_secs(1);
    let end = feed(&mut decoder, &[0, 0, 1, 1], later);
    assert_eq!(decoder.poll(end + WIEGAND_FRAME_GAP), Some(WiegandFrame::Key(Key::Digit(3))));
}

#[test]
fn quadrature_direction_follows_levels() {
    assert_eq!(quadrature_step(true, false), 1);
    assert_eq!(quadrature_step(false, true), 1);
    assert_eq!(quadrature_step(true, true), -1);
    assert_eq!(quadrature_step(false, false), -1);
}

#[test]
fn joystick_combines_switches() {
    assert_eq!(joystick_direction(true, false, false, false), Some(Direction::N));
    assert_eq!(joystick_direction(true, false, false, true), Some(Direction::Ne));
    assert_eq!(joystick_direction(false, true, true, false), Some(Direction::Sw));
    assert_eq!(joystick_direction(true, true, false, false), None);
    assert_eq!(joystick_direction(false, false, false, false), None);
}

#[test]
fn joystick_sampler_reports_new_directions_once() {
    let mut sampler = JoystickSampler::new(Duration::from_millis(80));
    let t0 = Instant::now();

    assert_eq!(sampler.sample(Some(Direction::N), t0), Some(Direction::N));
    assert_eq!(sampler.sample(Some(Direction::N), t0 + Duration::from_millis(10)), None, "held stick repeats nothing");
    assert_eq!(sampler.sample(None, t0 + Duration::from_millis(100)), None);
    assert_eq!(sampler.sample(Some(Direction::N), t0 + Duration::from_millis(200)), Some(Direction::N));
}

#[test]
fn joystick_sampler_debounces_chatter() {
    let mut sampler = JoystickSampler::new(Duration::from_millis(80));
    let t0 = Instant::now();

    assert_eq!(sampler.sample(Some(Direction::E), t0), Some(Direction::E));
    assert_eq!(sampler.sample(None, t0 + Duration::from_millis(5)), None);
    assert_eq!(sampler.sample(Some(Direction::E), t0 + Duration::from_millis(10)), None);
    assert_eq!(sampler.sample(None, t0 + Duration::from_millis(90)), None);
    assert_eq!(sampler.sample(Some(Direction::S), t0 + Duration::from_millis(120)), Some(Direction::S));
}

#[test]
fn direction_opposites_are_involutive() {
    for dir in Direction::ALL {
        assert_eq!(dir.opposite().opposite(), dir);
        assert_ne!(dir.opposite(), dir);
    }
}

#[test]
fn direction_parses_joystick_and_compass_names() {
    assert_eq!(Direction::parse("up"), Some(Direction::N));
    assert_eq!(Direction::parse("right"), Some(Direction::E));
    assert_eq!(Direction::parse("sw"), Some(Direction::Sw));
    assert_eq!(Direction::parse("sideways"), None);
    assert_eq!(serde_json::to_string(&Direction::Nw).unwrap(), "\"nw\"");
}

#[test]
fn lever_position_picks_low_pin() {
    assert_eq!(lever_position(&[(2, false), (4, true), (8, false)]), Some(4));
    assert_eq!(lever_position(&[(2, false), (4, false)]), None);
}

#[test]
fn lever_sampler_reports_changes_only() {
    let mut sampler = LeverSampler::new(2);
    assert_eq!(sampler.sample(vec![None, None]), None);
    assert_eq!(sampler.sample(vec![Some(2), None]), Some(vec![Some(2), None]));
    assert_eq!(sampler.sample(vec![Some(2), None]), None);
    assert_eq!(sampler.sample(vec![Some(2), Some(7)]), Some(vec![Some(2), Some(7)]));
}
