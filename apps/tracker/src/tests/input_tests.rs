use super::*;

#[test]
fn parses_commands_case_insensitively() {
    assert_eq!(parse_action("start"), Ok(UserAction::Start));
    assert_eq!(parse_action("  STOP \n"), Ok(UserAction::Stop));
    assert_eq!(parse_action("History"), Ok(UserAction::History));
    assert_eq!(parse_action("q"), Ok(UserAction::Quit));
}

#[test]
fn parses_bare_and_prefixed_ratings() {
    assert_eq!(parse_action("4"), Ok(UserAction::Rate(4)));
    assert_eq!(parse_action("rate 0"), Ok(UserAction::Rate(0)));
    // Out-of-range values are rejected later by the recorder.
    assert_eq!(parse_action("rate 12"), Ok(UserAction::Rate(12)));
}

#[test]
fn rejects_blank_unknown_and_malformed_input() {
    assert_eq!(parse_action("   "), Err(InputError::Empty));
    assert_eq!(
        parse_action("nap"),
        Err(InputError::Unknown("nap".to_string()))
    );
    assert_eq!(
        parse_action("rate great"),
        Err(InputError::InvalidRating("great".to_string()))
    );
    assert_eq!(
        parse_action("rate"),
        Err(InputError::InvalidRating(String::new()))
    );
}
