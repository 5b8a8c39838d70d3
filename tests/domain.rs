use assert_matches::assert_matches;
use chrono::NaiveDate;

use penn_canvas::domain::{Instance, ShoppingAction, Tool, parse_report_date};
use penn_canvas::error::CanvasError;

#[test]
fn report_dates() {
    assert_eq!(
        parse_report_date(" 2026-10-18 ").unwrap(),
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    );
    assert_matches!(
        parse_report_date("10/18/2026").unwrap_err(),
        CanvasError::InvalidDate(_)
    );
}

#[test]
fn instance_token_variables() {
    assert_eq!(Instance::Prod.token_env_var(), "CANVAS_TOKEN_PROD");
    assert_eq!(Instance::Test.token_env_var(), "CANVAS_TOKEN_TEST");
    assert_eq!(Instance::Beta.to_string(), "beta");
}

#[test]
fn shopping_targets() {
    assert!(ShoppingAction::Enable.target_visibility());
    assert!(!ShoppingAction::Disable.target_visibility());
}

#[test]
fn tool_names_round_trip_through_display() {
    assert_eq!(Tool::PollEverywhere.to_string(), "poll-everywhere");
    assert_eq!("Poll-Everywhere".parse::<Tool>().unwrap(), Tool::PollEverywhere);
    assert_matches!("blackboard".parse::<Tool>(), Err(CanvasError::InvalidTool(_)));
}
