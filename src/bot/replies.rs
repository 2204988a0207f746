//! Outbound replies as plain data, plus the result formatting. Rendering to
//! the platform's concrete message types happens in the adapter.

use crate::database::models::Mode;
use crate::matcher::MatchedTrain;

pub const MAIN_MENU_ALT_TEXT: &str = "請選擇查詢交通類型";
pub const ASK_DEPARTURE_TEXT: &str = "請輸入起程站";
pub const ASK_DESTINATION_TEXT: &str = "請輸入目的站";
pub const ASK_TIME_ALT_TEXT: &str = "請選擇搭乘時間";
pub const NO_MATCH_TEXT: &str = "沒有適合的班次";
pub const SYSTEM_ERROR_TEXT: &str = "系統發生錯誤，請稍後再試";
pub const SHOW_MORE_TEXT: &str = "顯示更多";
pub const TRUNCATED_MARKER: &str = "...";

/// Inline templates only show a short preview; full text replies can carry
/// more before the platform rejects them.
pub const TEMPLATE_TEXT_LIMIT: usize = 125;
pub const TEXT_MESSAGE_LIMIT: usize = 1000;

#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Text(String),
    Template {
        alt_text: String,
        title: String,
        text: String,
        actions: Vec<Action>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Opens the platform's date/time picker; the picked value comes back as
    /// a postback with the given data key.
    DatetimePicker { label: String, data: String },
    /// Sends the given text back as a user message when tapped.
    Text { label: String, text: String },
}

pub fn main_menu() -> Reply {
    Reply::Template {
        alt_text: MAIN_MENU_ALT_TEXT.to_string(),
        title: "查詢班次".to_string(),
        text: MAIN_MENU_ALT_TEXT.to_string(),
        actions: vec![
            Action::Text {
                label: "台鐵".to_string(),
                text: "查臺鐵".to_string(),
            },
            Action::Text {
                label: "高鐵".to_string(),
                text: "查高鐵".to_string(),
            },
        ],
    }
}

pub fn ask_departure() -> Reply {
    Reply::Text(ASK_DEPARTURE_TEXT.to_string())
}

pub fn ask_destination() -> Reply {
    Reply::Text(ASK_DESTINATION_TEXT.to_string())
}

pub fn same_station_error(station: &str) -> Reply {
    Reply::Text(format!(
        "輸入的目的站與起程站皆是{}，請重新輸入有效目的站",
        station
    ))
}

pub fn datetime_picker() -> Reply {
    Reply::Template {
        alt_text: ASK_TIME_ALT_TEXT.to_string(),
        title: "搭乘時間".to_string(),
        text: ASK_TIME_ALT_TEXT.to_string(),
        actions: vec![Action::DatetimePicker {
            label: "選擇時間".to_string(),
            data: "datetime".to_string(),
        }],
    }
}

/// One result line: zero-padded train number, type category (TRA only),
/// origin departure and destination arrival clock times.
pub fn format_match_line(mode: Mode, matched: &MatchedTrain) -> String {
    let departure = matched.origin.departure_time.format("%H:%M");
    let arrival = matched.destination.arrival_time.format("%H:%M");
    match mode {
        Mode::Tra => format!(
            "{:0>4} {} {}→{}",
            matched.train.train_no,
            matched.train.train_type.as_deref().unwrap_or(""),
            departure,
            arrival
        ),
        Mode::Thsr => format!("{:0>4} {}→{}", matched.train.train_no, departure, arrival),
    }
}

/// Joins lines until the character budget is hit; reports whether anything
/// was cut off.
pub fn assemble_lines(lines: &[String], limit: usize) -> (String, bool) {
    let mut text = String::new();
    let mut used = 0;
    for (i, line) in lines.iter().enumerate() {
        let needed = line.chars().count() + if i > 0 { 1 } else { 0 };
        if used + needed > limit {
            return (text, true);
        }
        if i > 0 {
            text.push('\n');
        }
        text.push_str(line);
        used += needed;
    }
    (text, false)
}

/// The reply sent right after the time slot is filled: a short preview, with
/// a show-more action when the list got cut.
pub fn matching_results(mode: Mode, matches: &[MatchedTrain]) -> Reply {
    if matches.is_empty() {
        return Reply::Text(NO_MATCH_TEXT.to_string());
    }
    let lines: Vec<String> = matches
        .iter()
        .map(|matched| format_match_line(mode, matched))
        .collect();
    let (text, truncated) = assemble_lines(&lines, TEMPLATE_TEXT_LIMIT);
    if truncated {
        Reply::Template {
            alt_text: "查詢結果".to_string(),
            title: "適合班次".to_string(),
            text: format!("{}\n{}", text, TRUNCATED_MARKER),
            actions: vec![Action::Text {
                label: SHOW_MORE_TEXT.to_string(),
                text: SHOW_MORE_TEXT.to_string(),
            }],
        }
    } else {
        Reply::Text(text)
    }
}

/// The full (but still bounded) list, for the show-more command.
pub fn full_results(mode: Mode, matches: &[MatchedTrain]) -> Reply {
    if matches.is_empty() {
        return Reply::Text(NO_MATCH_TEXT.to_string());
    }
    let lines: Vec<String> = matches
        .iter()
        .map(|matched| format_match_line(mode, matched))
        .collect();
    let (mut text, truncated) = assemble_lines(&lines, TEXT_MESSAGE_LIMIT);
    if truncated {
        text.push('\n');
        text.push_str(TRUNCATED_MARKER);
    }
    Reply::Text(text)
}
