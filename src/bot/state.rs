//! The slot-filling conversation: which piece of the query (origin,
//! destination, departure time) a user is currently being asked for.

use chrono::{Duration, Local, NaiveDateTime};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use lazy_static::lazy_static;
use log::warn;
use regex::Regex;

use crate::database::models::{Mode, QuestionState};
use crate::database::schema::question_states;
use crate::matcher;
use crate::stations;

use super::events::{Event, EventSource};
use super::replies::{self, Reply};

/// States untouched for this long are invisible to the lookup even when not
/// expired.
const STATE_TTL_HOURS: i64 = 1;

lazy_static! {
    static ref RE_TRA_COMMAND: Regex = Regex::new(r"^查?(臺鐵|TRA|tra)").unwrap();
    static ref RE_THSR_COMMAND: Regex = Regex::new(r"^查?(高鐵|THSR|thsr)").unwrap();
    static ref RE_MENU_COMMAND: Regex = Regex::new(r"^([Tt]$|查)").unwrap();
}

#[derive(Debug, Insertable)]
#[diesel(table_name = question_states)]
struct NewQuestionState<'a> {
    mode: &'a str,
    user_id: &'a str,
    group_id: Option<&'a str>,
    expired: bool,
    updated_at: NaiveDateTime,
}

/// Entry point for text messages: keyword commands first, slot filling
/// otherwise.
pub fn match_text_and_assign(
    conn: &mut SqliteConnection,
    event: &Event,
) -> QueryResult<Option<Reply>> {
    let (source, text) = match event {
        Event::Message { source, text, .. } => (source, text),
        _ => return Ok(None),
    };
    let text = stations::fold_text(text.trim());

    if RE_TRA_COMMAND.is_match(&text) {
        return start_question(conn, source, Mode::Tra).map(Some);
    }
    if RE_THSR_COMMAND.is_match(&text) {
        return start_question(conn, source, Mode::Thsr).map(Some);
    }
    if RE_MENU_COMMAND.is_match(&text) {
        return Ok(Some(replies::main_menu()));
    }

    ask_question_states(conn, event)
}

/// Advances the user's active conversation, if any, on a message or
/// postback. Without an active state the event is silently ignored.
pub fn ask_question_states(
    conn: &mut SqliteConnection,
    event: &Event,
) -> QueryResult<Option<Reply>> {
    let source = event.source();
    let (mode, state) = match find_active_state(conn, source)? {
        Some(found) => found,
        None => return Ok(None),
    };

    match event {
        Event::Message { text, .. } => {
            let text = stations::fold_text(text.trim());
            if state.departure_station.is_none() {
                answer_departure(conn, mode, &state, &text)
            } else if state.destination_station.is_none() {
                answer_destination(conn, mode, &state, &text)
            } else if state.departure_time.is_some() && text == replies::SHOW_MORE_TEXT {
                show_more(conn, mode, &state)
            } else {
                Ok(None)
            }
        }
        Event::Postback { datetime, .. } => {
            match (&state.departure_station, &state.destination_station, state.departure_time) {
                (Some(from), Some(to), None) => {
                    answer_time(conn, mode, &state, from, to, datetime.as_deref())
                }
                _ => Ok(None),
            }
        }
        _ => Ok(None),
    }
}

/// Expires whatever was in flight for both modes and opens a fresh state.
fn start_question(
    conn: &mut SqliteConnection,
    source: &EventSource,
    mode: Mode,
) -> QueryResult<Reply> {
    expire_states(conn, source, Mode::Tra)?;
    expire_states(conn, source, Mode::Thsr)?;

    diesel::insert_into(question_states::table)
        .values(&NewQuestionState {
            mode: mode.as_str(),
            user_id: &source.user_id,
            group_id: source.group_id.as_deref(),
            expired: false,
            updated_at: Local::now().naive_local(),
        })
        .execute(conn)?;

    Ok(replies::ask_departure())
}

fn expire_states(
    conn: &mut SqliteConnection,
    source: &EventSource,
    mode: Mode,
) -> QueryResult<usize> {
    let base = question_states::table
        .filter(question_states::mode.eq(mode.as_str()))
        .filter(question_states::user_id.eq(&source.user_id))
        .filter(question_states::expired.eq(false));
    match source.group_id.as_deref() {
        Some(group) => diesel::update(base.filter(question_states::group_id.eq(group)))
            .set(question_states::expired.eq(true))
            .execute(conn),
        None => diesel::update(base.filter(question_states::group_id.is_null()))
            .set(question_states::expired.eq(true))
            .execute(conn),
    }
}

fn load_states(
    conn: &mut SqliteConnection,
    source: &EventSource,
    mode: Mode,
) -> QueryResult<Vec<QuestionState>> {
    let base = question_states::table
        .filter(question_states::mode.eq(mode.as_str()))
        .filter(question_states::user_id.eq(&source.user_id))
        .filter(question_states::expired.eq(false));
    match source.group_id.as_deref() {
        Some(group) => base
            .filter(question_states::group_id.eq(group))
            .load(conn),
        None => base.filter(question_states::group_id.is_null()).load(conn),
    }
}

/// The single active state for (user, group), TRA checked before THSR.
/// Finding more than one per mode means the invariant was violated (a race);
/// everything is expired and the lookup reports nothing.
fn find_active_state(
    conn: &mut SqliteConnection,
    source: &EventSource,
) -> QueryResult<Option<(Mode, QuestionState)>> {
    for mode in [Mode::Tra, Mode::Thsr] {
        let states = load_states(conn, source, mode)?;
        if states.len() > 1 {
            warn!(
                "multiple active {} question states for user {}, expiring all",
                mode, source.user_id
            );
            expire_states(conn, source, mode)?;
            return Ok(None);
        }
        if let Some(state) = states.into_iter().next() {
            if Local::now().naive_local() - state.updated_at > Duration::hours(STATE_TTL_HOURS) {
                continue;
            }
            return Ok(Some((mode, state)));
        }
    }
    Ok(None)
}

fn answer_departure(
    conn: &mut SqliteConnection,
    mode: Mode,
    state: &QuestionState,
    text: &str,
) -> QueryResult<Option<Reply>> {
    let station = match stations::match_station(mode, text) {
        Some(station) => station,
        None => return Ok(None),
    };

    diesel::update(question_states::table.find(state.id))
        .set((
            question_states::departure_station.eq(Some(station)),
            question_states::updated_at.eq(Local::now().naive_local()),
        ))
        .execute(conn)?;
    Ok(Some(replies::ask_destination()))
}

fn answer_destination(
    conn: &mut SqliteConnection,
    mode: Mode,
    state: &QuestionState,
    text: &str,
) -> QueryResult<Option<Reply>> {
    let station = match stations::match_station(mode, text) {
        Some(station) => station,
        None => return Ok(None),
    };

    if state.departure_station.as_deref() == Some(station) {
        // Stay in this slot; the response still counts as activity.
        touch(conn, state.id)?;
        return Ok(Some(replies::same_station_error(station)));
    }

    diesel::update(question_states::table.find(state.id))
        .set((
            question_states::destination_station.eq(Some(station)),
            question_states::updated_at.eq(Local::now().naive_local()),
        ))
        .execute(conn)?;
    Ok(Some(replies::datetime_picker()))
}

fn answer_time(
    conn: &mut SqliteConnection,
    mode: Mode,
    state: &QuestionState,
    from: &str,
    to: &str,
    datetime: Option<&str>,
) -> QueryResult<Option<Reply>> {
    let raw = match datetime {
        Some(raw) => raw,
        None => return Ok(None),
    };
    let picked = match NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M") {
        Ok(picked) => picked,
        Err(err) => {
            warn!("unparsable datetime postback {:?}: {}", raw, err);
            return Ok(None);
        }
    };

    diesel::update(question_states::table.find(state.id))
        .set((
            question_states::departure_time.eq(Some(picked)),
            question_states::updated_at.eq(Local::now().naive_local()),
        ))
        .execute(conn)?;

    let matches = matcher::find_matching_trains(conn, mode, from, to, picked)?;
    Ok(Some(replies::matching_results(mode, &matches)))
}

/// Re-runs the finished query and returns the untruncated list.
fn show_more(
    conn: &mut SqliteConnection,
    mode: Mode,
    state: &QuestionState,
) -> QueryResult<Option<Reply>> {
    let (from, to, time) = match (
        &state.departure_station,
        &state.destination_station,
        state.departure_time,
    ) {
        (Some(from), Some(to), Some(time)) => (from, to, time),
        _ => return Ok(None),
    };

    touch(conn, state.id)?;
    let matches = matcher::find_matching_trains(conn, mode, from, to, time)?;
    Ok(Some(replies::full_results(mode, &matches)))
}

fn touch(conn: &mut SqliteConnection, id: i32) -> QueryResult<()> {
    diesel::update(question_states::table.find(id))
        .set(question_states::updated_at.eq(Local::now().naive_local()))
        .execute(conn)?;
    Ok(())
}
