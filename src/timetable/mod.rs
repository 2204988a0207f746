//! Daily timetable ingestion: fetch a whole day from the feed, wipe the
//! date's stale rows and rebuild them through the normalizer, tracking
//! progress in the build-status ledger.

pub mod ledger;
pub mod normalize;

use std::error::Error;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use log::warn;

use crate::database::models::{BuildStatus, Mode, Train};
use crate::database::schema::{stop_entries, timetables, trains};
use crate::feed::{FeedError, RawTimetable, ScheduleSource};
use crate::stations;

use self::normalize::resolve_stop_times;

/// What one date's ingestion ended with. Everything except `Ok` carries a
/// message shown in logs (and, for source rejections, to the operator).
#[derive(Debug, Clone, PartialEq)]
pub enum BuildOutcome {
    Ok,
    Empty,
    Transient,
    SourceRejected(String),
    AlreadyBuilding,
    Unknown(String),
}

impl BuildOutcome {
    pub fn message(&self) -> String {
        match self {
            BuildOutcome::Ok => "OK".to_string(),
            BuildOutcome::Empty => "沒有相關資料".to_string(),
            BuildOutcome::Transient => "伺服端無法與平台連接".to_string(),
            BuildOutcome::SourceRejected(msg) => msg.clone(),
            BuildOutcome::AlreadyBuilding => "該日期資料建置中".to_string(),
            BuildOutcome::Unknown(msg) => format!("未知錯誤：{}", msg),
        }
    }
}

#[derive(Debug)]
enum IngestError {
    Db(diesel::result::Error),
    UnknownTrainType(String),
}

impl From<diesel::result::Error> for IngestError {
    fn from(err: diesel::result::Error) -> IngestError {
        IngestError::Db(err)
    }
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestError::Db(err) => write!(f, "database error: {}", err),
            IngestError::UnknownTrainType(code) => {
                write!(f, "can't convert train type code: {}", code)
            }
        }
    }
}

impl Error for IngestError {}

/// Builds the timetable store for all trains of (mode, date).
///
/// Already-built dates short-circuit unless `force` is set; a BUILDING status
/// left behind by a crashed run does not block, the date is simply rebuilt.
/// One failing date never takes the batch down: every failure is folded into
/// the returned outcome.
pub async fn build_database_by_date(
    conn: &mut SqliteConnection,
    source: &dyn ScheduleSource,
    mode: Mode,
    date: NaiveDate,
    force: bool,
) -> BuildOutcome {
    match build_inner(conn, source, mode, date, force).await {
        Ok(outcome) => outcome,
        Err(err) => {
            warn!("building {} timetables on {} failed: {}", mode, date, err);
            // Best-effort cleanup; the date stays REMOVED and is retried on
            // the next cycle.
            if let Err(cleanup) = remove_rows_for_date(conn, mode, date) {
                warn!("cleanup for {} on {} failed as well: {}", mode, date, cleanup);
            }
            BuildOutcome::Unknown(err.to_string())
        }
    }
}

async fn build_inner(
    conn: &mut SqliteConnection,
    source: &dyn ScheduleSource,
    mode: Mode,
    date: NaiveDate,
    force: bool,
) -> Result<BuildOutcome, IngestError> {
    if !force && ledger::check(conn, mode, date)? == BuildStatus::Built {
        return Ok(BuildOutcome::Ok);
    }

    let payload = match source.fetch_daily_timetables(mode, date).await {
        Ok(payload) => payload,
        Err(FeedError::Transient(msg)) => {
            warn!("fetching {} timetables on {} failed: {}", mode, date, msg);
            return Ok(BuildOutcome::Transient);
        }
        Err(FeedError::Rejected(msg)) => return Ok(BuildOutcome::SourceRejected(msg)),
    };

    if payload.is_empty() {
        // Zero trains is a valid answer; the date must not end up BUILT or a
        // later retry would be skipped. Stale rows still get purged.
        remove_rows_for_date(conn, mode, date)?;
        return Ok(BuildOutcome::Empty);
    }

    conn.transaction::<_, IngestError, _>(|conn| {
        remove_rows_for_date(conn, mode, date)?;
        ledger::update(conn, mode, date, BuildStatus::Building)?;
        for raw in &payload {
            match insert_train_timetable(conn, mode, date, raw) {
                Ok(()) => {}
                Err(IngestError::UnknownTrainType(code)) => {
                    warn!(
                        "can't convert train type code {} for train {}, skipping train",
                        code, raw.train_no
                    );
                }
                Err(err) => return Err(err),
            }
        }
        ledger::update(conn, mode, date, BuildStatus::Built)?;
        Ok(())
    })?;

    Ok(BuildOutcome::Ok)
}

/// Removes the date's timetables (and their stops) outside of a rebuild.
/// Declines while a build for the date is in flight.
pub fn remove_timetables_by_date(
    conn: &mut SqliteConnection,
    mode: Mode,
    date: NaiveDate,
) -> BuildOutcome {
    match ledger::check(conn, mode, date) {
        Ok(BuildStatus::Building) => return BuildOutcome::AlreadyBuilding,
        Ok(_) => {}
        Err(err) => return BuildOutcome::Unknown(err.to_string()),
    }
    match remove_rows_for_date(conn, mode, date) {
        Ok(()) => BuildOutcome::Ok,
        Err(err) => BuildOutcome::Unknown(err.to_string()),
    }
}

// Deleting a timetable cascades to its stop entries; train rows stay, they
// are shared across dates.
fn remove_rows_for_date(
    conn: &mut SqliteConnection,
    mode: Mode,
    date: NaiveDate,
) -> QueryResult<()> {
    let ids: Vec<i32> = timetables::table
        .inner_join(trains::table)
        .filter(trains::mode.eq(mode.as_str()))
        .filter(timetables::date.eq(date))
        .select(timetables::id)
        .load(conn)?;
    diesel::delete(stop_entries::table.filter(stop_entries::timetable_id.eq_any(&ids)))
        .execute(conn)?;
    diesel::delete(timetables::table.filter(timetables::id.eq_any(&ids))).execute(conn)?;
    ledger::update(conn, mode, date, BuildStatus::Removed)?;
    Ok(())
}

#[derive(Debug, Insertable)]
#[diesel(table_name = timetables)]
struct NewTimetable {
    train_id: i32,
    date: NaiveDate,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = stop_entries)]
struct NewStopEntry<'a> {
    timetable_id: i32,
    station_name: &'a str,
    arrival_time: NaiveDateTime,
    departure_time: NaiveDateTime,
}

fn insert_train_timetable(
    conn: &mut SqliteConnection,
    mode: Mode,
    date: NaiveDate,
    raw: &RawTimetable,
) -> Result<(), IngestError> {
    let train_id = find_or_create_train(conn, mode, raw)?;

    let stops = resolve_stop_times(raw, mode, date);
    let timetable_id: i32 = diesel::insert_into(timetables::table)
        .values(&NewTimetable { train_id, date })
        .returning(timetables::id)
        .get_result(conn)?;

    let rows: Vec<NewStopEntry> = stops
        .iter()
        .map(|stop| NewStopEntry {
            timetable_id,
            station_name: &stop.station_name,
            arrival_time: stop.arrival_time,
            departure_time: stop.departure_time,
        })
        .collect();
    diesel::insert_into(stop_entries::table).values(&rows).execute(conn)?;
    Ok(())
}

#[derive(Debug, Insertable)]
#[diesel(table_name = trains)]
struct NewTrain<'a> {
    mode: &'a str,
    train_no: &'a str,
    train_type: Option<&'a str>,
}

// The type name must be known before a train row can be created; an unknown
// code fails this train's ingestion only.
fn find_or_create_train(
    conn: &mut SqliteConnection,
    mode: Mode,
    raw: &RawTimetable,
) -> Result<i32, IngestError> {
    let existing = trains::table
        .filter(trains::mode.eq(mode.as_str()))
        .filter(trains::train_no.eq(&raw.train_no))
        .first::<Train>(conn)
        .optional()?;
    if let Some(train) = existing {
        return Ok(train.id);
    }

    let train_type = match mode {
        Mode::Tra => {
            let code = raw.train_type_code.as_deref().unwrap_or("");
            Some(
                stations::train_type_name(code)
                    .ok_or_else(|| IngestError::UnknownTrainType(code.to_string()))?,
            )
        }
        Mode::Thsr => None,
    };

    let id = diesel::insert_into(trains::table)
        .values(&NewTrain {
            mode: mode.as_str(),
            train_no: &raw.train_no,
            train_type,
        })
        .returning(trains::id)
        .get_result(conn)?;
    Ok(id)
}
