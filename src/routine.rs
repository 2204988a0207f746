//! The daily jobs: rebuild a sliding window of upcoming dates for each
//! network, then purge history. One long-lived process, one date at a time.

use chrono::{Duration, Local, NaiveTime, Timelike};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use log::{error, info, warn};

use crate::database::models::Mode;
use crate::feed::ScheduleSource;
use crate::timetable::{self, ledger, BuildOutcome};

/// 台鐵提供近 60 天每日時刻表。
pub const TRA_WINDOW_DAYS: i64 = 60;
/// 高鐵提供近 45 天每日時刻表。
pub const THSR_WINDOW_DAYS: i64 = 45;

const RUN_JOBS_AT: &str = "00:00";

/// Ingests today through today + `days`. Already-built dates skip, failed
/// dates are logged and the loop moves on.
pub async fn build_window(
    conn: &mut SqliteConnection,
    source: &dyn ScheduleSource,
    mode: Mode,
    days: i64,
) {
    let today = Local::now().date_naive();
    for offset in 0..days {
        let date = today + Duration::days(offset);
        info!("start building {} timetables on {}", mode, date);
        let outcome = timetable::build_database_by_date(conn, source, mode, date, false).await;
        info!(
            "finish building {} timetables on {}, result={}",
            mode,
            date,
            outcome.message()
        );
    }
}

/// Drops timetable and ledger rows for dates strictly before yesterday.
pub fn clear_history(conn: &mut SqliteConnection, mode: Mode) -> QueryResult<()> {
    let cutoff = Local::now().date_naive() - Duration::days(1);
    for date in ledger::assigned_dates_before(conn, mode, cutoff)? {
        match timetable::remove_timetables_by_date(conn, mode, date) {
            BuildOutcome::Ok => ledger::remove_row(conn, mode, date)?,
            outcome => warn!("skipping purge of {} {}: {}", mode, date, outcome.message()),
        }
    }
    Ok(())
}

async fn run_all_jobs(conn: &mut SqliteConnection, source: &dyn ScheduleSource) {
    build_window(conn, source, Mode::Tra, TRA_WINDOW_DAYS).await;
    if let Err(err) = clear_history(conn, Mode::Tra) {
        error!("clearing TRA history failed: {}", err);
    }
    build_window(conn, source, Mode::Thsr, THSR_WINDOW_DAYS).await;
    if let Err(err) = clear_history(conn, Mode::Thsr) {
        error!("clearing THSR history failed: {}", err);
    }
}

/// Runs all jobs once, then again every day at the configured time.
pub async fn run_routine(conn: &mut SqliteConnection, source: &dyn ScheduleSource) {
    run_all_jobs(conn, source).await;

    let invoke_at = NaiveTime::parse_from_str(RUN_JOBS_AT, "%H:%M").unwrap();
    loop {
        tokio::time::sleep(std::time::Duration::from_secs(60)).await;
        let now = Local::now().time();
        if now.hour() == invoke_at.hour() && now.minute() == invoke_at.minute() {
            info!("start running jobs at {}", Local::now().format("%Y-%m-%d %H:%M"));
            run_all_jobs(conn, source).await;
        }
    }
}
