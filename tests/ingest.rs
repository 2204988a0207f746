//! Store-backed ingestion tests: idempotence, forced rebuilds, error
//! outcomes and the history purge.

mod common;

use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use railbot::database::models::{BuildStatus, BuildingStatusOnDate, Mode};
use railbot::database::schema::{building_status, stop_entries, timetables, trains};
use railbot::feed::FeedError;
use railbot::routine;
use railbot::timetable::{self, BuildOutcome};

use common::{date, memory_connection, tra_fixture, StubSource, TRA_FIXTURE_STOPS, TRA_FIXTURE_TRAINS};

fn row_counts(conn: &mut SqliteConnection) -> (i64, i64, i64) {
    let trains: i64 = trains::table.count().get_result(conn).unwrap();
    let timetables: i64 = timetables::table.count().get_result(conn).unwrap();
    let stops: i64 = stop_entries::table.count().get_result(conn).unwrap();
    (trains, timetables, stops)
}

fn ledger_status(conn: &mut SqliteConnection, mode: Mode) -> BuildStatus {
    let row: BuildingStatusOnDate = building_status::table
        .filter(building_status::mode.eq(mode.as_str()))
        .first(conn)
        .unwrap();
    row.status()
}

#[tokio::test]
async fn building_a_date_creates_rows_and_marks_built() {
    let mut conn = memory_connection();
    let source = StubSource::with_payload(tra_fixture());

    let outcome =
        timetable::build_database_by_date(&mut conn, &source, Mode::Tra, date(2018, 6, 2), false)
            .await;

    assert_eq!(outcome, BuildOutcome::Ok);
    assert_eq!(
        row_counts(&mut conn),
        (TRA_FIXTURE_TRAINS, TRA_FIXTURE_TRAINS, TRA_FIXTURE_STOPS)
    );
    assert_eq!(ledger_status(&mut conn, Mode::Tra), BuildStatus::Built);
}

#[tokio::test]
async fn second_build_short_circuits_without_fetching() {
    let mut conn = memory_connection();
    let source = StubSource::with_payload(tra_fixture());
    let day = date(2018, 6, 2);

    timetable::build_database_by_date(&mut conn, &source, Mode::Tra, day, false).await;
    let before = row_counts(&mut conn);

    let outcome =
        timetable::build_database_by_date(&mut conn, &source, Mode::Tra, day, false).await;

    assert_eq!(outcome, BuildOutcome::Ok);
    assert_eq!(source.fetches(), 1);
    assert_eq!(row_counts(&mut conn), before);
}

#[tokio::test]
async fn forced_rebuild_with_same_payload_is_stable() {
    let mut conn = memory_connection();
    let source = StubSource::with_payload(tra_fixture());
    let day = date(2018, 6, 2);

    timetable::build_database_by_date(&mut conn, &source, Mode::Tra, day, false).await;
    let before = row_counts(&mut conn);

    let outcome = timetable::build_database_by_date(&mut conn, &source, Mode::Tra, day, true).await;

    assert_eq!(outcome, BuildOutcome::Ok);
    assert_eq!(source.fetches(), 2);
    assert_eq!(row_counts(&mut conn), before);
    assert_eq!(ledger_status(&mut conn, Mode::Tra), BuildStatus::Built);
}

#[tokio::test]
async fn empty_payload_purges_date_and_reports_empty() {
    let mut conn = memory_connection();
    let day = date(2018, 6, 2);

    let source = StubSource::with_payload(tra_fixture());
    timetable::build_database_by_date(&mut conn, &source, Mode::Tra, day, false).await;

    let empty = StubSource::with_payload(Vec::new());
    let outcome = timetable::build_database_by_date(&mut conn, &empty, Mode::Tra, day, true).await;

    assert_eq!(outcome, BuildOutcome::Empty);
    // Trains stay, the date's timetables and stops are gone, and the date is
    // NOT marked built so a later retry is not skipped.
    assert_eq!(row_counts(&mut conn), (TRA_FIXTURE_TRAINS, 0, 0));
    assert_eq!(ledger_status(&mut conn, Mode::Tra), BuildStatus::Removed);
}

#[tokio::test]
async fn transient_failure_mutates_nothing() {
    let mut conn = memory_connection();
    let day = date(2018, 6, 2);

    let source = StubSource::with_payload(tra_fixture());
    timetable::build_database_by_date(&mut conn, &source, Mode::Tra, day, false).await;
    let before = row_counts(&mut conn);

    let failing = StubSource::failing(FeedError::Transient("connection refused".to_string()));
    let outcome =
        timetable::build_database_by_date(&mut conn, &failing, Mode::Tra, day, true).await;

    assert_eq!(outcome, BuildOutcome::Transient);
    assert_eq!(row_counts(&mut conn), before);
    assert_eq!(ledger_status(&mut conn, Mode::Tra), BuildStatus::Built);
}

#[tokio::test]
async fn source_rejection_carries_the_message() {
    let mut conn = memory_connection();
    let rejecting = StubSource::failing(FeedError::Rejected("查詢日期超出範圍".to_string()));

    let outcome =
        timetable::build_database_by_date(&mut conn, &rejecting, Mode::Tra, date(2018, 6, 2), false)
            .await;

    assert_eq!(
        outcome,
        BuildOutcome::SourceRejected("查詢日期超出範圍".to_string())
    );
    assert_eq!(row_counts(&mut conn), (0, 0, 0));
}

#[tokio::test]
async fn unknown_train_type_skips_that_train_only() {
    let mut conn = memory_connection();
    let mut payload = tra_fixture();
    payload.push(common::raw_timetable(
        "9999",
        Some("8888"),
        &[("1000", "", "07:00"), ("1170", "08:10", "08:12")],
    ));
    let source = StubSource::with_payload(payload);

    let outcome =
        timetable::build_database_by_date(&mut conn, &source, Mode::Tra, date(2018, 6, 2), false)
            .await;

    assert_eq!(outcome, BuildOutcome::Ok);
    assert_eq!(
        row_counts(&mut conn),
        (TRA_FIXTURE_TRAINS, TRA_FIXTURE_TRAINS, TRA_FIXTURE_STOPS)
    );
    assert_eq!(ledger_status(&mut conn, Mode::Tra), BuildStatus::Built);
}

#[tokio::test]
async fn modes_keep_separate_rows() {
    let mut conn = memory_connection();
    let source = StubSource::with_payload(common::thsr_fixture());

    let outcome =
        timetable::build_database_by_date(&mut conn, &source, Mode::Thsr, date(2018, 6, 5), false)
            .await;

    assert_eq!(outcome, BuildOutcome::Ok);
    let thsr_trains: i64 = trains::table
        .filter(trains::mode.eq("THSR"))
        .count()
        .get_result(&mut conn)
        .unwrap();
    assert_eq!(thsr_trains, 3);
    let tra_trains: i64 = trains::table
        .filter(trains::mode.eq("TRA"))
        .count()
        .get_result(&mut conn)
        .unwrap();
    assert_eq!(tra_trains, 0);
}

#[tokio::test]
async fn purge_drops_dates_before_yesterday() {
    let mut conn = memory_connection();
    let source = StubSource::with_payload(tra_fixture());

    // 2018 is long past; everything qualifies for the purge.
    timetable::build_database_by_date(&mut conn, &source, Mode::Tra, date(2018, 6, 2), false).await;
    assert_eq!(
        row_counts(&mut conn),
        (TRA_FIXTURE_TRAINS, TRA_FIXTURE_TRAINS, TRA_FIXTURE_STOPS)
    );

    routine::clear_history(&mut conn, Mode::Tra).unwrap();

    assert_eq!(row_counts(&mut conn), (TRA_FIXTURE_TRAINS, 0, 0));
    let ledger_rows: i64 = building_status::table.count().get_result(&mut conn).unwrap();
    assert_eq!(ledger_rows, 0);
}
