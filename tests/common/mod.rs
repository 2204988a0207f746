#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::NaiveDate;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use railbot::bot::replies::Reply;
use railbot::bot::{ReplySink, SinkError};
use railbot::database;
use railbot::database::models::Mode;
use railbot::feed::{FeedError, RawStopTime, RawTimetable, ScheduleSource};

pub fn memory_connection() -> SqliteConnection {
    let mut conn = SqliteConnection::establish(":memory:").unwrap();
    database::run_migrations(&mut conn).unwrap();
    conn
}

/// A canned feed answering every fetch with the same result, counting calls.
pub struct StubSource {
    result: Result<Vec<RawTimetable>, FeedError>,
    calls: AtomicUsize,
}

impl StubSource {
    pub fn with_payload(payload: Vec<RawTimetable>) -> StubSource {
        StubSource {
            result: Ok(payload),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: FeedError) -> StubSource {
        StubSource {
            result: Err(error),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn fetches(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ScheduleSource for StubSource {
    async fn fetch_daily_timetables(
        &self,
        _mode: Mode,
        _date: NaiveDate,
    ) -> Result<Vec<RawTimetable>, FeedError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.result.clone()
    }
}

/// Collects outbound replies instead of talking to a chat platform.
#[derive(Default)]
pub struct CollectingSink {
    pub sent: Vec<(String, Reply)>,
}

impl ReplySink for CollectingSink {
    fn send(&mut self, reply_token: &str, reply: Reply) -> Result<(), SinkError> {
        self.sent.push((reply_token.to_string(), reply));
        Ok(())
    }
}

pub fn reply_text(reply: &Reply) -> &str {
    match reply {
        Reply::Text(text) => text,
        Reply::Template { text, .. } => text,
    }
}

pub fn raw_timetable(
    train_no: &str,
    train_type_code: Option<&str>,
    stops: &[(&str, &str, &str)],
) -> RawTimetable {
    RawTimetable {
        train_no: train_no.to_string(),
        train_type_code: train_type_code.map(str::to_string),
        stop_times: stops
            .iter()
            .map(|&(station_id, arrival, departure)| RawStopTime {
                station_id: station_id.to_string(),
                arrival_time: if arrival.is_empty() {
                    None
                } else {
                    Some(arrival.to_string())
                },
                departure_time: departure.to_string(),
            })
            .collect(),
    }
}

/// A small slice of the 2018-06-02 TRA day: three 新竹→高雄 services after
/// 07:00, one before, and a post-midnight local filed under this day.
/// 5 trains, 18 stops in total.
pub fn tra_fixture() -> Vec<RawTimetable> {
    vec![
        raw_timetable(
            "51",
            Some("1110"),
            &[
                ("1000", "", "06:30"),
                ("1170", "07:17", "07:19"),
                ("1510", "08:50", "08:53"),
                ("1990", "11:16", "11:20"),
            ],
        ),
        raw_timetable(
            "103",
            Some("1100"),
            &[
                ("1000", "", "07:00"),
                ("1170", "07:38", "07:40"),
                ("1510", "09:05", "09:07"),
                ("1990", "11:32", "11:35"),
            ],
        ),
        raw_timetable(
            "105",
            Some("1100"),
            &[
                ("1000", "", "07:35"),
                ("1170", "08:12", "08:14"),
                ("1510", "09:45", "09:47"),
                ("1990", "12:10", "12:13"),
            ],
        ),
        raw_timetable(
            "101",
            Some("1100"),
            &[
                ("1000", "", "06:00"),
                ("1170", "06:40", "06:42"),
                ("1990", "10:30", "10:33"),
            ],
        ),
        // Departs before midnight, finishes after; stays filed under 06-02.
        raw_timetable(
            "2153",
            Some("1131"),
            &[
                ("1000", "", "23:50"),
                ("1070", "00:10", "00:12"),
                ("1170", "00:45", "00:47"),
            ],
        ),
    ]
}

pub const TRA_FIXTURE_TRAINS: i64 = 5;
pub const TRA_FIXTURE_STOPS: i64 = 18;

/// Three THSR services 新竹→左營 on 2018-06-05.
pub fn thsr_fixture() -> Vec<RawTimetable> {
    vec![
        raw_timetable(
            "803",
            None,
            &[
                ("1000", "", "06:45"),
                ("1030", "07:00", "07:02"),
                ("1040", "07:30", "07:32"),
                ("1070", "08:40", "08:40"),
            ],
        ),
        raw_timetable(
            "603",
            None,
            &[
                ("1000", "", "07:10"),
                ("1030", "07:25", "07:27"),
                ("1040", "07:51", "07:53"),
                ("1070", "08:50", "08:50"),
            ],
        ),
        raw_timetable(
            "1505",
            None,
            &[
                ("1030", "", "08:12"),
                ("1040", "08:42", "08:44"),
                ("1070", "09:50", "09:50"),
            ],
        ),
    ]
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}
