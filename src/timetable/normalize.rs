//! Turns one raw daily schedule into stop entries with resolved calendar
//! dates.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use log::warn;

use crate::database::models::Mode;
use crate::feed::RawTimetable;
use crate::stations;

/// A stop with its clock times anchored to real dates.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedStop {
    pub station_name: String,
    pub arrival_time: NaiveDateTime,
    pub departure_time: NaiveDateTime,
}

/// Resolves the stop sequence of one train for `date_input`.
///
/// Stops with a station code the directory does not know are dropped, the
/// rest of the train is kept. Overnight services are detected by three
/// conditions, checked in this order:
/// 1. the flag is already set: everything from here on is on the next day;
/// 2. a stop departs before it arrives: its schedule wrapped past midnight
///    while the train was standing there;
/// 3. a stop arrives before the previous stop departed: the wrap happened
///    between stops.
/// The conditions fire on different malformed-data shapes seen in the feed
/// and must not be collapsed into one rule.
pub fn resolve_stop_times(raw: &RawTimetable, mode: Mode, date_input: NaiveDate) -> Vec<ResolvedStop> {
    let mut entries = Vec::with_capacity(raw.stop_times.len());
    let mut cross_day = false;
    let mut previous_departure_time: Option<NaiveTime> = None;

    for stop in &raw.stop_times {
        let station_name = match stations::station_name(mode, &stop.station_id) {
            Some(name) => name,
            None => {
                warn!(
                    "can't convert station code {} on train {}, dropping stop",
                    stop.station_id, raw.train_no
                );
                continue;
            }
        };

        let departure_time = match parse_clock(&stop.departure_time) {
            Some(time) => time,
            None => {
                warn!(
                    "bad departure time {:?} on train {}, dropping stop",
                    stop.departure_time, raw.train_no
                );
                continue;
            }
        };
        let arrival_time = match stop.arrival_time.as_deref() {
            Some(text) if !text.is_empty() => match parse_clock(text) {
                Some(time) => time,
                None => {
                    warn!(
                        "bad arrival time {:?} on train {}, dropping stop",
                        text, raw.train_no
                    );
                    continue;
                }
            },
            _ => departure_time,
        };

        let (arrival_date, departure_date) = if cross_day {
            (date_input + Duration::days(1), date_input + Duration::days(1))
        } else if departure_time < arrival_time {
            cross_day = true;
            (date_input, date_input + Duration::days(1))
        } else if previous_departure_time.map_or(false, |previous| arrival_time < previous) {
            cross_day = true;
            (date_input + Duration::days(1), date_input + Duration::days(1))
        } else {
            (date_input, date_input)
        };

        previous_departure_time = Some(departure_time);

        entries.push(ResolvedStop {
            station_name: station_name.to_string(),
            arrival_time: arrival_date.and_time(arrival_time),
            departure_time: departure_date.and_time(departure_time),
        });
    }

    entries
}

fn parse_clock(text: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(text, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M:%S"))
        .ok()
}
