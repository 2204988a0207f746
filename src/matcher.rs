//! Finds trains serving origin → destination after a requested time.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use crate::database::models::{Mode, StopEntry, Train, TrainTimetable};
use crate::database::schema::{stop_entries, timetables, trains};

/// Only departures within this many hours of the requested time are
/// considered; keeps result sets bounded.
const SEARCH_WINDOW_HOURS: i64 = 5;

/// One qualifying service.
#[derive(Debug, Clone)]
pub struct MatchedTrain {
    pub train: Train,
    pub timetable: TrainTimetable,
    pub origin: StopEntry,
    pub destination: StopEntry,
}

/// Searches the stored timetables. An empty result is a valid answer, not an
/// error.
pub fn find_matching_trains(
    conn: &mut SqliteConnection,
    mode: Mode,
    origin: &str,
    destination: &str,
    departure_time: NaiveDateTime,
) -> QueryResult<Vec<MatchedTrain>> {
    let schedule_day = schedule_day_for(departure_time);
    let window_end = departure_time + Duration::hours(SEARCH_WINDOW_HOURS);

    let candidate_ids: Vec<i32> = stop_entries::table
        .inner_join(timetables::table.inner_join(trains::table))
        .filter(trains::mode.eq(mode.as_str()))
        .filter(timetables::date.eq(schedule_day))
        .filter(stop_entries::station_name.eq(origin))
        .filter(stop_entries::departure_time.gt(departure_time))
        .filter(stop_entries::departure_time.lt(window_end))
        .select(stop_entries::timetable_id)
        .distinct()
        .load(conn)?;

    let mut matches = Vec::new();
    for timetable_id in candidate_ids {
        let (timetable, train): (TrainTimetable, Train) = timetables::table
            .inner_join(trains::table)
            .filter(timetables::id.eq(timetable_id))
            .first(conn)?;
        let entries: Vec<StopEntry> = stop_entries::table
            .filter(stop_entries::timetable_id.eq(timetable_id))
            .order(stop_entries::arrival_time.asc())
            .load(conn)?;

        if let Some((origin_stop, destination_stop)) =
            select_connection(&entries, origin, destination, departure_time, window_end)
        {
            matches.push(MatchedTrain {
                train,
                timetable,
                origin: origin_stop.clone(),
                destination: destination_stop.clone(),
            });
        }
    }

    matches.sort_by_key(|matched| matched.origin.departure_time);
    Ok(matches)
}

/// Trains departing shortly after midnight are usually still filed under the
/// previous day's timetable.
fn schedule_day_for(departure_time: NaiveDateTime) -> NaiveDate {
    let early_morning_cutoff = NaiveTime::from_hms_opt(3, 0, 0).unwrap();
    if departure_time.time() <= early_morning_cutoff {
        departure_time.date() - Duration::days(1)
    } else {
        departure_time.date()
    }
}

/// Picks the earliest in-window origin stop and the earliest destination
/// stop reached strictly after it. The strict ordering guards against
/// timetables where the same station name appears twice (branch and loop
/// lines); ties go to the first entry in arrival order.
fn select_connection<'a>(
    entries: &'a [StopEntry],
    origin: &str,
    destination: &str,
    after: NaiveDateTime,
    window_end: NaiveDateTime,
) -> Option<(&'a StopEntry, &'a StopEntry)> {
    let origin_stop = entries
        .iter()
        .filter(|entry| entry.station_name == origin)
        .filter(|entry| entry.departure_time > after && entry.departure_time < window_end)
        .min_by_key(|entry| entry.departure_time)?;

    let destination_stop = entries
        .iter()
        .filter(|entry| entry.station_name == destination)
        .filter(|entry| entry.arrival_time > after)
        .filter(|entry| entry.arrival_time > origin_stop.departure_time)
        .min_by_key(|entry| entry.arrival_time)?;

    Some((origin_stop, destination_stop))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: i32, station: &str, arrival: &str, departure: &str) -> StopEntry {
        let parse = |clock| {
            NaiveDate::from_ymd_opt(2018, 6, 2)
                .unwrap()
                .and_time(NaiveTime::parse_from_str(clock, "%H:%M").unwrap())
        };
        StopEntry {
            id,
            timetable_id: 1,
            station_name: station.to_string(),
            arrival_time: parse(arrival),
            departure_time: parse(departure),
        }
    }

    fn at(clock: &str) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2018, 6, 2)
            .unwrap()
            .and_time(NaiveTime::parse_from_str(clock, "%H:%M").unwrap())
    }

    #[test]
    fn picks_connection_in_stop_order() {
        let entries = vec![
            entry(1, "臺北", "06:30", "06:30"),
            entry(2, "新竹", "07:17", "07:19"),
            entry(3, "高雄", "11:16", "11:20"),
        ];
        let (origin, destination) =
            select_connection(&entries, "新竹", "高雄", at("07:00"), at("12:00")).unwrap();
        assert_eq!(origin.id, 2);
        assert_eq!(destination.id, 3);
    }

    #[test]
    fn rejects_destination_before_origin() {
        // Loop service calling at the destination name before the origin.
        let entries = vec![
            entry(1, "高雄", "06:00", "06:02"),
            entry(2, "新竹", "07:00", "07:02"),
        ];
        assert!(select_connection(&entries, "新竹", "高雄", at("06:30"), at("11:30")).is_none());

        // With a later call at the same name, that one is picked.
        let entries = vec![
            entry(1, "高雄", "06:00", "06:02"),
            entry(2, "新竹", "07:00", "07:02"),
            entry(3, "高雄", "09:00", "09:02"),
        ];
        let (origin, destination) =
            select_connection(&entries, "新竹", "高雄", at("06:30"), at("11:30")).unwrap();
        assert_eq!(origin.id, 2);
        assert_eq!(destination.id, 3);
    }

    #[test]
    fn window_bounds_are_strict() {
        let entries = vec![
            entry(1, "新竹", "12:00", "12:00"),
            entry(2, "高雄", "15:00", "15:02"),
        ];
        // Departure exactly at the window end is out.
        assert!(select_connection(&entries, "新竹", "高雄", at("07:00"), at("12:00")).is_none());
        // Departure exactly at the requested time is out as well.
        assert!(select_connection(&entries, "新竹", "高雄", at("12:00"), at("17:00")).is_none());
        assert!(select_connection(&entries, "新竹", "高雄", at("11:59"), at("16:59")).is_some());
    }

    #[test]
    fn early_morning_queries_use_previous_schedule_day() {
        assert_eq!(
            schedule_day_for(at("07:00")),
            NaiveDate::from_ymd_opt(2018, 6, 2).unwrap()
        );
        let past_midnight = NaiveDate::from_ymd_opt(2018, 6, 3)
            .unwrap()
            .and_time(NaiveTime::from_hms_opt(0, 30, 0).unwrap());
        assert_eq!(
            schedule_day_for(past_midnight),
            NaiveDate::from_ymd_opt(2018, 6, 2).unwrap()
        );
        let exactly_three = NaiveDate::from_ymd_opt(2018, 6, 3)
            .unwrap()
            .and_time(NaiveTime::from_hms_opt(3, 0, 0).unwrap());
        assert_eq!(
            schedule_day_for(exactly_three),
            NaiveDate::from_ymd_opt(2018, 6, 2).unwrap()
        );
    }
}
