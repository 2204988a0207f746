use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;

use crate::database::schema::{
    building_status, groups, question_states, stop_entries, timetables, trains, users,
};

/// The two transport networks served by the bot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Tra,
    Thsr,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Tra => "TRA",
            Mode::Thsr => "THSR",
        }
    }

    pub fn parse(text: &str) -> Option<Mode> {
        match text.to_ascii_uppercase().as_str() {
            "TRA" => Some(Mode::Tra),
            "THSR" => Some(Mode::Thsr),
            _ => None,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ingestion progress for one (mode, date), stored as an integer column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStatus {
    NotBuilt = 0,
    Building = 1,
    Built = 2,
    Removed = 3,
}

impl BuildStatus {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn from_i32(value: i32) -> BuildStatus {
        match value {
            1 => BuildStatus::Building,
            2 => BuildStatus::Built,
            3 => BuildStatus::Removed,
            _ => BuildStatus::NotBuilt,
        }
    }
}

/// One train per (mode, train number); persists across dates. The type name
/// is resolved once at creation and is absent for THSR.
#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = trains)]
pub struct Train {
    pub id: i32,
    pub mode: String,
    pub train_no: String,
    pub train_type: Option<String>,
}

/// One row per (train, calendar date); owns its stop entries.
#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = timetables)]
pub struct TrainTimetable {
    pub id: i32,
    pub train_id: i32,
    pub date: NaiveDate,
}

/// A single stop with full timestamps; a train's stops may span two calendar
/// dates, so clock times alone are not enough.
#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = stop_entries)]
pub struct StopEntry {
    pub id: i32,
    pub timetable_id: i32,
    pub station_name: String,
    pub arrival_time: NaiveDateTime,
    pub departure_time: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = building_status)]
pub struct BuildingStatusOnDate {
    pub id: i32,
    pub mode: String,
    pub assigned_date: NaiveDate,
    pub update_date: Option<NaiveDate>,
    pub status: i32,
}

impl BuildingStatusOnDate {
    pub fn status(&self) -> BuildStatus {
        BuildStatus::from_i32(self.status)
    }
}

/// One slot-filling conversation turn per (user, group, mode). At most one
/// non-expired row may exist for a key; the lookup self-heals violations.
#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = question_states)]
pub struct QuestionState {
    pub id: i32,
    pub mode: String,
    pub user_id: String,
    pub group_id: Option<String>,
    pub departure_station: Option<String>,
    pub destination_station: Option<String>,
    pub departure_time: Option<NaiveDateTime>,
    pub expired: bool,
    pub updated_at: NaiveDateTime,
}

// Users and groups may follow, unfollow and follow again; these tables record
// activity history, so ids are deliberately not unique.

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = users)]
pub struct UserActivity {
    pub id: i32,
    pub user_id: String,
    pub following: bool,
    pub follow_datetime: NaiveDateTime,
    pub unfollow_datetime: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Queryable, Identifiable)]
#[diesel(table_name = groups)]
pub struct GroupActivity {
    pub id: i32,
    pub group_id: String,
    pub joining: bool,
    pub join_datetime: NaiveDateTime,
    pub leave_datetime: Option<NaiveDateTime>,
}
