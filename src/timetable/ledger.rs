//! Per (mode, date) ingestion-status rows. No locking: one ingestion process
//! per deployment is assumed, the statuses are advisory.

use chrono::{Local, NaiveDate};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;

use crate::database::models::{BuildStatus, BuildingStatusOnDate, Mode};
use crate::database::schema::building_status;

#[derive(Debug, Insertable)]
#[diesel(table_name = building_status)]
struct NewBuildingStatus<'a> {
    mode: &'a str,
    assigned_date: NaiveDate,
    update_date: Option<NaiveDate>,
    status: i32,
}

/// Returns the current status for (mode, date), lazily creating a NOT_BUILT
/// row when none exists yet.
pub fn check(conn: &mut SqliteConnection, mode: Mode, date: NaiveDate) -> QueryResult<BuildStatus> {
    let existing = building_status::table
        .filter(building_status::mode.eq(mode.as_str()))
        .filter(building_status::assigned_date.eq(date))
        .first::<BuildingStatusOnDate>(conn)
        .optional()?;

    match existing {
        Some(row) => Ok(row.status()),
        None => {
            diesel::insert_into(building_status::table)
                .values(&NewBuildingStatus {
                    mode: mode.as_str(),
                    assigned_date: date,
                    update_date: None,
                    status: BuildStatus::NotBuilt.as_i32(),
                })
                .execute(conn)?;
            Ok(BuildStatus::NotBuilt)
        }
    }
}

/// Upserts the status for (mode, date) and refreshes its update date.
pub fn update(
    conn: &mut SqliteConnection,
    mode: Mode,
    date: NaiveDate,
    status: BuildStatus,
) -> QueryResult<()> {
    let today = Local::now().date_naive();
    let updated = diesel::update(
        building_status::table
            .filter(building_status::mode.eq(mode.as_str()))
            .filter(building_status::assigned_date.eq(date)),
    )
    .set((
        building_status::status.eq(status.as_i32()),
        building_status::update_date.eq(Some(today)),
    ))
    .execute(conn)?;

    if updated == 0 {
        diesel::insert_into(building_status::table)
            .values(&NewBuildingStatus {
                mode: mode.as_str(),
                assigned_date: date,
                update_date: Some(today),
                status: status.as_i32(),
            })
            .execute(conn)?;
    }
    Ok(())
}

/// Assigned dates strictly before `cutoff`, for the history purge.
pub fn assigned_dates_before(
    conn: &mut SqliteConnection,
    mode: Mode,
    cutoff: NaiveDate,
) -> QueryResult<Vec<NaiveDate>> {
    building_status::table
        .filter(building_status::mode.eq(mode.as_str()))
        .filter(building_status::assigned_date.lt(cutoff))
        .select(building_status::assigned_date)
        .load(conn)
}

pub fn remove_row(conn: &mut SqliteConnection, mode: Mode, date: NaiveDate) -> QueryResult<()> {
    diesel::delete(
        building_status::table
            .filter(building_status::mode.eq(mode.as_str()))
            .filter(building_status::assigned_date.eq(date)),
    )
    .execute(conn)?;
    Ok(())
}
