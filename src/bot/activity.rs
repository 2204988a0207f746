//! Follow/unfollow and join/leave bookkeeping. History, not identity: the
//! same id may appear in several rows.

use chrono::{Local, NaiveDateTime};
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use log::warn;

use crate::database::schema::{groups, users};

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
struct NewUser<'a> {
    user_id: &'a str,
    following: bool,
    follow_datetime: NaiveDateTime,
    unfollow_datetime: Option<NaiveDateTime>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = groups)]
struct NewGroup<'a> {
    group_id: &'a str,
    joining: bool,
    join_datetime: NaiveDateTime,
    leave_datetime: Option<NaiveDateTime>,
}

pub fn record_follow(conn: &mut SqliteConnection, user_id: &str) -> QueryResult<()> {
    diesel::insert_into(users::table)
        .values(&NewUser {
            user_id,
            following: true,
            follow_datetime: Local::now().naive_local(),
            unfollow_datetime: None,
        })
        .execute(conn)?;
    Ok(())
}

pub fn record_unfollow(conn: &mut SqliteConnection, user_id: &str) -> QueryResult<()> {
    let latest: Option<i32> = users::table
        .filter(users::user_id.eq(user_id))
        .order(users::id.desc())
        .select(users::id)
        .first(conn)
        .optional()?;
    match latest {
        Some(id) => {
            diesel::update(users::table.find(id))
                .set((
                    users::following.eq(false),
                    users::unfollow_datetime.eq(Some(Local::now().naive_local())),
                ))
                .execute(conn)?;
        }
        None => warn!("unfollow from user {} with no follow record", user_id),
    }
    Ok(())
}

pub fn record_join(conn: &mut SqliteConnection, group_id: &str) -> QueryResult<()> {
    diesel::insert_into(groups::table)
        .values(&NewGroup {
            group_id,
            joining: true,
            join_datetime: Local::now().naive_local(),
            leave_datetime: None,
        })
        .execute(conn)?;
    Ok(())
}

pub fn record_leave(conn: &mut SqliteConnection, group_id: &str) -> QueryResult<()> {
    let latest: Option<i32> = groups::table
        .filter(groups::group_id.eq(group_id))
        .order(groups::id.desc())
        .select(groups::id)
        .first(conn)
        .optional()?;
    match latest {
        Some(id) => {
            diesel::update(groups::table.find(id))
                .set((
                    groups::joining.eq(false),
                    groups::leave_datetime.eq(Some(Local::now().naive_local())),
                ))
                .execute(conn)?;
        }
        None => warn!("leave from group {} with no join record", group_id),
    }
    Ok(())
}
