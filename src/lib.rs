pub mod bot;
pub mod database;
pub mod feed;
pub mod matcher;
pub mod routine;
pub mod stations;
pub mod timetable;
