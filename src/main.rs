use std::error::Error;

use chrono::{NaiveDate, NaiveDateTime};
use clap::{App, Arg, SubCommand};

use railbot::bot::replies;
use railbot::database;
use railbot::database::models::Mode;
use railbot::feed::PtxClient;
use railbot::matcher;
use railbot::routine;
use railbot::stations;
use railbot::timetable;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + 'static>> {
    // Load .env variables
    dotenv::dotenv().ok();
    env_logger::init();

    // Make sure our database is up-to-date
    let mut connection = database::establish_connection()?;
    database::run_migrations(&mut connection).map_err(|e| e as Box<dyn Error>)?;

    // Parse command line arguments
    let app = App::new("railbot")
        .about("Timetable assistant for TRA and THSR: ingests PTX daily timetables and answers connection queries")
        .subcommand(SubCommand::with_name("build")
            .about("Fetch and store all timetables of one date")
            .arg(Arg::with_name("mode").help("tra or thsr").required(true))
            .arg(Arg::with_name("date").help("YYYY-MM-DD").required(true))
            .arg(Arg::with_name("force").long("force").help("Rebuild even if the date is already built")))
        .subcommand(SubCommand::with_name("routine")
            .about("Run the daily rebuild and purge loop"))
        .subcommand(SubCommand::with_name("purge")
            .about("Drop timetable and ledger rows for dates before yesterday"))
        .subcommand(SubCommand::with_name("query")
            .about("Look up trains between two stations")
            .arg(Arg::with_name("mode").help("tra or thsr").required(true))
            .arg(Arg::with_name("from").help("Origin station").required(true))
            .arg(Arg::with_name("to").help("Destination station").required(true))
            .arg(Arg::with_name("time").help("YYYY-MM-DDTHH:MM").required(true)))
        .get_matches();

    match app.subcommand() {
        ("build", Some(sub_matches)) => {
            let mode = parse_mode(sub_matches.value_of("mode"))?;
            let date = NaiveDate::parse_from_str(sub_matches.value_of("date").unwrap(), "%Y-%m-%d")?;
            let source = PtxClient::from_env()?;

            let outcome = timetable::build_database_by_date(
                &mut connection,
                &source,
                mode,
                date,
                sub_matches.is_present("force"),
            )
            .await;
            println!("{} {}: {}", mode, date, outcome.message());
        }
        ("routine", _) => {
            println!("Starting routine update loop...");
            let source = PtxClient::from_env()?;
            routine::run_routine(&mut connection, &source).await;
        }
        ("purge", _) => {
            routine::clear_history(&mut connection, Mode::Tra)?;
            routine::clear_history(&mut connection, Mode::Thsr)?;
            println!("History purged.");
        }
        ("query", Some(sub_matches)) => {
            let mode = parse_mode(sub_matches.value_of("mode"))?;
            let from = stations::fold_text(sub_matches.value_of("from").unwrap());
            let to = stations::fold_text(sub_matches.value_of("to").unwrap());
            let time = NaiveDateTime::parse_from_str(
                sub_matches.value_of("time").unwrap(),
                "%Y-%m-%dT%H:%M",
            )?;

            let matches = matcher::find_matching_trains(&mut connection, mode, &from, &to, time)?;
            if matches.is_empty() {
                println!("{}", replies::NO_MATCH_TEXT);
            }
            for matched in &matches {
                println!("{}", replies::format_match_line(mode, matched));
            }
        }
        _ => {}
    }

    Ok(())
}

fn parse_mode(value: Option<&str>) -> Result<Mode, Box<dyn Error>> {
    value
        .and_then(Mode::parse)
        .ok_or_else(|| "transport mode must be tra or thsr".into())
}
