pub mod models;
pub mod schema;

use std::env;
use std::error::Error;

use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

// Embeds migrations from migrations folder
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

pub fn establish_connection() -> diesel::result::ConnectionResult<SqliteConnection> {
    let database_url = env::var("DATABASE_URL").unwrap_or_else(|_| "railbot.db".to_string());
    SqliteConnection::establish(&database_url)
}

pub fn run_migrations(conn: &mut SqliteConnection) -> Result<(), Box<dyn Error + Send + Sync>> {
    conn.run_pending_migrations(MIGRATIONS)?;
    Ok(())
}
