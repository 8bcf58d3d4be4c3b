//! Standalone migration runner for bookmarks-api.
//!
//! Usage:
//!   cargo run -p bookmarks-api --bin bookmarks-migrate
//!   cargo run -p bookmarks-api --bin bookmarks-migrate -- --test
//!
//! Reads DATABASE_URL from the environment (or .env via dotenvy). With
//! `--test` the `_test` sibling database is migrated instead.

use std::path::Path;

use diesel::pg::PgConnection;
use diesel::Connection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use bookmarks_api::db::test_database_url;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");

fn main() {
    if dotenvy::dotenv().is_err() {
        let env_path = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(env_path);
    }

    let mut database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL env var is required");
    if std::env::args().any(|arg| arg == "--test") {
        database_url = test_database_url(&database_url);
    }

    println!("Connecting to database...");
    let mut conn =
        PgConnection::establish(&database_url).expect("failed to connect to database");

    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .expect("failed to run migrations");

    if applied.is_empty() {
        println!("No pending migrations.");
        return;
    }
    for migration in &applied {
        println!("  Applied: {migration}");
    }
    println!("{} migration(s) applied.", applied.len());
}
