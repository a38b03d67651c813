use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Result;
use msiconf_core::db;
use msiconf_core::settings::DbSettings;
use sqlx::postgres::PgConnectOptions;

#[test]
fn pool_is_bounded_with_idle_reclamation() {
    let options = db::pool_options();
    assert_eq!(options.get_max_connections(), 10);
    assert_eq!(options.get_idle_timeout(), Some(Duration::from_secs(30)));
    assert_eq!(options.get_acquire_timeout(), Duration::from_secs(10));
}

#[test]
fn connect_options_follow_settings() {
    let settings = DbSettings {
        host: "db.internal".into(),
        port: 6432,
        database: "metaspace".into(),
        user: "analyst".into(),
        password: "secret".into(),
        search_path: "public".into(),
    };
    let options = db::connect_options(&settings);
    assert_eq!(options.get_host(), "db.internal");
    assert_eq!(options.get_port(), 6432);
    assert_eq!(options.get_database(), Some("metaspace"));
    assert_eq!(options.get_username(), "analyst");
}

#[tokio::test]
async fn lazy_pool_opens_no_connections() {
    let pool = db::connect_lazy(&DbSettings::default());
    assert_eq!(pool.size(), 0);
    pool.close().await;
}

#[tokio::test]
async fn ping_succeeds_when_database_available() -> Result<()> {
    let database_url = match env::var("MSICONF_TEST_DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("Skipping ping test because MSICONF_TEST_DATABASE_URL is not set");
            return Ok(());
        }
    };

    let pool = db::connect_with(PgConnectOptions::from_str(&database_url)?).await?;
    db::ping(&pool).await?;
    assert!(pool.size() >= 1);
    pool.close().await;

    Ok(())
}
