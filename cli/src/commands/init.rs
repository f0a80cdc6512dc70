//! `init`: create and seed the database.

use std::path::Path;

use anyhow::Result;
use quill_shared::{db, settings_store::SettingsStore};

/// Opens (creating if needed) the database at `db_path`.
pub fn run(db_path: &Path) -> Result<()> {
    let conn = db::open(db_path)?;
    let settings = SettingsStore::new(conn).get_site_settings()?;

    tracing::info!("Database initialized at {}", db_path.display());
    println!("Initialized {} (site: {})", db_path.display(), settings.site_name);
    Ok(())
}
