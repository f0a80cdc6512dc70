//! Key/value site settings.

use rusqlite::{params, Connection};

use crate::{
    db::{now_ms, SharedConnection},
    error::BlogResult,
    SiteSettings,
};

fn entries(settings: &SiteSettings) -> [(&'static str, &str); 8] {
    [
        ("site_name", settings.site_name.as_str()),
        ("site_description", settings.site_description.as_str()),
        ("site_keywords", settings.site_keywords.as_str()),
        ("home_title", settings.home_title.as_str()),
        ("home_subtitle", settings.home_subtitle.as_str()),
        ("home_custom_content", settings.home_custom_content.as_str()),
        ("footer_text", settings.footer_text.as_str()),
        ("logo_url", settings.logo_url.as_str()),
    ]
}

fn apply(settings: &mut SiteSettings, key: &str, value: String) {
    let slot = match key {
        "site_name" => &mut settings.site_name,
        "site_description" => &mut settings.site_description,
        "site_keywords" => &mut settings.site_keywords,
        "home_title" => &mut settings.home_title,
        "home_subtitle" => &mut settings.home_subtitle,
        "home_custom_content" => &mut settings.home_custom_content,
        "footer_text" => &mut settings.footer_text,
        "logo_url" => &mut settings.logo_url,
        _ => {
            tracing::debug!(key, "ignoring unknown setting");
            return;
        },
    };
    *slot = value;
}

/// Store for [`SiteSettings`].
#[derive(Clone)]
pub struct SettingsStore {
    db: SharedConnection,
}

impl SettingsStore {
    /// Wraps the shared connection.
    pub fn new(db: SharedConnection) -> Self {
        Self { db }
    }

    /// Defaults overlaid with every stored key.
    pub fn get_site_settings(&self) -> BlogResult<SiteSettings> {
        let conn = self.db.lock();
        let mut stmt = conn.prepare("SELECT key, value FROM settings")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut settings = SiteSettings::default();
        for (key, value) in rows {
            apply(&mut settings, &key, value);
        }
        Ok(settings)
    }

    /// Writes every field in a single transaction.
    pub fn update_site_settings(&self, settings: &SiteSettings) -> BlogResult<SiteSettings> {
        let mut conn = self.db.lock();
        let tx = conn.transaction()?;
        let now = now_ms();
        for (key, value) in entries(settings) {
            tx.execute(
                "INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, value, now],
            )?;
        }
        tx.commit()?;
        tracing::info!("site settings updated");
        Ok(settings.clone())
    }
}

/// Inserts default values for missing keys. Returns how many were added.
pub(crate) fn seed_defaults(conn: &Connection) -> rusqlite::Result<usize> {
    let defaults = SiteSettings::default();
    let now = now_ms();
    let mut inserted = 0;
    for (key, value) in entries(&defaults) {
        inserted += conn.execute(
            "INSERT OR IGNORE INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3)",
            params![key, value, now],
        )?;
    }
    Ok(inserted)
}
