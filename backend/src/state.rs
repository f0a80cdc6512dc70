use quill_shared::{
    article_store::ArticleStore, comments_store::CommentStore, db::SharedConnection,
    settings_store::SettingsStore, user_store::UserStore,
};

#[derive(Clone)]
pub struct AppState {
    pub articles: ArticleStore,
    pub users: UserStore,
    pub comments: CommentStore,
    pub settings: SettingsStore,
}

impl AppState {
    pub fn new(db: SharedConnection) -> Self {
        Self {
            articles: ArticleStore::new(db.clone()),
            users: UserStore::new(db.clone()),
            comments: CommentStore::new(db.clone()),
            settings: SettingsStore::new(db),
        }
    }

    /// Number of stored articles, for the startup log line.
    pub fn article_count(&self) -> anyhow::Result<i64> {
        let (_, total) = self.articles.list_all(1, 1)?;
        Ok(total)
    }
}
