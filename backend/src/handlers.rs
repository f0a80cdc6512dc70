use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    Extension,
};
use quill_shared::{
    article_store::ArticleInput,
    can_view,
    comments_store::{build_comment_tree, NewCommentInput},
    error::BlogResult,
    render_article,
    user_store::{IssuedToken, NewUserInput, UserRecord},
    Article, ArticleListItem, ArticleView, BlogError, Comment, CommentNode, SiteSettings,
};
use serde::{Deserialize, Serialize};

use crate::{request_context::CurrentUser, state::AppState};

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 50;

pub type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub message: &'static str,
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub page_size: Option<i64>,
}

impl PageQuery {
    /// `page < 1` becomes 1, a `page_size` outside `1..=50` becomes 10.
    pub fn normalize(&self) -> (u32, u32) {
        let page = self
            .page
            .filter(|page| *page >= 1)
            .and_then(|page| u32::try_from(page).ok())
            .unwrap_or(1);
        let page_size = self
            .page_size
            .filter(|size| (1..=i64::from(MAX_PAGE_SIZE)).contains(size))
            .and_then(|size| u32::try_from(size).ok())
            .unwrap_or(DEFAULT_PAGE_SIZE);
        (page, page_size)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ArticleListResponse {
    pub articles: Vec<ArticleListItem>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: i64,
}

impl ArticleListResponse {
    fn new(articles: &[Article], total: i64, page: u32, page_size: u32) -> Self {
        let size = i64::from(page_size);
        Self {
            articles: articles.iter().map(ArticleListItem::from).collect(),
            total,
            page,
            page_size,
            total_pages: (total + size - 1) / size,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CommentListResponse {
    pub comments: Vec<CommentNode>,
    pub total: usize,
}

#[derive(Debug, Deserialize)]
pub struct MembershipRequest {
    /// Unix milliseconds; `null` clears the membership.
    #[serde(default)]
    pub member_expire_at: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct IssueTokenRequest {
    #[serde(default)]
    pub label: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { message: "pong" })
}

pub async fn get_settings(State(state): State<AppState>) -> ApiResult<SiteSettings> {
    let settings = state.settings.clone();
    run_blocking(move || settings.get_site_settings()).await.map(Json)
}

pub async fn list_articles(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> ApiResult<ArticleListResponse> {
    let (page, page_size) = query.normalize();
    let articles = state.articles.clone();
    let (items, total) = run_blocking(move || articles.list_published(page, page_size)).await?;
    Ok(Json(ArticleListResponse::new(&items, total, page, page_size)))
}

pub async fn get_article(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(slug): Path<String>,
) -> ApiResult<ArticleView> {
    let articles = state.articles.clone();
    let article = run_blocking(move || articles.get_by_slug(&slug))
        .await?
        .ok_or_else(|| blog_error(BlogError::NotFound))?;

    if !article.is_published() && !current.is_admin() {
        return Err(blog_error(BlogError::NotFound));
    }
    render_article(&article, current.viewer()).map(Json).map_err(blog_error)
}

pub async fn list_comments(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(article_id): Path<i64>,
) -> ApiResult<CommentListResponse> {
    viewable_article(&state, &current, article_id).await?;

    let comments = state.comments.clone();
    let flat = run_blocking(move || comments.list_for_article(article_id)).await?;
    let total = flat.len();
    Ok(Json(CommentListResponse {
        comments: build_comment_tree(flat),
        total,
    }))
}

pub async fn create_comment(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(article_id): Path<i64>,
    Json(input): Json<NewCommentInput>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    let user_id = require_user(&current)?.id;
    viewable_article(&state, &current, article_id).await?;

    let comments = state.comments.clone();
    let comment = run_blocking(move || comments.create(article_id, user_id, input)).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn delete_own_comment(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<i64>,
) -> ApiResult<Comment> {
    let user_id = require_user(&current)?.id;
    let comments = state.comments.clone();
    run_blocking(move || comments.soft_delete_by_owner(id, user_id))
        .await
        .map(Json)
}

pub async fn admin_list_articles(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> ApiResult<ArticleListResponse> {
    let (page, page_size) = query.normalize();
    let articles = state.articles.clone();
    let (items, total) = run_blocking(move || articles.list_all(page, page_size)).await?;
    Ok(Json(ArticleListResponse::new(&items, total, page, page_size)))
}

pub async fn admin_create_article(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(input): Json<ArticleInput>,
) -> Result<(StatusCode, Json<Article>), ApiError> {
    let author_id = require_user(&current)?.id;
    let articles = state.articles.clone();
    let article = run_blocking(move || articles.create(author_id, input)).await?;
    Ok((StatusCode::CREATED, Json(article)))
}

pub async fn admin_get_article(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Article> {
    let articles = state.articles.clone();
    run_blocking(move || articles.get_by_id(id))
        .await?
        .map(Json)
        .ok_or_else(|| blog_error(BlogError::NotFound))
}

pub async fn admin_update_article(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<ArticleInput>,
) -> ApiResult<Article> {
    let articles = state.articles.clone();
    run_blocking(move || articles.update(id, input)).await.map(Json)
}

pub async fn admin_delete_article(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let articles = state.articles.clone();
    run_blocking(move || articles.delete(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn admin_publish_article(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Article> {
    let articles = state.articles.clone();
    run_blocking(move || articles.publish(id)).await.map(Json)
}

pub async fn admin_unpublish_article(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Article> {
    let articles = state.articles.clone();
    run_blocking(move || articles.unpublish(id)).await.map(Json)
}

pub async fn admin_delete_comment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Comment> {
    let comments = state.comments.clone();
    run_blocking(move || comments.soft_delete(id)).await.map(Json)
}

pub async fn admin_update_settings(
    State(state): State<AppState>,
    Json(settings): Json<SiteSettings>,
) -> ApiResult<SiteSettings> {
    let store = state.settings.clone();
    run_blocking(move || store.update_site_settings(&settings))
        .await
        .map(Json)
}

pub async fn admin_create_user(
    State(state): State<AppState>,
    Json(input): Json<NewUserInput>,
) -> Result<(StatusCode, Json<UserRecord>), ApiError> {
    let users = state.users.clone();
    let user = run_blocking(move || users.create_user(input)).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn admin_set_membership(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<MembershipRequest>,
) -> ApiResult<UserRecord> {
    let users = state.users.clone();
    run_blocking(move || users.set_membership(id, request.member_expire_at))
        .await
        .map(Json)
}

pub async fn admin_issue_token(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<IssueTokenRequest>,
) -> Result<(StatusCode, Json<IssuedToken>), ApiError> {
    let users = state.users.clone();
    let token = run_blocking(move || users.issue_token(id, &request.label)).await?;
    Ok((StatusCode::CREATED, Json(token)))
}

/// Loads the article and applies the same existence rules as the article
/// read: unpublished or non-viewable articles are 404 for non-admins.
async fn viewable_article(
    state: &AppState,
    current: &CurrentUser,
    article_id: i64,
) -> Result<Article, ApiError> {
    let articles = state.articles.clone();
    let article = run_blocking(move || articles.get_by_id(article_id))
        .await?
        .ok_or_else(|| blog_error(BlogError::NotFound))?;

    let visible = (article.is_published() || current.is_admin())
        && can_view(article.visibility, current.viewer());
    if !visible {
        return Err(blog_error(BlogError::NotFound));
    }
    Ok(article)
}

fn require_user(current: &CurrentUser) -> Result<&UserRecord, ApiError> {
    current
        .user
        .as_ref()
        .ok_or_else(|| error_response(StatusCode::UNAUTHORIZED, "Authentication required"))
}

/// Runs a store call on the blocking pool.
async fn run_blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> BlogResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| internal_error("Background task failed", e))?
        .map_err(blog_error)
}

pub fn error_response(status: StatusCode, message: &str) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
            code: status.as_u16(),
        }),
    )
}

pub fn blog_error(err: BlogError) -> ApiError {
    let status = match &err {
        BlogError::NotFound | BlogError::CommentNotFound | BlogError::UserNotFound => {
            StatusCode::NOT_FOUND
        },
        BlogError::SlugExists | BlogError::UserExists => StatusCode::CONFLICT,
        BlogError::NotCommentOwner => StatusCode::FORBIDDEN,
        BlogError::InvalidSlug
        | BlogError::InvalidVisibility
        | BlogError::InvalidPreviewSettings(_)
        | BlogError::InvalidArticle(_)
        | BlogError::CommentTooShort
        | BlogError::CommentTooLong
        | BlogError::ParentCommentNotFound
        | BlogError::UnknownRole(_)
        | BlogError::InvalidEmail => StatusCode::BAD_REQUEST,
        BlogError::Database(_) => return internal_error("Database error", &err),
    };
    error_response(status, &capitalize(&err.to_string()))
}

pub fn internal_error(message: &str, err: impl std::fmt::Display) -> ApiError {
    tracing::error!("{}: {}", message, err);
    error_response(StatusCode::INTERNAL_SERVER_ERROR, message)
}

fn capitalize(message: &str) -> String {
    let mut chars = message.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use quill_shared::BlogError;

    use super::{blog_error, PageQuery};

    fn page(page: Option<i64>, page_size: Option<i64>) -> (u32, u32) {
        PageQuery { page, page_size }.normalize()
    }

    #[test]
    fn pagination_is_normalized() {
        assert_eq!(page(None, None), (1, 10));
        assert_eq!(page(Some(0), Some(0)), (1, 10));
        assert_eq!(page(Some(-3), Some(51)), (1, 10));
        assert_eq!(page(Some(4), Some(50)), (4, 50));
        assert_eq!(page(Some(2), Some(1)), (2, 1));
    }

    #[test]
    fn errors_map_to_statuses() {
        let (status, body) = blog_error(BlogError::NotFound);
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body.0.error, "Article not found");
        assert_eq!(body.0.code, 404);

        assert_eq!(blog_error(BlogError::SlugExists).0, StatusCode::CONFLICT);
        assert_eq!(blog_error(BlogError::NotCommentOwner).0, StatusCode::FORBIDDEN);
        assert_eq!(blog_error(BlogError::CommentTooLong).0, StatusCode::BAD_REQUEST);
        assert_eq!(blog_error(BlogError::InvalidVisibility).0, StatusCode::BAD_REQUEST);
    }
}
