//! Blog endpoints.

use tracing::debug;

use crate::models::{Blog, BlogDraft, BlogList, BlogListPayload};

use super::transport::ApiRequest;
use super::{ApiError, HttpClient};

#[derive(Clone)]
pub struct BlogApi {
    http: HttpClient,
}

/// Ids are interpolated into the path, so only `[A-Za-z0-9_-]` is accepted
fn require_id<'a>(kind: &str, id: &'a str) -> Result<&'a str, ApiError> {
    let id = id.trim();
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if !valid {
        return Err(ApiError::Validation(format!("Invalid {} id: {:?}", kind, id)));
    }
    Ok(id)
}

impl BlogApi {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    pub async fn list(&self) -> Result<BlogList, ApiError> {
        let payload: BlogListPayload = self.http.send_json(ApiRequest::get("/blogs/get-blogs")).await?;
        let list = BlogList::from(payload);
        debug!(count = list.blogs.len(), total = list.total_count, "Fetched blogs");
        Ok(list)
    }

    pub async fn get(&self, blog_id: &str) -> Result<Blog, ApiError> {
        let id = require_id("blog", blog_id)?;
        self.http.send_json(ApiRequest::get(format!("/blogs/{}", id))).await
    }

    pub async fn user_blogs(&self, user_id: &str) -> Result<Vec<Blog>, ApiError> {
        let id = require_id("user", user_id)?;
        self.http
            .send_json(ApiRequest::get(format!("/blogs/user-blogs/{}", id)))
            .await
    }

    /// Full-text search. A blank query yields no results without a request.
    pub async fn search(&self, query: &str) -> Result<BlogList, ApiError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(BlogList::default());
        }
        let request = ApiRequest::get("/blogs/search").query("query", query);
        let payload: BlogListPayload = self.http.send_json(request).await?;
        Ok(BlogList::from(payload))
    }

    pub async fn create(&self, draft: &BlogDraft) -> Result<Blog, ApiError> {
        let request = ApiRequest::post("/blogs/create-blog").json(draft)?;
        self.http.send_json(request).await
    }

    pub async fn update(&self, blog_id: &str, draft: &BlogDraft) -> Result<Blog, ApiError> {
        let id = require_id("blog", blog_id)?;
        let request = ApiRequest::put(format!("/blogs/{}", id)).json(draft)?;
        self.http.send_json(request).await
    }

    pub async fn delete(&self, blog_id: &str) -> Result<(), ApiError> {
        let id = require_id("blog", blog_id)?;
        self.http.execute(ApiRequest::delete(format!("/blogs/{}", id))).await?;
        Ok(())
    }
}
