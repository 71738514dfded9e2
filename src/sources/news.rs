//! Strapi news client.
//!
//! Reads both response shapes Strapi produces: v4 nests post fields under
//! `attributes`, v5 returns them flat next to `id`.

use crate::aggregate::{aggregate_with, AggregateError, Observer, Task};
use crate::config::NewsConfig;
use crate::http::{build_client, get_json, FetchError};
use crate::models::{excerpt, slugify, Post, PostBody, PostPage, PostView};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// News errors, worded for display.
#[derive(Debug, Error)]
pub enum NewsError {
    #[error("Failed to fetch posts. {}", feed_hint(.0))]
    Feed(#[source] FetchError),

    #[error("{}", post_hint(.0))]
    Post(#[source] FetchError),

    #[error("Post not found.")]
    PostNotFound,
}

fn access_hint(err: &FetchError) -> Option<&'static str> {
    match err.status() {
        Some(401) => Some("Authentication failed. Please check your API token."),
        Some(403) => Some("Access denied. Please check your API token permissions."),
        _ if err.is_connect() => {
            Some("Cannot connect to Strapi server. Please check your connection.")
        }
        _ => None,
    }
}

fn feed_hint(err: &FetchError) -> String {
    if let Some(hint) = access_hint(err) {
        return hint.to_string();
    }
    match err.status() {
        Some(404) => "Posts endpoint not found. Please check your Strapi configuration.".to_string(),
        _ => "Please try again later.".to_string(),
    }
}

fn post_hint(err: &FetchError) -> String {
    if let Some(hint) = access_hint(err) {
        return hint.to_string();
    }
    match err.status() {
        Some(404) => "Post not found.".to_string(),
        _ => format!("Failed to fetch post details: {}", err),
    }
}

/// How a post is addressed on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostRef {
    Id(u64),
    Slug(String),
}

impl PostRef {
    pub fn parse(reference: &str) -> Self {
        let reference = reference.trim();
        match reference.parse::<u64>() {
            Ok(id) => PostRef::Id(id),
            Err(_) => PostRef::Slug(reference.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    data: Option<Vec<RawPost>>,
    #[serde(default)]
    meta: Option<Meta>,
}

#[derive(Debug, Deserialize)]
struct Meta {
    #[serde(default)]
    pagination: Option<Pagination>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Pagination {
    #[serde(default)]
    page_count: Option<u32>,
    #[serde(default)]
    total: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct SingleResponse {
    #[serde(default)]
    data: Option<OneOrMany>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<RawPost>),
    One(RawPost),
}

impl OneOrMany {
    fn first(self) -> Option<RawPost> {
        match self {
            OneOrMany::Many(posts) => posts.into_iter().next(),
            OneOrMany::One(post) => Some(post),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawPost {
    id: u64,
    #[serde(default)]
    attributes: Option<PostFields>,
    #[serde(flatten)]
    fields: PostFields,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PostFields {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    content: Option<Value>,
    #[serde(default)]
    excerpt: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    cover_image: Option<Value>,
}

impl RawPost {
    /// Convert to a display post. Posts without a title are dropped.
    fn into_post(self, media_base_url: &str) -> Option<Post> {
        let id = self.id;
        let fields = self.attributes.unwrap_or(self.fields);
        let title = fields.title.filter(|t| !t.trim().is_empty())?;

        let text = fields
            .content
            .as_ref()
            .map(flatten_content)
            .unwrap_or_default();
        let body = PostBody::from_text(&text);

        let cover_url = fields
            .cover_image
            .as_ref()
            .and_then(cover_path)
            .map(|path| media_url(media_base_url, path));

        Some(Post {
            id,
            slug: slugify(Some(&title), id),
            title,
            author: fields
                .author
                .filter(|a| !a.trim().is_empty())
                .unwrap_or_else(|| "Unknown Author".to_string()),
            category: fields
                .category
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| "Uncategorized".to_string()),
            created_at: fields.created_at,
            cover_url,
            excerpt: excerpt(fields.excerpt.as_deref(), &text),
            body,
        })
    }
}

/// Flatten rich-text blocks (or a plain string) into text.
fn flatten_content(content: &Value) -> String {
    match content {
        Value::String(text) => text.clone(),
        Value::Array(blocks) => blocks
            .iter()
            .map(block_text)
            .collect::<Vec<_>>()
            .join("\n\n"),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn block_text(block: &Value) -> String {
    match block {
        Value::String(text) => text.clone(),
        Value::Object(map) => {
            if let Some(text) = map.get("text").and_then(Value::as_str) {
                return text.to_string();
            }
            match map.get("children") {
                Some(Value::Array(children)) => children
                    .iter()
                    .map(|child| match child {
                        Value::String(text) => text.as_str(),
                        _ => child.get("text").and_then(Value::as_str).unwrap_or(""),
                    })
                    .collect(),
                _ => String::new(),
            }
        }
        _ => String::new(),
    }
}

fn cover_path(cover: &Value) -> Option<&str> {
    cover
        .pointer("/data/attributes/url")
        .or_else(|| cover.pointer("/url"))
        .and_then(Value::as_str)
}

fn media_url(media_base_url: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
        path.to_string()
    } else {
        format!("{}{}", media_base_url.trim_end_matches('/'), path)
    }
}

/// A by-id lookup is the direct request plus the list scan fallback.
const LOOKUP_REQUESTS: u32 = 2;

pub struct NewsClient {
    http_client: reqwest::Client,
    base_url: String,
    media_base_url: String,
    api_token: Option<String>,
    page_size: u32,
    /// Deadline for one post lookup, which may take two requests.
    lookup_timeout: Duration,
}

impl NewsClient {
    pub fn new(config: &NewsConfig, timeout_seconds: u64) -> Result<Self> {
        let api_token = Some(config.api_token.trim().to_string()).filter(|t| !t.is_empty());
        if api_token.is_none() {
            debug!("No Strapi API token configured; sending anonymous requests");
        }

        Ok(Self {
            http_client: build_client(timeout_seconds)?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            media_base_url: config.media_base_url.clone(),
            api_token,
            page_size: config.page_size,
            lookup_timeout: Duration::from_secs(timeout_seconds) * LOOKUP_REQUESTS,
        })
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        let request = self.http_client.get(format!("{}{}", self.base_url, path));
        match self.api_token {
            Some(ref token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn feed_query(&self, page: u32, search: Option<&str>) -> Vec<(String, String)> {
        let mut query = vec![
            ("pagination[page]".to_string(), page.to_string()),
            ("pagination[pageSize]".to_string(), self.page_size.to_string()),
            ("populate".to_string(), "*".to_string()),
            ("sort".to_string(), "createdAt:desc".to_string()),
        ];

        if let Some(term) = search {
            for (i, field) in ["title", "category", "author"].iter().enumerate() {
                query.push((
                    format!("filters[$or][{}][{}][$contains]", i, field),
                    term.to_string(),
                ));
            }
        }

        query
    }

    /// One page of the feed, newest first, optionally filtered.
    pub async fn feed(&self, page: u32, search: Option<&str>) -> Result<PostPage, NewsError> {
        let search = search.map(str::trim).filter(|s| !s.is_empty());
        info!("Fetching news page {}", page);

        let request = self.get("/posts").query(&self.feed_query(page, search));
        let response: ListResponse = get_json(request).await.map_err(NewsError::Feed)?;

        let pagination = response.meta.and_then(|m| m.pagination);
        let page_count = pagination
            .as_ref()
            .and_then(|p| p.page_count)
            .unwrap_or(1);
        let total = pagination.as_ref().and_then(|p| p.total).unwrap_or(0);

        let posts = response
            .data
            .unwrap_or_default()
            .into_iter()
            .filter_map(|raw| {
                let id = raw.id;
                let post = raw.into_post(&self.media_base_url);
                if post.is_none() {
                    warn!("Skipping post {} without a title", id);
                }
                post
            })
            .collect();

        Ok(PostPage {
            posts,
            page,
            page_count,
            total,
            search: search.map(String::from),
        })
    }

    /// A single post by numeric id or slug.
    pub async fn post(&self, reference: &str) -> Result<Post, NewsError> {
        let raw = match PostRef::parse(reference) {
            PostRef::Id(id) => self.post_by_id(id).await?,
            PostRef::Slug(slug) => self.post_by_slug(&slug).await?,
        };

        raw.and_then(|raw| raw.into_post(&self.media_base_url))
            .ok_or(NewsError::PostNotFound)
    }

    async fn post_by_id(&self, id: u64) -> Result<Option<RawPost>, NewsError> {
        let request = self
            .get(&format!("/posts/{}", id))
            .query(&[("populate", "*")]);

        match get_json::<SingleResponse>(request).await {
            Ok(response) => Ok(response.data.and_then(OneOrMany::first)),
            Err(e) => {
                debug!("Fetch of post {} failed ({}), scanning the post list", id, e);
                let request = self.get("/posts").query(&[("populate", "*")]);
                let response: ListResponse = get_json(request).await.map_err(NewsError::Post)?;
                Ok(response
                    .data
                    .unwrap_or_default()
                    .into_iter()
                    .find(|post| post.id == id))
            }
        }
    }

    async fn post_by_slug(&self, slug: &str) -> Result<Option<RawPost>, NewsError> {
        let title = slug.replace('-', " ");
        let request = self
            .get("/posts")
            .query(&[("filters[title][$contains]", title.as_str()), ("populate", "*")]);

        let response: SingleResponse = get_json(request).await.map_err(NewsError::Post)?;
        Ok(response.data.and_then(OneOrMany::first))
    }

    /// Several posts at once. Each reference that cannot be loaded becomes
    /// [`PostView::Missing`] carrying the reason.
    pub async fn posts(
        &self,
        references: &[String],
        observer: &dyn Observer,
    ) -> Result<Vec<PostView>, AggregateError> {
        let tasks: Vec<Task<'_, PostView>> = references
            .iter()
            .map(|reference| {
                Task::new(reference.as_str(), async move {
                    let post = self.post(reference).await?;
                    Ok::<_, anyhow::Error>(PostView::Found(post))
                })
                .with_timeout(self.lookup_timeout)
            })
            .collect();

        let result = aggregate_with(
            tasks,
            |reference| PostView::Missing {
                reference: reference.to_string(),
                reason: NewsError::PostNotFound.to_string(),
            },
            observer,
        )
        .await?;

        let reasons: Vec<(usize, String)> = result
            .failures()
            .iter()
            .map(|f| (f.position, f.error.to_string()))
            .collect();

        let mut views = result.into_values();
        for (position, message) in reasons {
            if let Some(PostView::Missing { reason, .. }) = views.get_mut(position) {
                *reason = message;
            }
        }

        Ok(views)
    }
}
