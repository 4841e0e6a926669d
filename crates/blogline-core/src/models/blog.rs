use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct Blog {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub brief: String,
    #[serde(default)]
    pub content: String,
    #[serde(rename = "imageUrl", default)]
    pub image_url: Option<String>,
    #[serde(rename = "userId", default)]
    pub user_id: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub author: String,
    #[serde(rename = "authorDetails", default)]
    pub author_details: Option<AuthorDetails>,
    #[serde(rename = "isPublished", default)]
    pub is_published: bool,
    #[serde(rename = "createdAt", default)]
    #[cfg_attr(feature = "ts", ts(type = "string | null"))]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(rename = "updatedAt", default)]
    #[cfg_attr(feature = "ts", ts(type = "string | null"))]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
pub struct AuthorDetails {
    #[serde(rename = "profilePicture", default)]
    pub profile_picture: Option<String>,
    #[serde(default)]
    pub profession: Option<String>,
}

impl Blog {
    pub fn published_display(&self) -> String {
        match self.created_at {
            Some(dt) => dt.format("%b %d, %Y").to_string(),
            None => "Unpublished".to_string(),
        }
    }
}

/// Body for `/blogs/create-blog` and `PUT /blogs/:id`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlogDraft {
    pub title: String,
    pub brief: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(rename = "userId", default)]
    pub user_id: String,
    #[serde(default)]
    pub author: String,
    #[serde(rename = "imageUrl", default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Result of a listing or search call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlogList {
    pub blogs: Vec<Blog>,
    pub total_count: usize,
}

/// The listing and search endpoints answer either with a wrapped page or a
/// bare array depending on the backend version.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum BlogListPayload {
    Bare(Vec<Blog>),
    Wrapped {
        blogs: Vec<Blog>,
        #[serde(rename = "totalCount")]
        total_count: Option<usize>,
    },
}

impl From<BlogListPayload> for BlogList {
    fn from(payload: BlogListPayload) -> Self {
        match payload {
            BlogListPayload::Wrapped { blogs, total_count } => {
                let total_count = total_count.unwrap_or(blogs.len());
                BlogList { blogs, total_count }
            }
            BlogListPayload::Bare(blogs) => BlogList {
                total_count: blogs.len(),
                blogs,
            },
        }
    }
}
