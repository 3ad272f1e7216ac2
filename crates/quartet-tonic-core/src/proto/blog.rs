//! `blog` package.

use quartet::blog;

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct Blog {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, tag = "2")]
    pub author_id: String,
    #[prost(string, tag = "3")]
    pub title: String,
    #[prost(string, tag = "4")]
    pub content: String,
}

impl From<Blog> for blog::Blog {
    fn from(b: Blog) -> Self {
        Self {
            id: b.id,
            author_id: b.author_id,
            title: b.title,
            content: b.content,
        }
    }
}

impl From<blog::Blog> for Blog {
    fn from(b: blog::Blog) -> Self {
        Self {
            id: b.id,
            author_id: b.author_id,
            title: b.title,
            content: b.content,
        }
    }
}

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct CreateBlogRequest {
    #[prost(message, optional, tag = "1")]
    pub blog: Option<Blog>,
}

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct CreateBlogResponse {
    #[prost(message, optional, tag = "1")]
    pub blog: Option<Blog>,
}

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct ReadBlogRequest {
    #[prost(string, tag = "1")]
    pub blog_id: String,
}

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct ReadBlogResponse {
    #[prost(message, optional, tag = "1")]
    pub blog: Option<Blog>,
}

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct UpdateBlogRequest {
    #[prost(message, optional, tag = "1")]
    pub blog: Option<Blog>,
}

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct UpdateBlogResponse {
    #[prost(message, optional, tag = "1")]
    pub blog: Option<Blog>,
}

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct DeleteBlogRequest {
    #[prost(string, tag = "1")]
    pub blog_id: String,
}

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct DeleteBlogResponse {
    #[prost(string, tag = "1")]
    pub blog_id: String,
}

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct ListBlogRequest {}

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct ListBlogResponse {
    #[prost(message, optional, tag = "1")]
    pub blog: Option<Blog>,
}

include!(concat!(env!("OUT_DIR"), "/blog.BlogService.rs"));

pub use blog_service_client::BlogServiceClient;
pub use blog_service_server::{BlogService, BlogServiceServer};
