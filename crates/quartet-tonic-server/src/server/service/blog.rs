//! `blog.BlogService` over the engine's [`BlogService`].

use super::{Call, ResponseStream};
use quartet_tonic_core::proto::blog::{
    self as wire, BlogService as BlogApi, CreateBlogRequest, CreateBlogResponse,
    DeleteBlogRequest, DeleteBlogResponse, ListBlogRequest, ListBlogResponse, ReadBlogRequest,
    ReadBlogResponse, UpdateBlogRequest, UpdateBlogResponse,
};
use quartet_tonic_core::quartet::blog::{
    BlogService, CREATE_BLOG, DELETE_BLOG, LIST_BLOG, READ_BLOG, UPDATE_BLOG,
};
use quartet_tonic_core::quartet::engine::Dispatcher;
use quartet_tonic_core::quartet::store::DocumentStore;
use quartet_tonic_core::quartet::{self, Error};
use std::sync::Arc;
use tonic::{Request, Response, Status};

pub struct BlogHandler<S> {
    blogs: BlogService<S>,
    dispatcher: Arc<Dispatcher>,
}

impl<S> Clone for BlogHandler<S> {
    fn clone(&self) -> Self {
        Self {
            blogs: self.blogs.clone(),
            dispatcher: Arc::clone(&self.dispatcher),
        }
    }
}

impl<S: DocumentStore> BlogHandler<S> {
    pub fn new(blogs: BlogService<S>, dispatcher: Arc<Dispatcher>) -> Self {
        Self { blogs, dispatcher }
    }
}

fn required(blog: Option<wire::Blog>) -> quartet::Result<quartet::blog::Blog> {
    blog.map(Into::into)
        .ok_or_else(|| Error::invalid_argument("request carries no blog"))
}

fn with_blog(blog: quartet::blog::Blog) -> Option<wire::Blog> {
    Some(blog.into())
}

#[tonic::async_trait]
impl<S: DocumentStore> BlogApi for BlogHandler<S> {
    type ListBlogStream = ResponseStream<ListBlogResponse>;

    #[tracing::instrument(name = "CreateBlog", skip_all)]
    async fn create_blog(
        &self,
        request: Request<CreateBlogRequest>,
    ) -> Result<Response<CreateBlogResponse>, Status> {
        let call = Call::open(&self.dispatcher, &CREATE_BLOG, &request)?;
        let result = match required(request.into_inner().blog) {
            Ok(blog) => self.blogs.create(call.context(), blog).await,
            Err(e) => Err(e),
        };
        call.respond(result.map(|blog| CreateBlogResponse {
            blog: with_blog(blog),
        }))
    }

    #[tracing::instrument(name = "ReadBlog", skip_all, fields(blog_id = %request.get_ref().blog_id))]
    async fn read_blog(
        &self,
        request: Request<ReadBlogRequest>,
    ) -> Result<Response<ReadBlogResponse>, Status> {
        let call = Call::open(&self.dispatcher, &READ_BLOG, &request)?;
        let result = self
            .blogs
            .read(call.context(), request.into_inner().blog_id)
            .await;
        call.respond(result.map(|blog| ReadBlogResponse {
            blog: with_blog(blog),
        }))
    }

    #[tracing::instrument(name = "UpdateBlog", skip_all)]
    async fn update_blog(
        &self,
        request: Request<UpdateBlogRequest>,
    ) -> Result<Response<UpdateBlogResponse>, Status> {
        let call = Call::open(&self.dispatcher, &UPDATE_BLOG, &request)?;
        let result = match required(request.into_inner().blog) {
            Ok(blog) => self.blogs.update(call.context(), blog).await,
            Err(e) => Err(e),
        };
        call.respond(result.map(|blog| UpdateBlogResponse {
            blog: with_blog(blog),
        }))
    }

    #[tracing::instrument(name = "DeleteBlog", skip_all, fields(blog_id = %request.get_ref().blog_id))]
    async fn delete_blog(
        &self,
        request: Request<DeleteBlogRequest>,
    ) -> Result<Response<DeleteBlogResponse>, Status> {
        let call = Call::open(&self.dispatcher, &DELETE_BLOG, &request)?;
        let result = self
            .blogs
            .delete(call.context(), request.into_inner().blog_id)
            .await;
        call.respond(result.map(|blog_id| DeleteBlogResponse { blog_id }))
    }

    #[tracing::instrument(name = "ListBlog", skip_all)]
    async fn list_blog(
        &self,
        request: Request<ListBlogRequest>,
    ) -> Result<Response<Self::ListBlogStream>, Status> {
        let call = Call::open(&self.dispatcher, &LIST_BLOG, &request)?;
        let blogs = self.blogs.list(call.context());
        Ok(call.stream(blogs, |blog| ListBlogResponse {
            blog: with_blog(blog),
        }))
    }
}
