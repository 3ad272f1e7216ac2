//! Document-backed blog resource.
//!
//! [`BlogService`] implements create, read, update, delete and list over any
//! [`DocumentStore`], each operation bound to one interaction shape:
//!
//! | Operation    | Shape           | Failure kinds                                |
//! |--------------|-----------------|----------------------------------------------|
//! | `CreateBlog` | unary           | `Internal`                                   |
//! | `ReadBlog`   | unary           | `InvalidArgument`, `NotFound`, `Internal`    |
//! | `UpdateBlog` | unary           | `InvalidArgument`, `NotFound`, `Internal`    |
//! | `DeleteBlog` | unary           | `InvalidArgument`, `NotFound`, `Internal`    |
//! | `ListBlog`   | server stream   | `Internal` (after any records already sent)  |
//!
//! Records are owned by the store and never cached here. Update is a
//! read-then-replace without a lock: concurrent updates of one blog race and
//! the last replace wins.

use crate::engine::{
    CallContext, CallStream, MethodDescriptor, ServiceDescriptor, Shape, server_stream, unary,
};
use crate::store::{Document, DocumentKey, DocumentStore, StoreError};
use crate::{Error, Result};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const SERVICE: &str = "blog.BlogService";

pub static CREATE_BLOG: MethodDescriptor =
    MethodDescriptor::new(SERVICE, "CreateBlog", Shape::Unary);
pub static READ_BLOG: MethodDescriptor = MethodDescriptor::new(SERVICE, "ReadBlog", Shape::Unary);
pub static UPDATE_BLOG: MethodDescriptor =
    MethodDescriptor::new(SERVICE, "UpdateBlog", Shape::Unary);
pub static DELETE_BLOG: MethodDescriptor =
    MethodDescriptor::new(SERVICE, "DeleteBlog", Shape::Unary);
pub static LIST_BLOG: MethodDescriptor =
    MethodDescriptor::new(SERVICE, "ListBlog", Shape::ServerStream);

pub static BLOG_SERVICE: ServiceDescriptor = ServiceDescriptor {
    name: SERVICE,
    methods: &[
        &CREATE_BLOG,
        &READ_BLOG,
        &UPDATE_BLOG,
        &DELETE_BLOG,
        &LIST_BLOG,
    ],
};

/// A blog post as exchanged with callers.
///
/// `id` is the text form of the store key. It is empty on create requests
/// and assigned by the store.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Blog {
    pub id: String,
    pub author_id: String,
    pub title: String,
    pub content: String,
}

/// The stored shape of a blog; the key lives outside the document.
#[derive(Debug, Serialize, Deserialize)]
struct BlogItem {
    author_id: String,
    title: String,
    content: String,
}

impl BlogItem {
    fn from_blog(blog: Blog) -> Self {
        Self {
            author_id: blog.author_id,
            title: blog.title,
            content: blog.content,
        }
    }

    fn into_blog(self, key: &DocumentKey) -> Blog {
        Blog {
            id: key.to_string(),
            author_id: self.author_id,
            title: self.title,
            content: self.content,
        }
    }

    fn to_document(&self) -> Result<Document> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(document)) => Ok(document),
            Ok(other) => Err(Error::internal(format!(
                "blog encoded to a non-object document: {other}"
            ))),
            Err(e) => Err(Error::internal(format!("cannot encode blog: {e}"))),
        }
    }

    fn from_document(key: &DocumentKey, document: Document) -> Result<Self> {
        serde_json::from_value(serde_json::Value::Object(document))
            .map_err(|e| Error::internal(format!("error while decoding blog {key}: {e}")))
    }
}

fn parse_key(id: &str) -> Result<DocumentKey> {
    DocumentKey::parse(id).map_err(|e| Error::invalid_argument(format!("cannot parse ID {id:?}: {e}")))
}

fn store_failure(action: &str, err: StoreError) -> Error {
    Error::internal(format!("{action}: {err}"))
}

/// CRUD and listing over a shared document store.
pub struct BlogService<S> {
    store: Arc<S>,
    stream_buffer: usize,
}

impl<S> Clone for BlogService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            stream_buffer: self.stream_buffer,
        }
    }
}

impl<S: DocumentStore> BlogService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            stream_buffer: 8,
        }
    }

    /// Outbound buffer for `list`.
    pub fn with_stream_buffer(mut self, stream_buffer: usize) -> Self {
        self.stream_buffer = stream_buffer;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Inserts a new blog and returns it with its assigned id. Any id on the
    /// request is ignored.
    pub async fn create(&self, ctx: CallContext, blog: Blog) -> Result<Blog> {
        unary(ctx, blog, |_, blog| async move {
            tracing::info!("Create blog: {}", blog.title);
            let item = BlogItem::from_blog(blog);
            let key = self
                .store
                .insert(item.to_document()?)
                .await
                .map_err(|e| store_failure("cannot insert blog", e))?;
            Ok(item.into_blog(&key))
        })
        .await
    }

    pub async fn read(&self, ctx: CallContext, id: String) -> Result<Blog> {
        unary(ctx, id, |_, id| async move {
            tracing::info!("Read blog: {id}");
            let key = parse_key(&id)?;
            self.fetch(&key).await
        })
        .await
    }

    /// Replaces every field of an existing blog.
    pub async fn update(&self, ctx: CallContext, blog: Blog) -> Result<Blog> {
        unary(ctx, blog, |_, blog| async move {
            tracing::info!("Update blog: {}", blog.id);
            let key = parse_key(&blog.id)?;
            self.fetch(&key).await?;

            let item = BlogItem::from_blog(blog);
            let matched = self
                .store
                .replace(&key, item.to_document()?)
                .await
                .map_err(|e| store_failure("cannot update blog", e))?;
            if matched == 0 {
                // Deleted between the lookup and the replace.
                return Err(Error::not_found(format!("cannot find blog with ID {key}")));
            }
            Ok(item.into_blog(&key))
        })
        .await
    }

    /// Deletes a blog and echoes the identifier back.
    pub async fn delete(&self, ctx: CallContext, id: String) -> Result<String> {
        unary(ctx, id, |_, id| async move {
            tracing::info!("Delete blog: {id}");
            let key = parse_key(&id)?;
            let deleted = self
                .store
                .delete_by_key(&key)
                .await
                .map_err(|e| store_failure("cannot delete blog", e))?;
            if deleted == 0 {
                return Err(Error::not_found(format!("cannot find blog with ID {key}")));
            }
            Ok(id)
        })
        .await
    }

    /// Streams every stored blog in scan order.
    ///
    /// A record that fails to decode ends the stream with `Internal`; records
    /// sent before it stay delivered.
    pub fn list(&self, ctx: CallContext) -> CallStream<Blog> {
        let store = Arc::clone(&self.store);
        server_stream(ctx, (), self.stream_buffer, move |(), mut out| async move {
            tracing::info!("List blog request");
            let mut cursor = store
                .scan_all()
                .await
                .map_err(|e| store_failure("cannot scan blogs", e))?;

            while let Some(record) = cursor.next().await {
                let record = record.map_err(|e| store_failure("cannot scan blogs", e))?;
                let blog = BlogItem::from_document(&record.key, record.document)?
                    .into_blog(&record.key);
                out.emit(blog).await?;
            }

            tracing::debug!("Listed {} blogs", out.emitted());
            Ok(())
        })
    }

    async fn fetch(&self, key: &DocumentKey) -> Result<Blog> {
        let document = self
            .store
            .find_by_key(key)
            .await
            .map_err(|e| store_failure("cannot read blog", e))?
            .ok_or_else(|| Error::not_found(format!("cannot find blog with ID {key}")))?;
        Ok(BlogItem::from_document(key, document)?.into_blog(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Code;
    use crate::store::MemoryStore;
    use futures::StreamExt;
    use std::collections::HashSet;

    fn service() -> BlogService<MemoryStore> {
        BlogService::new(Arc::new(MemoryStore::new()))
    }

    fn draft(title: &str) -> Blog {
        Blog {
            id: String::new(),
            author_id: "naray".to_string(),
            title: title.to_string(),
            content: format!("{title} body"),
        }
    }

    const ABSENT_ID: &str = "00000000000000000000000000";

    #[tokio::test]
    async fn create_then_read_round_trips() {
        let blogs = service();

        let created = blogs.create(CallContext::new(), draft("hello")).await.unwrap();
        assert!(DocumentKey::is_valid(&created.id));

        let read = blogs.read(CallContext::new(), created.id.clone()).await.unwrap();
        assert_eq!(read, created);
        assert_eq!(
            (read.author_id.as_str(), read.title.as_str(), read.content.as_str()),
            ("naray", "hello", "hello body")
        );
    }

    #[tokio::test]
    async fn create_ignores_a_client_supplied_id() {
        let blogs = service();
        let mut blog = draft("mine");
        blog.id = "not-an-id".to_string();

        let created = blogs.create(CallContext::new(), blog).await.unwrap();
        assert!(DocumentKey::is_valid(&created.id));
    }

    #[tokio::test]
    async fn malformed_ids_are_invalid_arguments() {
        let blogs = service();
        blogs.create(CallContext::new(), draft("x")).await.unwrap();

        for id in ["", "123", "zzzzzzzzzzzzzzzzzzzzzzzz", "5f1d7e2a9c3b4a00123456789"] {
            let read = blogs.read(CallContext::new(), id.to_string()).await;
            let mut update = draft("y");
            update.id = id.to_string();
            let update = blogs.update(CallContext::new(), update).await;
            let delete = blogs.delete(CallContext::new(), id.to_string()).await;

            for result in [read.map(|_| ()), update.map(|_| ()), delete.map(|_| ())] {
                assert_eq!(result.unwrap_err().code(), Code::InvalidArgument, "id {id:?}");
            }
        }
    }

    #[tokio::test]
    async fn absent_ids_are_not_found() {
        let blogs = service();
        let mut update = draft("ghost");
        update.id = ABSENT_ID.to_string();

        let read = blogs.read(CallContext::new(), ABSENT_ID.to_string()).await;
        let update = blogs.update(CallContext::new(), update).await;
        let delete = blogs.delete(CallContext::new(), ABSENT_ID.to_string()).await;

        assert_eq!(read.unwrap_err().code(), Code::NotFound);
        assert_eq!(update.unwrap_err().code(), Code::NotFound);
        assert_eq!(delete.unwrap_err().code(), Code::NotFound);
    }

    #[tokio::test]
    async fn update_replaces_every_field() {
        let blogs = service();
        let created = blogs.create(CallContext::new(), draft("before")).await.unwrap();

        let replacement = Blog {
            id: created.id.clone(),
            author_id: "citra".to_string(),
            title: "after".to_string(),
            content: String::new(),
        };
        let updated = blogs
            .update(CallContext::new(), replacement.clone())
            .await
            .unwrap();

        assert_eq!(updated, replacement);
        assert_eq!(
            blogs.read(CallContext::new(), created.id).await.unwrap(),
            replacement
        );
    }

    #[tokio::test]
    async fn delete_echoes_the_id_and_removes_the_record() {
        let blogs = service();
        let created = blogs.create(CallContext::new(), draft("short-lived")).await.unwrap();

        let deleted = blogs.delete(CallContext::new(), created.id.clone()).await;
        assert_eq!(deleted, Ok(created.id.clone()));

        let again = blogs.delete(CallContext::new(), created.id.clone()).await;
        assert_eq!(again.unwrap_err().code(), Code::NotFound);
        let read = blogs.read(CallContext::new(), created.id).await;
        assert_eq!(read.unwrap_err().code(), Code::NotFound);
    }

    #[tokio::test]
    async fn list_streams_every_record_then_succeeds() {
        let blogs = service();
        let mut expected = HashSet::new();
        for i in 0..7 {
            let created = blogs
                .create(CallContext::new(), draft(&format!("post {i}")))
                .await
                .unwrap();
            expected.insert(created.id);
        }

        let items: Vec<_> = blogs.list(CallContext::new()).collect().await;

        assert_eq!(items.len(), 7);
        let ids: HashSet<_> = items.into_iter().map(|b| b.unwrap().id).collect();
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn list_of_an_empty_store_closes_immediately() {
        let mut stream = service().list(CallContext::new());
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn undecodable_record_aborts_the_listing() {
        let blogs = service();
        for i in 0..3 {
            blogs
                .create(CallContext::new(), draft(&i.to_string()))
                .await
                .unwrap();
        }
        let mut corrupt = Document::new();
        corrupt.insert("title".to_string(), serde_json::Value::from(42));
        let corrupt_key = blogs.store().insert(corrupt).await.unwrap();

        let items: Vec<_> = blogs.list(CallContext::new()).collect().await;

        let (last, delivered) = items.split_last().unwrap();
        assert_eq!(last.as_ref().unwrap_err().code(), Code::Internal);
        assert!(delivered.len() <= 3);
        assert!(delivered.iter().all(|b| b.is_ok()));

        let read = blogs.read(CallContext::new(), corrupt_key.to_string()).await;
        assert_eq!(read.unwrap_err().code(), Code::Internal);
    }

    #[tokio::test]
    async fn store_failures_are_internal() {
        let blogs = service();
        let created = blogs.create(CallContext::new(), draft("kept")).await.unwrap();
        blogs.store().set_available(false);

        let create = blogs.create(CallContext::new(), draft("lost")).await;
        let read = blogs.read(CallContext::new(), created.id.clone()).await;
        let delete = blogs.delete(CallContext::new(), created.id).await;
        let list: Vec<_> = blogs.list(CallContext::new()).collect().await;

        assert_eq!(create.unwrap_err().code(), Code::Internal);
        assert_eq!(read.unwrap_err().code(), Code::Internal);
        assert_eq!(delete.unwrap_err().code(), Code::Internal);
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].as_ref().unwrap_err().code(), Code::Internal);
    }
}
