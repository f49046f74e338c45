use std::sync::Arc;

use crate::{
    controllers::{CommentServices, report},
    error::AppError,
    events::{Signal, SignalSink},
    models::{
        comment::{Comment, CommentView, NewComment, build_thread},
        host::HostRef,
        page::{Page, window},
        user::Actor,
    },
};

/// Drives one host's comment thread: the new-comment form and the listing.
pub struct ThreadController {
    services: CommentServices,
    sink: Arc<dyn SignalSink>,
    host: HostRef,
    form_visible: bool,
    new_comment: String,
}

impl ThreadController {
    /// Binds a controller to `host`, which must be registered and exist.
    pub async fn mount(
        services: CommentServices,
        host: HostRef,
        sink: Arc<dyn SignalSink>,
    ) -> Result<Self, AppError> {
        services.hosts.resolve(&host).await?;

        Ok(Self {
            services,
            sink,
            host,
            form_visible: true,
            new_comment: String::new(),
        })
    }

    pub fn host(&self) -> &HostRef {
        &self.host
    }

    pub fn new_comment(&self) -> &str {
        &self.new_comment
    }

    pub fn set_new_comment(&mut self, body: impl Into<String>) {
        self.new_comment = body.into();
    }

    /// Whether the host page shows the new-comment form.
    pub fn is_form_visible(&self) -> bool {
        self.form_visible
    }

    pub fn show_form(&mut self) {
        self.form_visible = true;
    }

    pub fn hide_form(&mut self) {
        self.form_visible = false;
    }

    /// Posts the current draft as a root comment.
    pub async fn add_comment(&mut self, actor: Actor) -> Result<Comment, AppError> {
        let result = self.try_add_comment(actor).await;
        let comment = report(self.sink.as_ref(), "add_comment", result)?;

        self.new_comment.clear();
        self.sink.emit(Signal::CommentAdded);
        self.sink.emit(Signal::Success("Comment added successfully!".to_string()));
        Ok(comment)
    }

    async fn try_add_comment(&self, actor: Actor) -> Result<Comment, AppError> {
        let author_id = actor.require("You must be logged in to comment.")?;
        self.services.hosts.resolve(&self.host).await?;

        self.services
            .comments
            .create(NewComment {
                author_id,
                host: self.host.clone(),
                parent_id: None,
                body: self.new_comment.clone(),
                approve: self.services.policy.auto_approve,
            })
            .await
    }

    /// Approved root comments, newest first, with authors and reply trees.
    /// `0` selects the configured page size / the first page.
    pub async fn list_page(&self, page_size: u32, page_number: u32) -> Result<Page<CommentView>, AppError> {
        let (per_page, page, offset) = window(page_size, page_number, self.services.policy.per_page);
        let comments = &self.services.comments;

        let total = comments.count_roots(&self.host).await?;
        let roots = comments.page_roots(&self.host, per_page, offset).await?;
        let root_ids: Vec<i64> = roots.iter().map(|root| root.comment.id).collect();
        let replies = comments.thread_replies(&root_ids).await?;

        let items = build_thread(roots, replies, &self.services.policy.date_format);
        Ok(Page::new(items, page, per_page, total))
    }

    /// Every live comment on the host, replies and unapproved ones included.
    pub async fn count(&self) -> Result<i64, AppError> {
        self.services.comments.count_all(&self.host).await
    }
}
