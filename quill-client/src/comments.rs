use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;

use crate::{
    api::{ArticleId, Comment, CommentId, CommentUpdate, NewComment},
    comment, Client, Error,
};

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CommentsState {
    /// Flat, in server order
    pub comments: Arc<Vec<Comment>>,
    pub is_loading: bool,
    pub error: Option<String>,
}

/// The comments of the article being looked at
#[derive(Clone)]
pub struct CommentsStore {
    client: Client,
    state: Arc<watch::Sender<CommentsState>>,
    // last flat list nested, and the result
    nested: Arc<Mutex<Option<(Arc<Vec<Comment>>, Arc<Vec<Comment>>)>>>,
}

impl CommentsStore {
    pub fn new(client: Client) -> CommentsStore {
        let (state, _) = watch::channel(CommentsState::default());
        CommentsStore {
            client,
            state: Arc::new(state),
            nested: Arc::new(Mutex::new(None)),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<CommentsState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> CommentsState {
        self.state.borrow().clone()
    }

    pub fn comments(&self) -> Arc<Vec<Comment>> {
        self.state.borrow().comments.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading
    }

    pub fn error(&self) -> Option<String> {
        self.state.borrow().error.clone()
    }

    pub fn count(&self) -> usize {
        self.state.borrow().comments.len()
    }

    pub fn has_comments(&self) -> bool {
        self.count() > 0
    }

    /// The current comments as a forest, recomputed only when the flat list
    /// changed since the last call
    pub fn nested(&self) -> Arc<Vec<Comment>> {
        let flat = self.comments();
        let mut cache = self.nested.lock();
        if let Some((source, roots)) = &*cache {
            if Arc::ptr_eq(source, &flat) {
                return roots.clone();
            }
        }
        let roots = Arc::new(comment::nest(&flat));
        *cache = Some((flat, roots.clone()));
        roots
    }

    pub async fn load_for_article(&self, article: ArticleId) -> Result<Arc<Vec<Comment>>, Error> {
        self.begin();
        let res = self
            .client
            .comments_for_article(article)
            .await
            .map(Arc::new);
        self.finish(res, |s, comments| s.comments = comments.clone())
    }

    pub async fn create(&self, new: &NewComment) -> Result<Comment, Error> {
        self.begin();
        let res = self.client.create::<Comment>(new).await;
        self.finish(res, |s, c| Arc::make_mut(&mut s.comments).push(c.clone()))
    }

    pub async fn update(&self, id: CommentId, update: &CommentUpdate) -> Result<Comment, Error> {
        self.begin();
        let res = self.client.update::<Comment>(id, update).await;
        self.finish(res, |s, updated| {
            for c in Arc::make_mut(&mut s.comments).iter_mut() {
                if c.id == id {
                    *c = updated.clone();
                }
            }
        })
    }

    /// Deletes a comment on the server, and locally drops its whole thread
    pub async fn delete(&self, id: CommentId) -> Result<(), Error> {
        self.begin();
        let res = self.client.delete::<Comment>(id).await;
        self.finish(res, |s, _| {
            let gone = comment::descendants(&s.comments, id);
            Arc::make_mut(&mut s.comments).retain(|c| !gone.contains(&c.id));
        })
    }

    /// Drops the comments only, `error` and `is_loading` are left as they are
    pub fn clear(&self) {
        self.state
            .send_modify(|s| s.comments = Arc::new(Vec::new()));
    }

    pub fn clear_error(&self) {
        self.state.send_modify(|s| s.error = None);
    }

    fn begin(&self) {
        self.state.send_modify(|s| {
            s.is_loading = true;
            s.error = None;
        });
    }

    fn finish<T>(
        &self,
        res: Result<T, Error>,
        apply: impl FnOnce(&mut CommentsState, &T),
    ) -> Result<T, Error> {
        match res {
            Ok(v) => {
                self.state.send_modify(|s| {
                    s.is_loading = false;
                    apply(s, &v);
                });
                Ok(v)
            }
            Err(err) => {
                tracing::warn!(%err, "comment operation failed");
                self.state.send_modify(|s| {
                    s.is_loading = false;
                    s.error = Some(err.user_message());
                });
                Err(err)
            }
        }
    }
}
