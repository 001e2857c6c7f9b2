use std::{collections::BTreeMap, sync::Arc};

use tokio::sync::watch;

use crate::{
    api::{Article, Category, Resource, Tag, User},
    Client, Error,
};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StoreState<R> {
    pub items: Arc<Vec<R>>,
    pub selected: Option<R>,
    pub is_loading: bool,
    /// Message of the last failed operation, reset when the next one starts
    pub error: Option<String>,
}

impl<R> Default for StoreState<R> {
    fn default() -> StoreState<R> {
        StoreState {
            items: Arc::new(Vec::new()),
            selected: None,
            is_loading: false,
            error: None,
        }
    }
}

/// Client-side cache of one server collection
///
/// Every operation both records its failure in `error` and returns it, so
/// that observers and callers can each react the way they prefer.
#[derive(Clone)]
pub struct ResourceStore<R: Resource> {
    client: Client,
    state: Arc<watch::Sender<StoreState<R>>>,
}

pub type ArticlesStore = ResourceStore<Article>;
pub type CategoriesStore = ResourceStore<Category>;
pub type TagsStore = ResourceStore<Tag>;
pub type UsersStore = ResourceStore<User>;

impl<R: Resource> ResourceStore<R> {
    pub fn new(client: Client) -> ResourceStore<R> {
        let (state, _) = watch::channel(StoreState::default());
        ResourceStore {
            client,
            state: Arc::new(state),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<StoreState<R>> {
        self.state.subscribe()
    }

    pub fn state(&self) -> StoreState<R> {
        self.state.borrow().clone()
    }

    pub fn items(&self) -> Arc<Vec<R>> {
        self.state.borrow().items.clone()
    }

    pub fn selected(&self) -> Option<R> {
        self.state.borrow().selected.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading
    }

    pub fn error(&self) -> Option<String> {
        self.state.borrow().error.clone()
    }

    pub fn count(&self) -> usize {
        self.state.borrow().items.len()
    }

    pub fn has_items(&self) -> bool {
        self.count() > 0
    }

    /// Nothing to show and nothing coming
    pub fn is_empty(&self) -> bool {
        let s = self.state.borrow();
        s.items.is_empty() && !s.is_loading
    }

    pub async fn load_all(&self) -> Result<Arc<Vec<R>>, Error> {
        self.begin(|_| ());
        let res = self.client.list::<R>().await.map(Arc::new);
        self.finish(res, |s, items| s.items = items.clone())
    }

    pub async fn load(&self, id: R::Id) -> Result<R, Error> {
        self.begin(|s| s.selected = None);
        let res = self.client.fetch::<R>(id).await;
        self.finish(res, |s, item| s.selected = Some(item.clone()))
    }

    /// Picks an already loaded item, without asking the server
    pub fn select(&self, id: R::Id) -> Option<R> {
        let found = self.state.borrow().items.iter().find(|i| i.id() == id).cloned();
        self.state.send_modify(|s| s.selected = found.clone());
        found
    }

    pub async fn create(&self, new: &R::New) -> Result<R, Error> {
        self.begin(|_| ());
        let res = self.client.create::<R>(new).await;
        self.finish(res, |s, item| Arc::make_mut(&mut s.items).push(item.clone()))
    }

    pub async fn update(&self, id: R::Id, update: &R::Update) -> Result<R, Error> {
        self.begin(|_| ());
        let res = self.client.update::<R>(id, update).await;
        self.finish(res, |s, item| {
            for i in Arc::make_mut(&mut s.items).iter_mut() {
                if i.id() == id {
                    *i = item.clone();
                }
            }
            s.selected = Some(item.clone());
        })
    }

    pub async fn delete(&self, id: R::Id) -> Result<(), Error> {
        self.begin(|_| ());
        let res = self.client.delete::<R>(id).await;
        self.finish(res, |s, _| {
            Arc::make_mut(&mut s.items).retain(|i| i.id() != id);
            if s.selected.as_ref().map(|i| i.id() == id).unwrap_or(false) {
                s.selected = None;
            }
        })
    }

    pub fn clear_selected(&self) {
        self.state.send_modify(|s| s.selected = None);
    }

    pub fn clear_error(&self) {
        self.state.send_modify(|s| s.error = None);
    }

    pub fn clear(&self) {
        self.state.send_modify(|s| *s = StoreState::default());
    }

    fn begin(&self, f: impl FnOnce(&mut StoreState<R>)) {
        self.state.send_modify(|s| {
            s.is_loading = true;
            s.error = None;
            f(s);
        });
    }

    fn finish<T>(
        &self,
        res: Result<T, Error>,
        apply: impl FnOnce(&mut StoreState<R>, &T),
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
                tracing::warn!(resource = R::PATH, %err, "store operation failed");
                self.state.send_modify(|s| {
                    s.is_loading = false;
                    s.error = Some(err.user_message());
                });
                Err(err)
            }
        }
    }
}

impl ResourceStore<User> {
    /// Loaded users, grouped by the exact role name the server gave them
    pub fn users_by_role(&self) -> BTreeMap<String, Vec<User>> {
        let mut res = BTreeMap::<String, Vec<User>>::new();
        for u in self.state.borrow().items.iter() {
            res.entry(u.role.0.clone()).or_default().push(u.clone());
        }
        res
    }

    pub fn users_with_role(&self, role: &str) -> Vec<User> {
        self.state
            .borrow()
            .items
            .iter()
            .filter(|u| u.role.0 == role)
            .cloned()
            .collect()
    }

    /// Case-insensitive match on username, email and names
    pub fn search(&self, query: &str) -> Vec<User> {
        let query = query.to_lowercase();
        self.state
            .borrow()
            .items
            .iter()
            .filter(|u| {
                [&u.username, &u.email, &u.first_name, &u.last_name]
                    .iter()
                    .any(|f| f.to_lowercase().contains(&query))
            })
            .cloned()
            .collect()
    }
}
