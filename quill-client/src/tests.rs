use std::{sync::Arc, time::Duration};

use serde_json::{json, Value};
use wiremock::{
    matchers::{body_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

use crate::{
    api::{
        self, ArticleId, Author, Comment, CommentId, Envelope, NewComment, NewTag, Tag, TagId,
        TagUpdate, UserId,
    },
    storage::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY},
    AuthStore, Client, CommentsStore, Config, Error, MemoryStorage, Redirect, RefreshError,
    TagsStore, TokenStorage, UsersStore,
};

pub(crate) fn time() -> api::Time {
    api::time::parse("2024-05-01T10:00:00Z").expect("parsing test timestamp")
}

pub(crate) fn comment(id: i64, parent: Option<i64>) -> Comment {
    Comment {
        id: CommentId(id),
        content: format!("comment {id}"),
        article_id: ArticleId(1),
        author: Author {
            id: UserId(7),
            first_name: String::from("Ada"),
            last_name: String::from("Lovelace"),
            email: String::from("ada@example.org"),
            full_name: String::from("Ada Lovelace"),
        },
        created_at: time(),
        updated_at: time(),
        parent_id: parent.map(CommentId),
        replies: Vec::new(),
    }
}

fn ok(data: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(Envelope::ok(data))
}

fn fail(status: u16, message: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(Envelope::failure(message))
}

fn tag(id: i64, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "slug": name.to_lowercase(),
        // the server sometimes omits the offset
        "createdAt": "2024-05-01T10:00:00",
        "updatedAt": "2024-05-01T10:00:00.123Z",
    })
}

fn user(id: i64, username: &str, first: &str, last: &str, role: &str) -> Value {
    json!({
        "id": id,
        "username": username,
        "email": format!("{username}@example.org"),
        "firstName": first,
        "lastName": last,
        "role": role,
        "createdAt": "2024-05-01T10:00:00Z",
    })
}

fn tokens(access: &str, refresh: Option<&str>) -> Value {
    match refresh {
        Some(r) => json!({ "accessToken": access, "refreshToken": r }),
        None => json!({ "accessToken": access }),
    }
}

fn config(server: &MockServer) -> Config {
    Config::new(&format!("{}/api/v1", server.uri())).expect("building config for mock server")
}

fn client(config: Config, storage: &Arc<MemoryStorage>) -> Client {
    Client::new(config, storage.clone()).expect("building client")
}

#[tokio::test]
async fn concurrent_401s_share_one_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/tags"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(fail(401, "Token expired"))
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh"))
        .and(body_json(json!({ "refreshToken": "r1" })))
        .respond_with(ok(tokens("fresh", None)).set_delay(Duration::from_millis(500)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/tags"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ok(json!([tag(1, "Rust")])))
        .expect(3)
        .mount(&server)
        .await;

    let storage = Arc::new(MemoryStorage::with_tokens("stale", Some("r1")));
    let client = client(config(&server), &storage);
    let (a, b, c) = tokio::join!(
        client.list::<Tag>(),
        client.list::<Tag>(),
        client.list::<Tag>()
    );
    for res in [a, b, c] {
        let tags = res.expect("request should succeed after refresh");
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].id, TagId(1));
    }

    assert!(!client.coordinator().is_refreshing());
    assert_eq!(client.session().access_token().as_deref(), Some("fresh"));
    // not rotated, so kept
    assert_eq!(client.session().refresh_token().as_deref(), Some("r1"));
    assert_eq!(storage.get(ACCESS_TOKEN_KEY).unwrap().as_deref(), Some("fresh"));
    assert_eq!(storage.get(REFRESH_TOKEN_KEY).unwrap().as_deref(), Some("r1"));
}

#[tokio::test]
async fn rotated_refresh_token_is_persisted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/tags"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(fail(401, "Token expired"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh"))
        .respond_with(ok(tokens("fresh", Some("r2"))))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/tags"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(ok(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let storage = Arc::new(MemoryStorage::with_tokens("stale", Some("r1")));
    let client = client(config(&server), &storage);
    assert!(client.list::<Tag>().await.unwrap().is_empty());
    assert_eq!(client.session().refresh_token().as_deref(), Some("r2"));
    assert_eq!(storage.get(REFRESH_TOKEN_KEY).unwrap().as_deref(), Some("r2"));
}

#[tokio::test]
async fn new_refresh_cycle_after_idle() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/tags"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(fail(401, "Token expired"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/tags"))
        .and(header("authorization", "Bearer fresh1"))
        .respond_with(ok(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/categories"))
        .and(header("authorization", "Bearer fresh1"))
        .respond_with(fail(401, "Token expired"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/categories"))
        .and(header("authorization", "Bearer fresh2"))
        .respond_with(ok(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh"))
        .and(body_json(json!({ "refreshToken": "r1" })))
        .respond_with(ok(tokens("fresh1", Some("r2"))))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh"))
        .and(body_json(json!({ "refreshToken": "r2" })))
        .respond_with(ok(tokens("fresh2", None)))
        .expect(1)
        .mount(&server)
        .await;

    let storage = Arc::new(MemoryStorage::with_tokens("stale", Some("r1")));
    let client = client(config(&server), &storage);
    client.list::<Tag>().await.expect("first cycle");
    client
        .list::<api::Category>()
        .await
        .expect("second cycle");
    assert_eq!(client.session().access_token().as_deref(), Some("fresh2"));
}

#[tokio::test]
async fn failed_refresh_fails_every_waiter() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/articles"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(fail(401, "Token expired"))
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh"))
        .respond_with(fail(401, "Refresh token expired").set_delay(Duration::from_millis(500)))
        .expect(1)
        .mount(&server)
        .await;

    let storage = Arc::new(MemoryStorage::with_tokens("stale", Some("r1")));
    let client = client(config(&server), &storage);
    let mut redirects = client.navigator().subscribe();
    let (a, b, c) = tokio::join!(
        client.list::<api::Article>(),
        client.list::<api::Article>(),
        client.list::<api::Article>()
    );
    for res in [a, b, c] {
        let err = res.expect_err("no request may succeed when the refresh failed");
        assert!(
            matches!(err, Error::Refresh(RefreshError::Rejected { status: 401, .. })),
            "unexpected error {err:?}"
        );
        assert!(err.is_unauthorized());
    }

    assert!(!client.session().is_authenticated());
    assert_eq!(client.session().refresh_token(), None);
    assert_eq!(storage.get(ACCESS_TOKEN_KEY).unwrap(), None);
    assert_eq!(storage.get(REFRESH_TOKEN_KEY).unwrap(), None);
    assert_eq!(redirects.try_recv().unwrap(), Redirect::Login { expired: true });
    assert!(redirects.try_recv().is_err());
}

#[tokio::test]
async fn retried_request_is_not_retried_again() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/tags"))
        .respond_with(fail(401, "Token expired"))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh"))
        .respond_with(ok(tokens("fresh", None)))
        .expect(1)
        .mount(&server)
        .await;

    let storage = Arc::new(MemoryStorage::with_tokens("stale", Some("r1")));
    let client = client(config(&server), &storage);
    let err = client.list::<Tag>().await.unwrap_err();
    assert!(matches!(err, Error::Api(api::Error::Unauthorized)), "unexpected error {err:?}");
    assert!(!client.coordinator().is_refreshing());
    // the refresh itself went through
    assert_eq!(client.session().access_token().as_deref(), Some("fresh"));
}

#[tokio::test]
async fn forbidden_after_refresh_redirects_home() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/users"))
        .and(header("authorization", "Bearer stale"))
        .respond_with(fail(401, "Token expired"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh"))
        .respond_with(ok(tokens("fresh", None)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/users"))
        .and(header("authorization", "Bearer fresh"))
        .respond_with(fail(403, "Accès refusé"))
        .expect(1)
        .mount(&server)
        .await;

    let storage = Arc::new(MemoryStorage::with_tokens("stale", Some("r1")));
    let client = client(config(&server), &storage);
    let mut redirects = client.navigator().subscribe();
    let err = client.list::<api::User>().await.unwrap_err();
    assert!(err.is_forbidden());
    assert_eq!(redirects.try_recv().unwrap(), Redirect::access_denied());
    assert!(redirects.try_recv().is_err());
    assert!(client.session().is_authenticated());
}

#[tokio::test]
async fn request_timeout_bounds_slow_answers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/tags"))
        .respond_with(ok(json!([])).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let storage = Arc::new(MemoryStorage::with_tokens("a", None));
    let config = config(&server).with_request_timeout(Duration::from_millis(100));
    assert_eq!(config.request_timeout, Some(Duration::from_millis(100)));
    let client = client(config, &storage);
    let err = client.list::<Tag>().await.unwrap_err();
    assert!(matches!(err, Error::Http(ref e) if e.is_timeout()), "unexpected error {err:?}");
    assert!(client.session().is_authenticated());
}

#[tokio::test]
async fn refresh_timeout_ends_the_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/tags"))
        .respond_with(fail(401, "Token expired"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh"))
        .respond_with(ok(tokens("late", None)).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let storage = Arc::new(MemoryStorage::with_tokens("stale", Some("r1")));
    let config = config(&server).with_refresh_timeout(Duration::from_millis(100));
    let client = client(config, &storage);
    let err = client.list::<Tag>().await.unwrap_err();
    assert!(matches!(err, Error::Refresh(RefreshError::TimedOut(_))));
    assert!(!client.session().is_authenticated());
    assert!(!client.coordinator().is_refreshing());
}

#[tokio::test]
async fn auth_endpoint_401_is_not_refreshed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/login"))
        .respond_with(fail(401, "Identifiants invalides"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh"))
        .respond_with(ok(tokens("fresh", None)))
        .expect(0)
        .mount(&server)
        .await;

    let storage = Arc::new(MemoryStorage::with_tokens("old", Some("r1")));
    let client = client(config(&server), &storage);
    let mut redirects = client.navigator().subscribe();
    let err = client.login("ada@example.org", "wrong").await.unwrap_err();
    assert!(matches!(err, Error::Api(api::Error::Unauthorized)));
    assert!(!client.session().is_authenticated());
    assert_eq!(storage.get(REFRESH_TOKEN_KEY).unwrap(), None);
    assert_eq!(redirects.try_recv().unwrap(), Redirect::Login { expired: false });
}

#[tokio::test]
async fn unauthorized_without_refresh_token_goes_to_login() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/users"))
        .respond_with(fail(401, "Token expired"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/refresh"))
        .respond_with(ok(tokens("fresh", None)))
        .expect(0)
        .mount(&server)
        .await;

    let storage = Arc::new(MemoryStorage::with_tokens("stale", None));
    let client = client(config(&server), &storage);
    let mut redirects = client.navigator().subscribe();
    let err = client.list::<api::User>().await.unwrap_err();
    assert!(matches!(err, Error::Api(api::Error::Unauthorized)));
    assert!(!client.session().is_authenticated());
    assert_eq!(redirects.try_recv().unwrap(), Redirect::Login { expired: false });
}

#[tokio::test]
async fn forbidden_redirects_home() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/users/3"))
        .respond_with(fail(403, "Accès refusé"))
        .expect(1)
        .mount(&server)
        .await;

    let storage = Arc::new(MemoryStorage::with_tokens("a", Some("r")));
    let client = client(config(&server), &storage);
    let mut redirects = client.navigator().subscribe();
    let err = client.delete::<api::User>(UserId(3)).await.unwrap_err();
    assert!(err.is_forbidden());
    assert_eq!(redirects.try_recv().unwrap(), Redirect::access_denied());
    // a 403 leaves the session alone
    assert!(client.session().is_authenticated());
}

#[tokio::test]
async fn bearer_is_attached_and_empty_bodies_accepted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/articles/5/like"))
        .and(header("authorization", "Bearer a"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/articles/5/like"))
        .respond_with(ok(Value::Null))
        .expect(1)
        .mount(&server)
        .await;

    let storage = Arc::new(MemoryStorage::with_tokens("a", None));
    let client = client(config(&server), &storage);
    client.like_article(ArticleId(5)).await.unwrap();
    client.unlike_article(ArticleId(5)).await.unwrap();
}

#[tokio::test]
async fn envelope_failure_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/tags"))
        .and(body_json(json!({ "name": "Rust" })))
        .respond_with(fail(200, "Ce tag existe déjà"))
        .mount(&server)
        .await;

    let storage = Arc::new(MemoryStorage::with_tokens("a", None));
    let client = client(config(&server), &storage);
    let err = client
        .create::<Tag>(&NewTag {
            name: String::from("Rust"),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Api(api::Error::Rejected(ref m)) if m == "Ce tag existe déjà"));
}

#[tokio::test]
async fn tags_store_keeps_its_list_in_sync() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/tags"))
        .respond_with(ok(json!([tag(1, "Rust"), tag(2, "Tokio")])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/tags"))
        .respond_with(ok(tag(3, "Serde")))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/tags/2"))
        .and(body_json(json!({ "name": "Async" })))
        .respond_with(ok(tag(2, "Async")))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/tags/2"))
        .respond_with(ok(Value::Null))
        .mount(&server)
        .await;

    let storage = Arc::new(MemoryStorage::with_tokens("a", None));
    let store = TagsStore::new(client(config(&server), &storage));
    let mut changes = store.subscribe();
    assert!(store.is_empty());

    store.load_all().await.unwrap();
    assert!(changes.has_changed().unwrap());
    assert_eq!(store.count(), 2);
    assert!(!store.is_loading());

    store
        .create(&NewTag {
            name: String::from("Serde"),
        })
        .await
        .unwrap();
    let names: Vec<_> = store.items().iter().map(|t| t.name.clone()).collect();
    assert_eq!(names, vec!["Rust", "Tokio", "Serde"]);

    store
        .update(
            TagId(2),
            &TagUpdate {
                name: String::from("Async"),
            },
        )
        .await
        .unwrap();
    assert_eq!(store.items()[1].name, "Async");
    assert_eq!(store.selected().map(|t| t.id), Some(TagId(2)));

    store.delete(TagId(2)).await.unwrap();
    assert_eq!(store.count(), 2);
    assert_eq!(store.selected(), None);
    assert_eq!(store.error(), None);

    assert_eq!(store.select(TagId(1)).map(|t| t.name), Some(String::from("Rust")));
    store.clear();
    assert!(!store.has_items());
    assert_eq!(store.selected(), None);
}

#[tokio::test]
async fn store_records_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/tags/9"))
        .respond_with(fail(404, "Tag introuvable"))
        .mount(&server)
        .await;

    let storage = Arc::new(MemoryStorage::with_tokens("a", None));
    let store = TagsStore::new(client(config(&server), &storage));
    let err = store.load(TagId(9)).await.unwrap_err();
    assert!(matches!(err, Error::Api(api::Error::NotFound(_))));
    assert_eq!(store.error().as_deref(), Some("Tag introuvable"));
    assert!(!store.is_loading());
    store.clear_error();
    assert_eq!(store.error(), None);
}

#[tokio::test]
async fn users_store_groups_filters_and_searches() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/users"))
        .respond_with(
            ok(json!([
                user(1, "ada", "Ada", "Lovelace", "ADMIN"),
                user(2, "alan", "Alan", "Turing", "USER"),
                user(3, "grace", "Grace", "Hopper", "ROLE_ADMIN"),
                user(4, "edsger", "Edsger", "Dijkstra", "USER"),
            ]))
            .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let storage = Arc::new(MemoryStorage::with_tokens("a", None));
    let store = UsersStore::new(client(config(&server), &storage));
    assert!(store.is_empty());

    let mut changes = store.subscribe();
    let (loaded, ()) = tokio::join!(store.load_all(), async {
        changes.changed().await.unwrap();
        // no items yet, but some are on their way
        assert!(store.is_loading());
        assert!(!store.has_items());
        assert!(!store.is_empty());
    });
    assert_eq!(loaded.unwrap().len(), 4);
    assert!(!store.is_empty());

    let ids = |users: Vec<api::User>| users.into_iter().map(|u| u.id.0).collect::<Vec<_>>();

    let by_role = store.users_by_role();
    let roles: Vec<_> = by_role.keys().map(String::as_str).collect();
    assert_eq!(roles, vec!["ADMIN", "ROLE_ADMIN", "USER"]);
    assert_eq!(ids(by_role["USER"].clone()), vec![2, 4]);
    assert_eq!(ids(by_role["ADMIN"].clone()), vec![1]);

    assert_eq!(ids(store.users_with_role("ADMIN")), vec![1]);
    assert_eq!(ids(store.users_with_role("USER")), vec![2, 4]);
    assert!(store.users_with_role("admin").is_empty());

    assert_eq!(ids(store.search("LOVE")), vec![1]);
    assert_eq!(ids(store.search("grace@EXAMPLE")), vec![3]);
    assert_eq!(ids(store.search("alan")), vec![2]);
    assert_eq!(ids(store.search("dijk")), vec![4]);
    assert_eq!(ids(store.search("a")), vec![1, 2, 3, 4]);
    assert!(store.search("nobody").is_empty());
}

#[tokio::test]
async fn comments_store_nests_and_cascades() {
    let server = MockServer::start().await;
    let flat = vec![
        comment(1, None),
        comment(2, Some(1)),
        comment(3, Some(2)),
        comment(4, None),
    ];
    Mock::given(method("GET"))
        .and(path("/api/v1/comments/article/1"))
        .respond_with(ok(serde_json::to_value(&flat).unwrap()))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/comments"))
        .and(body_json(json!({ "content": "comment 5", "articleId": 1, "parentId": 4 })))
        .respond_with(ok(serde_json::to_value(comment(5, Some(4))).unwrap()))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/comments/1"))
        .respond_with(ok(Value::Null))
        .mount(&server)
        .await;

    let storage = Arc::new(MemoryStorage::with_tokens("a", None));
    let store = CommentsStore::new(client(config(&server), &storage));
    store.load_for_article(ArticleId(1)).await.unwrap();
    assert_eq!(store.count(), 4);

    let nested = store.nested();
    assert!(Arc::ptr_eq(&nested, &store.nested()));
    assert_eq!(nested.len(), 2);
    assert_eq!(nested[0].replies[0].replies[0].id, CommentId(3));

    store
        .create(&NewComment {
            content: String::from("comment 5"),
            article_id: ArticleId(1),
            parent_id: Some(CommentId(4)),
        })
        .await
        .unwrap();
    let nested = store.nested();
    assert_eq!(nested[1].replies[0].id, CommentId(5));

    store.delete(CommentId(1)).await.unwrap();
    let left: Vec<_> = store.comments().iter().map(|c| c.id.0).collect();
    assert_eq!(left, vec![4, 5]);
    assert_eq!(store.nested().len(), 1);

    store.clear();
    assert!(!store.has_comments());
}

#[tokio::test]
async fn auth_store_login_fetches_missing_profile() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/login"))
        .and(body_json(json!({ "email": "ada@example.org", "password": "hunter22" })))
        .respond_with(ok(tokens("a", Some("r"))))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/auth/me"))
        .and(header("authorization", "Bearer a"))
        .respond_with(ok(json!({
            "id": 1,
            "email": "ada@example.org",
            "username": "ada",
            "role": "ROLE_ADMIN",
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/auth/logout"))
        .respond_with(fail(500, "Erreur serveur"))
        .mount(&server)
        .await;

    let storage = Arc::new(MemoryStorage::new());
    let store = AuthStore::new(client(config(&server), &storage));
    assert!(!store.is_authenticated());

    let user = store.login("ada@example.org", "hunter22").await.unwrap();
    assert_eq!(user.id, UserId(1));
    assert!(store.is_authenticated());
    assert!(store.is_admin());
    assert_eq!(store.username().as_deref(), Some("ada"));
    assert_eq!(storage.get(ACCESS_TOKEN_KEY).unwrap().as_deref(), Some("a"));

    // the session goes away even though the server failed
    assert!(store.logout().await.is_err());
    assert!(!store.is_authenticated());
    assert_eq!(store.user(), None);
    assert!(store.status().error.is_some());
    assert!(!store.status().is_loading);
}

#[tokio::test]
async fn auth_store_initialize_drops_unknown_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/auth/me"))
        .respond_with(fail(401, "Token invalide"))
        .mount(&server)
        .await;

    let storage = Arc::new(MemoryStorage::with_tokens("revoked", None));
    let store = AuthStore::new(client(config(&server), &storage));
    assert!(store.is_authenticated());
    assert!(store.initialize().await.is_err());
    assert!(!store.is_authenticated());
    assert_eq!(storage.get(ACCESS_TOKEN_KEY).unwrap(), None);

    let empty = AuthStore::new(client(config(&server), &Arc::new(MemoryStorage::new())));
    assert_eq!(empty.initialize().await.unwrap(), None);
}
