#![cfg(test)]

use axum::{
    body::{Body, Bytes},
    http::{self, request, StatusCode},
};
use classmate_api::{
    Error as ApiError, Event, NewComment, NewEvent, NewThread, RecordId, Thread, TimeInput,
};
use classmate_mock_server::MockServer;
use serde_json::json;
use std::{cmp, fmt::Debug, ops::RangeTo, panic::AssertUnwindSafe, path::Path};
use tower::{Service, ServiceExt};

use crate::{store::*, *};

macro_rules! do_store_test {
    ( $name:ident, $typ:ty, $fn:expr ) => {
        #[test]
        fn $name() {
            if std::env::var("RUST_LOG").is_ok() {
                let _ = tracing_subscriber::fmt::try_init();
            }
            let runtime = AssertUnwindSafe(
                tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .expect("failed initializing tokio runtime"),
            );
            bolero::check!()
                .with_type::<$typ>()
                .cloned()
                .for_each(move |v| {
                    let datadir = tempfile::tempdir().expect("creating tempdir");
                    let () = runtime.block_on(async {
                        let store = Store::load(datadir.path())
                            .await
                            .expect("loading store");
                        $fn(store, v).await
                    });
                })
        }
    };
}

async fn raw_call(app: &mut Router, req: request::Request<Body>) -> (StatusCode, Bytes) {
    app.ready().await.expect("waiting for app to be ready");
    let resp = app.call(req).await.expect("running request");
    let status = resp.status();
    let body = hyper::body::to_bytes(resp.into_body())
        .await
        .expect("recovering resp bytes");
    (status, body)
}

async fn raw_request(app: &mut Router, method: &str, uri: &str, body: Vec<u8>) -> (StatusCode, Bytes) {
    let req = request::Builder::new()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .expect("building request");
    raw_call(app, req).await
}

async fn run_on_app<Req, Resp>(
    app: &mut Router,
    method: &str,
    uri: &str,
    body: &Req,
) -> Result<Resp, ApiError>
where
    Req: Debug + serde::Serialize,
    Resp: for<'de> serde::Deserialize<'de>,
{
    let req_body = serde_json::to_vec(body).expect("serializing request body to json");
    let (status, resp_body) = raw_request(app, method, uri, req_body).await;
    if status == StatusCode::OK {
        return Ok(serde_json::from_slice(&resp_body).unwrap_or_else(|err| {
            panic!(
                r#"
                    Failed parsing resp body!

                    The error is the following:
                    ---
                    {err}
                    ---

                    Response body is:
                    ---
                    {resp_body:?}
                    ---

                    Request was:
                    ---
                    {method} {uri} {body:?}
                    ---
                "#
            )
        }));
    }
    let err = ApiError::parse(&resp_body)
        .unwrap_or_else(|err| panic!("parsing error response body {err}, body is {resp_body:?}"));
    assert_eq!(status, err.status_code(), "status does not match error {err:?}");
    Err(err)
}

fn compare<T>(name: &str, app_res: Result<T, ApiError>, mock_res: Result<T, ApiError>)
where
    T: Debug + PartialEq,
{
    assert_eq!(
        app_res, mock_res,
        "app and mock did not return the same result for {name}"
    );
}

fn resize_int(fuzz_id: usize, RangeTo { end }: RangeTo<usize>) -> Option<usize> {
    if end == 0 {
        return None;
    }
    let bucket_size = cmp::max(1, usize::MAX / end); // in case we rounded to 0
    let id = fuzz_id / bucket_size;
    Some(cmp::min(id, end - 1)) // in case id was actually over end - 1 due to rounding
}

/// Never produced by the id generator, as it contains `0`
fn missing_id() -> RecordId {
    RecordId::from("000000")
}

#[derive(Clone, Debug, bolero::generator::TypeGenerator)]
enum FuzzOp {
    CreateEvent {
        title: Option<String>,
        semantic_location: Option<String>,
        latitude: Option<i16>,
        longitude: Option<i16>,
        users_attending: Option<bool>,
        start_time: Option<i64>,
        end_time: Option<i64>,
    },
    CreateThread {
        post_text: Option<String>,
        author: Option<String>,
        category: Option<String>,
        with_comments: bool,
    },
    CreateComment {
        thread: usize,
        comment_text: Option<String>,
        author: Option<String>,
    },
    FetchEvent {
        event: usize,
    },
    FetchThread {
        thread: usize,
    },
    FetchCategories,
}

/// The parts of a thread that do not depend on the server's clock or rng
fn thread_shape(t: Thread) -> (String, String, String, Vec<(String, String)>) {
    (
        t.post_text,
        t.author,
        t.category,
        t.comments
            .into_iter()
            .map(|c| (c.comment_text, c.author))
            .collect(),
    )
}

fn without_id(e: Event) -> Event {
    Event {
        id: missing_id(),
        ..e
    }
}

struct ComparativeFuzzer {
    app: Router,
    mock: MockServer,
    app_events: Vec<RecordId>,
    app_threads: Vec<RecordId>,
}

impl ComparativeFuzzer {
    fn new(store: Store) -> ComparativeFuzzer {
        ComparativeFuzzer {
            app: app(store),
            mock: MockServer::new(),
            app_events: Vec::new(),
            app_threads: Vec::new(),
        }
    }

    /// Pick the n-th thread on both sides, or an unknown id if there are none
    fn pick_thread(&self, fuzz_id: usize) -> (RecordId, RecordId) {
        match resize_int(fuzz_id, ..self.mock.test_num_threads()) {
            Some(i) => (
                self.app_threads[i].clone(),
                self.mock.test_thread_id(i).clone(),
            ),
            None => (missing_id(), missing_id()),
        }
    }

    async fn execute_fuzz_op(&mut self, op: FuzzOp) {
        match op {
            FuzzOp::CreateEvent {
                title,
                semantic_location,
                latitude,
                longitude,
                users_attending,
                start_time,
                end_time,
            } => {
                let new_event = NewEvent {
                    title,
                    semantic_location,
                    latitude: latitude.map(f64::from),
                    longitude: longitude.map(f64::from),
                    users_attending: users_attending.map(serde_json::Value::Bool),
                    start_time: start_time.map(TimeInput::Millis),
                    end_time: end_time.map(TimeInput::Millis),
                };
                let app_res: Result<Event, ApiError> =
                    run_on_app(&mut self.app, "POST", "/events", &new_event).await;
                let mock_res = self.mock.create_event(new_event);
                if let Ok(e) = &app_res {
                    assert!(RecordId::is_well_formed(e.id.as_str()), "bad id {}", e.id);
                    self.app_events.push(e.id.clone());
                }
                compare(
                    "CreateEvent",
                    app_res.map(without_id),
                    mock_res.map(without_id),
                );
            }
            FuzzOp::CreateThread {
                post_text,
                author,
                category,
                with_comments,
            } => {
                let new_thread = NewThread {
                    post_text,
                    author,
                    category,
                    comments: with_comments.then(Vec::new),
                };
                let app_res: Result<Thread, ApiError> =
                    run_on_app(&mut self.app, "POST", "/forum/threads", &new_thread).await;
                let mock_res = self.mock.create_thread(new_thread);
                if let Ok(t) = &app_res {
                    assert!(RecordId::is_well_formed(t.id.as_str()), "bad id {}", t.id);
                    self.app_threads.push(t.id.clone());
                }
                compare(
                    "CreateThread",
                    app_res.map(thread_shape),
                    mock_res.map(thread_shape),
                );
            }
            FuzzOp::CreateComment {
                thread,
                comment_text,
                author,
            } => {
                let (app_id, mock_id) = self.pick_thread(thread);
                let new_comment = NewComment {
                    comment_text,
                    author,
                };
                let app_res: Result<classmate_api::Comment, ApiError> = run_on_app(
                    &mut self.app,
                    "POST",
                    &format!("/forum/threads/{app_id}/comment"),
                    &new_comment,
                )
                .await;
                let mock_res = self.mock.create_comment(&mock_id, new_comment);
                compare(
                    "CreateComment",
                    app_res.map(|c| (c.comment_text, c.author)),
                    mock_res.map(|c| (c.comment_text, c.author)),
                );
            }
            FuzzOp::FetchEvent { event } => {
                let (app_id, mock_id) = match resize_int(event, ..self.mock.test_num_events()) {
                    Some(i) => (self.app_events[i].clone(), self.mock.test_event_id(i).clone()),
                    None => (missing_id(), missing_id()),
                };
                let app_res: Result<Event, ApiError> =
                    run_on_app(&mut self.app, "GET", &format!("/events/{app_id}"), &()).await;
                compare(
                    "FetchEvent",
                    app_res.map(without_id),
                    self.mock.fetch_event(&mock_id).map(without_id),
                );
            }
            FuzzOp::FetchThread { thread } => {
                let (app_id, mock_id) = self.pick_thread(thread);
                let app_res: Result<Thread, ApiError> = run_on_app(
                    &mut self.app,
                    "GET",
                    &format!("/forum/threads/{app_id}"),
                    &(),
                )
                .await;
                compare(
                    "FetchThread",
                    app_res.map(thread_shape),
                    self.mock.fetch_thread(&mock_id).map(thread_shape),
                );
            }
            FuzzOp::FetchCategories => {
                compare(
                    "FetchCategories",
                    run_on_app(&mut self.app, "GET", "/forum/categories", &()).await,
                    Ok(self.mock.fetch_categories()),
                );
            }
        }
    }

    async fn check_collections(&mut self) {
        let events: Vec<Event> = run_on_app(&mut self.app, "GET", "/events", &())
            .await
            .expect("listing events");
        compare(
            "FetchEvents",
            Ok(events.into_iter().map(without_id).collect::<Vec<_>>()),
            Ok(self
                .mock
                .fetch_events()
                .into_iter()
                .map(without_id)
                .collect()),
        );
        let threads: Vec<Thread> = run_on_app(&mut self.app, "GET", "/forum/threads", &())
            .await
            .expect("listing threads");
        compare(
            "FetchThreads",
            Ok(threads.into_iter().map(thread_shape).collect::<Vec<_>>()),
            Ok(self
                .mock
                .fetch_threads()
                .into_iter()
                .map(thread_shape)
                .collect()),
        );
    }
}

do_store_test!(
    compare_with_mock,
    Vec<FuzzOp>,
    |store: Store, test: Vec<FuzzOp>| async move {
        let mut fuzzer = ComparativeFuzzer::new(store);
        for op in test {
            fuzzer.execute_fuzz_op(op).await;
        }
        fuzzer.check_collections().await;
    }
);

do_store_test!(
    fuzz_thread_body,
    String,
    |store: Store, body: String| async move {
        let mut app = app(store);
        let (status, _) = raw_request(&mut app, "POST", "/forum/threads", body.into_bytes()).await;
        assert!(
            status == StatusCode::OK || status == StatusCode::BAD_REQUEST,
            "unexpected status {status}"
        );
    }
);

async fn test_app(dir: &Path) -> Router {
    app(Store::load(dir).await.expect("loading store"))
}

fn sample_event() -> serde_json::Value {
    json!({
        "title": "Study group",
        "semanticLocation": "Library, 2nd floor",
        "latitude": 47.6553,
        "longitude": -122.3035,
        "usersAttending": ["alice"],
        "startTime": "2018-03-14T18:00:00Z",
        "endTime": "2018-03-14T20:00:00Z",
    })
}

#[tokio::test]
async fn created_thread_is_listed() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = test_app(dir.path()).await;
    let created: Thread = run_on_app(
        &mut app,
        "POST",
        "/forum/threads",
        &json!({"postText": "hi", "author": "a", "category": "general", "comments": []}),
    )
    .await
    .unwrap();
    assert!(RecordId::is_well_formed(created.id.as_str()));

    let threads: Vec<Thread> = run_on_app(&mut app, "GET", "/forum/threads", &())
        .await
        .unwrap();
    assert_eq!(threads, vec![created.clone()]);
    assert_eq!(threads[0].category, "general");

    let fetched: Thread = run_on_app(
        &mut app,
        "GET",
        &format!("/forum/threads/{}", created.id),
        &(),
    )
    .await
    .unwrap();
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn created_event_is_listed() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = test_app(dir.path()).await;
    let created: Event = run_on_app(&mut app, "POST", "/events", &sample_event())
        .await
        .unwrap();
    assert!(RecordId::is_well_formed(created.id.as_str()));
    assert_eq!(created.users_attending, json!(["alice"]));

    let events: Vec<Event> = run_on_app(&mut app, "GET", "/events", &()).await.unwrap();
    assert_eq!(events, vec![created.clone()]);
    let fetched: Event = run_on_app(&mut app, "GET", &format!("/events/{}", created.id), &())
        .await
        .unwrap();
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn missing_field_does_not_mutate() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = test_app(dir.path()).await;
    let events_before = std::fs::read(dir.path().join(EVENTS_FILE)).unwrap();
    let threads_before = std::fs::read(dir.path().join(THREADS_FILE)).unwrap();

    let mut body = sample_event();
    body.as_object_mut().unwrap().remove("semanticLocation");
    let res: Result<Event, ApiError> = run_on_app(&mut app, "POST", "/events", &body).await;
    assert_eq!(
        res,
        Err(ApiError::MissingField(String::from("semanticLocation")))
    );

    let res: Result<Thread, ApiError> = run_on_app(
        &mut app,
        "POST",
        "/forum/threads",
        &json!({"postText": "hi", "author": "a", "comments": []}),
    )
    .await;
    assert_eq!(res, Err(ApiError::MissingField(String::from("category"))));

    let events: Vec<Event> = run_on_app(&mut app, "GET", "/events", &()).await.unwrap();
    assert!(events.is_empty());
    assert_eq!(
        std::fs::read(dir.path().join(EVENTS_FILE)).unwrap(),
        events_before
    );
    assert_eq!(
        std::fs::read(dir.path().join(THREADS_FILE)).unwrap(),
        threads_before
    );
}

#[tokio::test]
async fn zero_coordinate_is_a_missing_field() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = test_app(dir.path()).await;
    let mut body = sample_event();
    body["latitude"] = json!(0);
    let res: Result<Event, ApiError> = run_on_app(&mut app, "POST", "/events", &body).await;
    assert_eq!(res, Err(ApiError::MissingField(String::from("latitude"))));

    let events: Vec<Event> = run_on_app(&mut app, "GET", "/events", &()).await.unwrap();
    assert!(events.is_empty());
}

#[tokio::test]
async fn malformed_bodies_are_bad_requests() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = test_app(dir.path()).await;

    let (status, body) = raw_request(&mut app, "POST", "/events", b"{ nope".to_vec()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(matches!(
        ApiError::parse(&body).unwrap(),
        ApiError::InvalidBody(_)
    ));

    let mut event = sample_event();
    event["latitude"] = json!("north");
    let res: Result<Event, ApiError> = run_on_app(&mut app, "POST", "/events", &event).await;
    assert!(matches!(res, Err(ApiError::InvalidBody(_))), "{res:?}");
}

#[tokio::test]
async fn comment_on_unknown_thread() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = test_app(dir.path()).await;
    let threads_before = std::fs::read(dir.path().join(THREADS_FILE)).unwrap();

    let res: Result<classmate_api::Comment, ApiError> = run_on_app(
        &mut app,
        "POST",
        "/forum/threads/abcdef/comment",
        &json!({"commentText": "hello?", "author": "b"}),
    )
    .await;
    assert_eq!(res, Err(ApiError::UnknownThread(String::from("abcdef"))));
    assert_eq!(
        std::fs::read(dir.path().join(THREADS_FILE)).unwrap(),
        threads_before
    );
}

#[tokio::test]
async fn comments_are_appended_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = test_app(dir.path()).await;
    let thread: Thread = run_on_app(
        &mut app,
        "POST",
        "/forum/threads",
        &json!({"postText": "hi", "author": "a", "category": "general", "comments": []}),
    )
    .await
    .unwrap();
    for text in ["first", "second"] {
        let _: classmate_api::Comment = run_on_app(
            &mut app,
            "POST",
            &format!("/forum/threads/{}/comment", thread.id),
            &json!({"commentText": text, "author": "b"}),
        )
        .await
        .unwrap();
    }
    let fetched: Thread = run_on_app(
        &mut app,
        "GET",
        &format!("/forum/threads/{}", thread.id),
        &(),
    )
    .await
    .unwrap();
    let texts = fetched
        .comments
        .iter()
        .map(|c| c.comment_text.as_str())
        .collect::<Vec<_>>();
    assert_eq!(texts, vec!["first", "second"]);
}

#[tokio::test]
async fn categories_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = test_app(dir.path()).await;
    for category in ["b", "a", "a"] {
        let _: Thread = run_on_app(
            &mut app,
            "POST",
            "/forum/threads",
            &json!({"postText": "hi", "author": "a", "category": category, "comments": []}),
        )
        .await
        .unwrap();
    }
    let categories: Vec<String> = run_on_app(&mut app, "GET", "/forum/categories", &())
        .await
        .unwrap();
    assert_eq!(categories, vec!["a", "b"]);
}

#[tokio::test]
async fn unknown_ids_are_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = test_app(dir.path()).await;
    let res: Result<Event, ApiError> = run_on_app(&mut app, "GET", "/events/abcdef", &()).await;
    assert_eq!(res, Err(ApiError::NotFound(String::from("abcdef"))));
    let res: Result<Thread, ApiError> =
        run_on_app(&mut app, "GET", "/forum/threads/abcdef", &()).await;
    assert_eq!(res, Err(ApiError::NotFound(String::from("abcdef"))));
}

#[tokio::test]
async fn repeated_reads_are_identical() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = test_app(dir.path()).await;
    let _: Event = run_on_app(&mut app, "POST", "/events", &sample_event())
        .await
        .unwrap();
    for uri in ["/events", "/forum/threads", "/forum/categories"] {
        let first = raw_request(&mut app, "GET", uri, Vec::new()).await;
        let second = raw_request(&mut app, "GET", uri, Vec::new()).await;
        assert_eq!(first, second, "{uri}");
    }
}

#[tokio::test]
async fn restart_reloads_everything() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = test_app(dir.path()).await;
    let _: Event = run_on_app(&mut app, "POST", "/events", &sample_event())
        .await
        .unwrap();
    let thread: Thread = run_on_app(
        &mut app,
        "POST",
        "/forum/threads",
        &json!({"postText": "hi", "author": "a", "category": "general", "comments": []}),
    )
    .await
    .unwrap();
    let _: classmate_api::Comment = run_on_app(
        &mut app,
        "POST",
        &format!("/forum/threads/{}/comment", thread.id),
        &json!({"commentText": "reply", "author": "b"}),
    )
    .await
    .unwrap();
    let events_before = raw_request(&mut app, "GET", "/events", Vec::new()).await;
    let threads_before = raw_request(&mut app, "GET", "/forum/threads", Vec::new()).await;
    drop(app);

    let mut app = test_app(dir.path()).await;
    assert_eq!(
        raw_request(&mut app, "GET", "/events", Vec::new()).await,
        events_before
    );
    assert_eq!(
        raw_request(&mut app, "GET", "/forum/threads", Vec::new()).await,
        threads_before
    );
}

#[tokio::test]
async fn failed_write_is_a_server_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut app = test_app(dir.path()).await;
    std::fs::create_dir(dir.path().join("events.json.tmp")).unwrap();

    let (status, _) = raw_request(
        &mut app,
        "POST",
        "/events",
        serde_json::to_vec(&sample_event()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let events: Vec<Event> = run_on_app(&mut app, "GET", "/events", &()).await.unwrap();
    assert!(events.is_empty());
    assert_eq!(
        std::fs::read_to_string(dir.path().join(EVENTS_FILE)).unwrap(),
        "[]"
    );
}
