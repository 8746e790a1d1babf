//! End-to-end tests through the full API pipeline

use sleepy::prelude::*;
use sleepy::{Completion, CompletionLogger, TestClient, TestRequest};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Model)]
#[serde(default)]
struct Item {
    #[sleepy(readonly)]
    id: String,
    #[sleepy(required)]
    name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Model)]
#[serde(default)]
struct Credentials {
    name: String,
    #[sleepy(writeonly)]
    password: String,
}

/// One logged completion
#[derive(Debug, Clone, PartialEq)]
struct Entry {
    method: String,
    path: String,
    status: StatusCode,
    kind: Option<ErrorKind>,
    message: Option<String>,
}

#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<Entry>>>);

impl CompletionLogger for Recorder {
    fn record(&self, c: &Completion<'_>) {
        self.0.lock().unwrap().push(Entry {
            method: c.method.to_string(),
            path: c.path.to_string(),
            status: c.status,
            kind: c.error.map(ApiError::kind),
            message: c.error.map(|e| e.message().to_string()),
        });
    }
}

impl Recorder {
    fn entries(&self) -> Vec<Entry> {
        self.0.lock().unwrap().clone()
    }
}

/// Counts handler invocations and remembers the last decoded item
#[derive(Clone, Default)]
struct Seen {
    calls: Arc<AtomicUsize>,
    last: Arc<Mutex<Option<Item>>>,
}

fn items(seen: &Seen) -> Resource {
    let mut items = Resource::new("/items");

    let handler_seen = seen.clone();
    items
        .route("")
        .method(Method::POST)
        .to(move |_req: Request, mut data: CallData| {
            let seen = handler_seen.clone();
            async move {
                seen.calls.fetch_add(1, Ordering::SeqCst);
                let item = data
                    .take_body::<Item>()
                    .ok_or_else(|| ApiError::internal("decoded body missing"))?;
                *seen.last.lock().unwrap() = Some(item.clone());
                Ok::<_, ApiError>(Item {
                    id: "generated".into(),
                    ..item
                })
            }
        })
        .operation_name("createItem")
        .reads::<Item>()
        .returns::<Item>();

    items
        .route("/{id}")
        .method(Method::GET)
        .to(|req: Request, _data: CallData| async move {
            Ok::<_, ApiError>(Item {
                id: req.path_param("id").unwrap_or_default().to_string(),
                name: "widget".into(),
            })
        })
        .operation_name("getItem")
        .path_param("id", "Item id")
        .returns::<Item>();

    items
}

fn client(config: ApiConfig, seen: &Seen, recorder: &Recorder) -> TestClient {
    let mut api = Api::with_config(config).with_logger(recorder.clone());
    api.register(items(seen)).unwrap();
    TestClient::new(api)
}

#[tokio::test]
async fn scenario_a_valid_body_reaches_handler() {
    let (seen, recorder) = (Seen::default(), Recorder::default());
    let client = client(ApiConfig::default(), &seen, &recorder);

    let response = client
        .post_json("/items", &serde_json::json!({"name": "x"}))
        .await;

    response.assert_status(StatusCode::OK).assert_json(&Item {
        id: "generated".into(),
        name: "x".into(),
    });
    assert_eq!(
        *seen.last.lock().unwrap(),
        Some(Item {
            id: String::new(),
            name: "x".into()
        })
    );
    assert_eq!(recorder.entries().len(), 1);
    assert_eq!(recorder.entries()[0].kind, None);
}

#[tokio::test]
async fn scenario_b_missing_required_is_reported_first() {
    let (seen, recorder) = (Seen::default(), Recorder::default());
    let client = client(ApiConfig::default(), &seen, &recorder);

    let response = client
        .post_json("/items", &serde_json::json!({"id": "123"}))
        .await;

    response
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY)
        .assert_json(&serde_json::json!({
            "message": "Required field: name is missing.",
            "code": 1002
        }));
    assert_eq!(seen.calls.load(Ordering::SeqCst), 0);
    assert_eq!(
        recorder.entries(),
        vec![Entry {
            method: "POST".into(),
            path: "/items".into(),
            status: StatusCode::UNPROCESSABLE_ENTITY,
            kind: Some(ErrorKind::FieldMissing),
            message: Some("Required field: name is missing.".into()),
        }]
    );
}

#[tokio::test]
async fn read_only_field_is_rejected() {
    let (seen, recorder) = (Seen::default(), Recorder::default());
    let client = client(ApiConfig::default(), &seen, &recorder);

    client
        .post_json("/items", &serde_json::json!({"id": "123", "name": "x"}))
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY)
        .assert_error_code(1003);
    assert_eq!(seen.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn malformed_body_is_a_bad_request() {
    let (seen, recorder) = (Seen::default(), Recorder::default());
    let client = client(ApiConfig::default(), &seen, &recorder);

    let response = client
        .request(TestRequest::post("/items").body("{not json"))
        .await;
    response
        .assert_status(StatusCode::BAD_REQUEST)
        .assert_json(&serde_json::json!({
            "message": "Could not parse the request.",
            "code": 1001
        }));
    assert_eq!(seen.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn scenario_c_write_only_fields_never_reach_the_wire() {
    let mut auth = Resource::new("/auth");
    auth.route("/me")
        .method(Method::GET)
        .to(|_req: Request, _data: CallData| async {
            Ok::<_, ApiError>(Credentials {
                name: "a".into(),
                password: "secret".into(),
            })
        })
        .returns::<Credentials>();

    let mut api = Api::new();
    api.register(auth).unwrap();
    let response = TestClient::new(api).get("/auth/me").await;

    response
        .assert_status(StatusCode::OK)
        .assert_header("content-type", "application/json")
        .assert_json(&serde_json::json!({"name": "a", "password": ""}));
    assert!(!response.text().contains("secret"));
}

#[tokio::test]
async fn filters_short_circuit_in_order() {
    let recorder = Recorder::default();
    let second = Arc::new(AtomicUsize::new(0));
    let handler = Arc::new(AtomicUsize::new(0));

    let mut guarded = Resource::new("/guarded");
    let second_seen = second.clone();
    let handler_seen = handler.clone();
    guarded
        .route("")
        .method(Method::GET)
        .filter(|_, _| Err(ApiError::forbidden("Unauthorized request.")))
        .filter(move |_, _| {
            second_seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .to(move |_req: Request, _data: CallData| {
            let handler = handler_seen.clone();
            async move {
                handler.fetch_add(1, Ordering::SeqCst);
                Ok::<_, ApiError>("unreachable".to_string())
            }
        });

    let mut api = Api::new().with_logger(recorder.clone());
    api.register(guarded).unwrap();

    TestClient::new(api)
        .get("/guarded")
        .await
        .assert_status(StatusCode::FORBIDDEN)
        .assert_error_code(1005);

    assert_eq!(second.load(Ordering::SeqCst), 0);
    assert_eq!(handler.load(Ordering::SeqCst), 0);
    let entries = recorder.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].kind, Some(ErrorKind::Forbidden));
    assert_eq!(entries[0].message.as_deref(), Some("Unauthorized request."));
}

#[tokio::test]
async fn filter_levels_run_api_then_resource_then_call() {
    #[derive(Clone, Default)]
    struct Trail(Vec<&'static str>);

    fn mark(level: &'static str) -> impl Fn(&Request, &mut CallData) -> Result<()> {
        move |_req: &Request, data: &mut CallData| {
            let mut trail = data.remove::<Trail>().unwrap_or_default();
            trail.0.push(level);
            data.insert(trail);
            Ok(())
        }
    }

    let mut res = Resource::new("/trail");
    res.filter(mark("resource"));
    res.route("")
        .method(Method::GET)
        .filter(mark("call"))
        .to(|_req: Request, data: CallData| async move {
            Ok::<_, ApiError>(data.get::<Trail>().map(|t| t.0.join(">")).unwrap_or_default())
        });

    let mut api = Api::new();
    api.filter(mark("api"));
    api.register(res).unwrap();

    TestClient::new(api)
        .get("/trail")
        .await
        .assert_status(StatusCode::OK)
        .assert_json(&"api>resource>call".to_string());
}

#[tokio::test]
async fn preflight_is_answered_after_api_filters() {
    let (seen, recorder) = (Seen::default(), Recorder::default());
    let config = ApiConfig::default().cors(CorsConfig::permissive());
    let mut api = Api::with_config(config).with_logger(recorder.clone());
    api.filter(|req, _| {
        if req.header("x-blocked").is_some() {
            return Err(ApiError::forbidden("Blocked."));
        }
        Ok(())
    });
    api.register(items(&seen)).unwrap();
    let client = TestClient::new(api);

    client
        .options("/items")
        .await
        .assert_status(StatusCode::OK)
        .assert_header("access-control-allow-methods", "POST")
        .assert_header("access-control-allow-origin", "*");

    client
        .request(TestRequest::options("/items").header("x-blocked", "1"))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    assert_eq!(seen.calls.load(Ordering::SeqCst), 0);
    let entries = recorder.entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].status, StatusCode::OK);
    assert_eq!(entries[1].kind, Some(ErrorKind::Forbidden));
}

#[tokio::test]
async fn routing_errors() {
    let (seen, recorder) = (Seen::default(), Recorder::default());
    let client = client(ApiConfig::default().base_path("/v2"), &seen, &recorder);

    client
        .get("/v2/items/7")
        .await
        .assert_status(StatusCode::OK)
        .assert_json(&Item {
            id: "7".into(),
            name: "widget".into(),
        });

    client
        .get("/items/7")
        .await
        .assert_status(StatusCode::NOT_FOUND)
        .assert_error_code(1006);

    client
        .request(TestRequest::delete("/v2/items/7"))
        .await
        .assert_status(StatusCode::METHOD_NOT_ALLOWED)
        .assert_header("allow", "GET")
        .assert_error_code(1007);

    assert_eq!(recorder.entries().len(), 3);
}

#[tokio::test]
async fn required_query_variable() {
    let mut search = Resource::new("/search");
    search
        .route("")
        .method(Method::GET)
        .query_var("q", "Search terms", true)
        .query_var("page", "Page number", false)
        .to(|req: Request, _data: CallData| async move {
            Ok::<_, ApiError>(req.query("q").unwrap_or_default().to_string())
        });

    let mut api = Api::new();
    api.register(search).unwrap();
    let client = TestClient::new(api);

    client
        .get("/search")
        .await
        .assert_status(StatusCode::UNPROCESSABLE_ENTITY)
        .assert_json(&serde_json::json!({
            "message": "Required query variable: q is missing.",
            "code": 1002
        }));

    client
        .get("/search?q=rust%20web")
        .await
        .assert_status(StatusCode::OK)
        .assert_json(&"rust web".to_string());
}

#[tokio::test]
async fn handler_without_result_is_an_internal_fault() {
    let recorder = Recorder::default();
    let mut broken = Resource::new("/broken");
    broken
        .route("")
        .method(Method::GET)
        .operation_name("broken")
        .to(|_req: Request, _data: CallData| async { Ok::<_, ApiError>(Reply::empty()) });

    let mut api = Api::new().with_logger(recorder.clone());
    api.register(broken).unwrap();

    TestClient::new(api)
        .get("/broken")
        .await
        .assert_status(StatusCode::INTERNAL_SERVER_ERROR)
        .assert_json(&serde_json::json!({"message": "Server error.", "code": 1000}));

    assert_eq!(recorder.entries()[0].kind, Some(ErrorKind::InternalFault));
}

#[tokio::test]
async fn custom_errors_keep_their_status_and_code() {
    let mut teapot = Resource::new("/teapot");
    teapot
        .route("")
        .method(Method::GET)
        .to(|_req: Request, _data: CallData| async {
            Err::<String, _>(ApiError::new(StatusCode::IM_A_TEAPOT, 4180, "Short and stout."))
        });

    let mut api = Api::new();
    api.register(teapot).unwrap();

    TestClient::new(api)
        .get("/teapot")
        .await
        .assert_status(StatusCode::IM_A_TEAPOT)
        .assert_json(&serde_json::json!({"message": "Short and stout.", "code": 4180}));
}

#[test]
fn body_schema_on_get_fails_registration() {
    let mut bad = Resource::new("/bad");
    bad.route("")
        .reads::<Item>()
        .method(Method::GET)
        .to(|_req: Request, _data: CallData| async { Ok::<_, ApiError>(Item::default()) });

    let err = Api::new().register(bad).unwrap_err();
    assert_eq!(
        err,
        RegistrationError::BodyOnBodylessMethod {
            path: "/bad".into(),
            method: "GET".into(),
        }
    );
}

#[test]
fn undeclared_path_param_fails_registration() {
    let mut bad = Resource::new("/bad");
    bad.route("/{id}")
        .method(Method::GET)
        .path_param("uid", "Not in the path")
        .to(|_req: Request, _data: CallData| async { Ok::<_, ApiError>(Item::default()) });

    let err = Api::new().register(bad).unwrap_err();
    assert!(matches!(err, RegistrationError::UnknownPathParam { name, .. } if name == "uid"));
}

#[test]
fn docs_describe_registered_calls() {
    let (seen, recorder) = (Seen::default(), Recorder::default());
    let client = client(ApiConfig::default(), &seen, &recorder);
    let docs = client.api().docs();

    let create = docs.call("createItem").unwrap();
    assert_eq!(create.method, "POST");
    assert_eq!(create.path, "/items");
    let reads = create.reads.as_ref().unwrap();
    assert_eq!(reads.name, "Item");
    assert!(reads.fields.iter().any(|f| f.name == "id" && f.read_only));

    let json = serde_json::to_value(&docs).unwrap();
    assert_eq!(json["calls"][1]["operation_name"], "getItem");
    assert!(json["calls"][1].get("reads").is_none());
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Model)]
#[serde(default)]
struct Signup {
    #[sleepy(required)]
    name: String,
    #[sleepy(required, writeonly, hidden)]
    password: String,
}

#[test]
fn hidden_fields_stay_in_request_docs() {
    let mut signups = Resource::new("/signups");
    signups
        .route("")
        .method(Method::POST)
        .operation_name("signup")
        .reads::<Signup>()
        .returns::<Signup>()
        .to(|_req: Request, mut data: CallData| async move {
            data.take_body::<Signup>()
                .ok_or_else(|| ApiError::internal("decoded body missing"))
        });

    let mut api = Api::new();
    api.register(signups).unwrap();
    let docs = api.docs();
    let call = docs.call("signup").unwrap();

    let reads: Vec<&str> = call.reads.as_ref().unwrap().fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(reads, vec!["name", "password"]);

    let returns: Vec<&str> = call.returns.as_ref().unwrap().fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(returns, vec!["name"]);
}
