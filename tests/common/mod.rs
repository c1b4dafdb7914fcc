//! In-process mock of the remote cardwallet API for integration tests.
//!
//! Binds an ephemeral port, records every request as "METHOD /path", and
//! serves canned fixtures from a shared state the test can inspect and
//! mutate (seed cards, force a card kind to fail, reject invites with a
//! structured validation body).

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Json, Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use parking_lot::Mutex;
use serde_json::{Value, json};

type Shared = Arc<Mutex<ServerState>>;

#[derive(Default)]
pub struct ServerState {
    pub requests: Vec<String>,
    /// Card kinds whose list endpoint answers 500.
    pub failing: HashSet<String>,
    pub cards: HashMap<String, Vec<Value>>,
    pub groups: Vec<Value>,
    pub invitations: Vec<Value>,
    pub valid_refresh: Option<String>,
    pub serial: u64,
    pub refresh_calls: u64,
    /// When set, invites answer 400 with this non-field error.
    pub invite_rejection: Option<String>,
    pub respond_fails: bool,
    pub update_fails: bool,
    pub delete_fails: bool,
    pub invitations_fail: bool,
    /// Per-endpoint artificial latency in milliseconds, keyed by a card kind
    /// or by "groups" / "group_detail". Read at request arrival.
    pub delays_ms: HashMap<String, u64>,
}

impl ServerState {
    fn issue_pair(&mut self) -> Value {
        self.serial += 1;
        let access = make_jwt(1, 4_000_000_000 + self.serial as i64);
        let refresh = format!("refresh-{}", self.serial);
        self.valid_refresh = Some(refresh.clone());
        json!({"access": access, "refresh": refresh})
    }
}

/// Unsigned compact JWT with the claims shape the client decodes.
pub fn make_jwt(user_id: i64, exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload =
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(&json!({"user_id": user_id, "exp": exp})).unwrap());
    format!("{header}.{payload}.sig")
}

pub struct MockServer {
    pub addr: SocketAddr,
    pub state: Shared,
}

impl MockServer {
    pub async fn spawn() -> MockServer {
        let state: Shared = Arc::new(Mutex::new(ServerState::default()));
        let app = Router::new()
            .route("/api/token/", post(login))
            .route("/api/token/refresh/", post(refresh))
            .route("/api/signup/", post(signup))
            .route("/api/b2b/register/", post(register_company))
            .route("/api/groups/", get(list_groups).post(create_group))
            .route("/api/groups/{id}/", get(group_detail))
            .route("/api/groups/add_cards/{id}/", post(add_cards))
            .route("/api/invitations/", get(list_invitations))
            .route("/api/invitations/{gid}/", post(send_invitation))
            .route("/api/invitations/{id}/{action}/", post(respond_invitation))
            .route("/api/{kind}/", get(list_cards))
            .route("/api/{kind}/base64/", post(upload_card))
            .route("/api/{kind}/{id}/", put(update_card).delete(delete_card))
            .route("/api/{kind}/{id}/{gid}/", axum::routing::delete(delete_card_in_group))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        MockServer { addr, state }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<String> {
        self.state.lock().requests.clone()
    }

    pub fn count(&self, line: &str) -> usize {
        self.state.lock().requests.iter().filter(|r| r.as_str() == line).count()
    }

    pub fn seed_cards(&self, kind: &str, cards: Vec<Value>) {
        self.state.lock().cards.insert(kind.to_string(), cards);
    }

    pub fn fail_kind(&self, kind: &str) {
        self.state.lock().failing.insert(kind.to_string());
    }

    pub fn seed_groups(&self, groups: Vec<Value>) {
        self.state.lock().groups = groups;
    }

    pub fn seed_invitations(&self, invitations: Vec<Value>) {
        self.state.lock().invitations = invitations;
    }

    pub fn set_delay(&self, key: &str, ms: u64) {
        self.state.lock().delays_ms.insert(key.to_string(), ms);
    }

    pub fn clear_delay(&self, key: &str) {
        self.state.lock().delays_ms.remove(key);
    }
}

async fn apply_delay(state: &Shared, key: &str) {
    let ms = state.lock().delays_ms.get(key).copied();
    if let Some(ms) = ms {
        tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
    }
}

fn record(state: &Shared, line: String) {
    state.lock().requests.push(line);
}

async fn login(State(s): State<Shared>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    record(&s, "POST /api/token/".into());
    if body["email"] == "a@b.com" && body["password"] == "secret" {
        let pair = s.lock().issue_pair();
        (StatusCode::OK, Json(pair))
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "No active account found with the given credentials"})),
        )
    }
}

async fn refresh(State(s): State<Shared>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    record(&s, "POST /api/token/refresh/".into());
    let mut st = s.lock();
    st.refresh_calls += 1;
    let presented = body["refresh"].as_str().unwrap_or_default().to_string();
    if st.valid_refresh.as_deref() == Some(presented.as_str()) {
        let pair = st.issue_pair();
        (StatusCode::OK, Json(pair))
    } else {
        (StatusCode::UNAUTHORIZED, Json(json!({"detail": "Token is invalid or expired"})))
    }
}

async fn signup(State(s): State<Shared>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    record(&s, "POST /api/signup/".into());
    if body["email"].as_str().unwrap_or_default().is_empty() {
        return (StatusCode::BAD_REQUEST, Json(json!({"detail": "email required"})));
    }
    let pair = s.lock().issue_pair();
    (StatusCode::CREATED, Json(pair))
}

async fn register_company(State(s): State<Shared>, Json(_): Json<Value>) -> (StatusCode, Json<Value>) {
    record(&s, "POST /api/b2b/register/".into());
    (StatusCode::CREATED, Json(json!({"apiKey": "cw-test-key"})))
}

async fn list_cards(State(s): State<Shared>, Path(kind): Path<String>) -> (StatusCode, Json<Value>) {
    record(&s, format!("GET /api/{}/", kind));
    apply_delay(&s, &kind).await;
    let st = s.lock();
    if st.failing.contains(&kind) {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"detail": "server error"})));
    }
    let cards = st.cards.get(&kind).cloned().unwrap_or_default();
    (StatusCode::OK, Json(Value::Array(cards)))
}

async fn update_card(
    State(s): State<Shared>,
    Path((kind, id)): Path<(String, i64)>,
    Json(_): Json<Value>,
) -> (StatusCode, Json<Value>) {
    record(&s, format!("PUT /api/{}/{}/", kind, id));
    if s.lock().update_fails {
        return (StatusCode::BAD_REQUEST, Json(json!({"detail": "invalid card data"})));
    }
    (StatusCode::OK, Json(json!({})))
}

async fn delete_card(
    State(s): State<Shared>,
    Path((kind, id)): Path<(String, i64)>,
) -> (StatusCode, Json<Value>) {
    record(&s, format!("DELETE /api/{}/{}/", kind, id));
    if s.lock().delete_fails {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"detail": "server error"})));
    }
    (StatusCode::OK, Json(json!({})))
}

async fn delete_card_in_group(
    State(s): State<Shared>,
    Path((kind, id, gid)): Path<(String, i64, i64)>,
) -> (StatusCode, Json<Value>) {
    record(&s, format!("DELETE /api/{}/{}/{}/", kind, id, gid));
    (StatusCode::OK, Json(json!({})))
}

async fn upload_card(
    State(s): State<Shared>,
    Path(kind): Path<String>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    record(&s, format!("POST /api/{}/base64/", kind));
    if body.get("imageFront").and_then(|v| v.as_str()).unwrap_or_default().is_empty() {
        return (StatusCode::BAD_REQUEST, Json(json!({"detail": "imageFront required"})));
    }
    (StatusCode::OK, Json(json!({})))
}

async fn list_groups(State(s): State<Shared>) -> (StatusCode, Json<Value>) {
    record(&s, "GET /api/groups/".into());
    apply_delay(&s, "groups").await;
    let groups = s.lock().groups.clone();
    (StatusCode::OK, Json(Value::Array(groups)))
}

async fn create_group(State(s): State<Shared>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    record(&s, "POST /api/groups/".into());
    let name = body["name"].as_str().unwrap_or_default().to_string();
    if name.is_empty() {
        return (StatusCode::BAD_REQUEST, Json(json!({"detail": "name required"})));
    }
    let mut st = s.lock();
    let id = st.groups.len() as i64 + 1;
    let group = group_json(id, &name);
    st.groups.push(group.clone());
    (StatusCode::CREATED, Json(group))
}

async fn group_detail(State(s): State<Shared>, Path(id): Path<i64>) -> (StatusCode, Json<Value>) {
    record(&s, format!("GET /api/groups/{}/", id));
    apply_delay(&s, "group_detail").await;
    let st = s.lock();
    match st.groups.iter().find(|g| g["id"] == id) {
        Some(g) => (StatusCode::OK, Json(g.clone())),
        None => (StatusCode::NOT_FOUND, Json(json!({"detail": "Not found."}))),
    }
}

async fn add_cards(
    State(s): State<Shared>,
    Path(id): Path<i64>,
    Json(_): Json<Value>,
) -> (StatusCode, Json<Value>) {
    record(&s, format!("POST /api/groups/add_cards/{}/", id));
    (StatusCode::OK, Json(json!({})))
}

async fn list_invitations(State(s): State<Shared>) -> (StatusCode, Json<Value>) {
    record(&s, "GET /api/invitations/".into());
    let st = s.lock();
    if st.invitations_fail {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"detail": "server error"})));
    }
    (StatusCode::OK, Json(Value::Array(st.invitations.clone())))
}

async fn send_invitation(
    State(s): State<Shared>,
    Path(gid): Path<i64>,
    Json(_): Json<Value>,
) -> (StatusCode, Json<Value>) {
    record(&s, format!("POST /api/invitations/{}/", gid));
    let st = s.lock();
    if let Some(msg) = &st.invite_rejection {
        return (StatusCode::BAD_REQUEST, Json(json!({"non_field_errors": [msg]})));
    }
    (StatusCode::CREATED, Json(json!({})))
}

async fn respond_invitation(
    State(s): State<Shared>,
    Path((id, action)): Path<(i64, String)>,
) -> (StatusCode, Json<Value>) {
    record(&s, format!("POST /api/invitations/{}/{}/", id, action));
    let mut st = s.lock();
    if st.respond_fails {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"detail": "server error"})));
    }
    st.invitations.retain(|inv| inv["id"] != id);
    (StatusCode::OK, Json(json!({})))
}

// --- fixtures -----------------------------------------------------------

pub fn user_json(id: i64) -> Value {
    json!({
        "id": id,
        "username": format!("user{id}"),
        "first_name": format!("First{id}"),
        "last_name": format!("Last{id}"),
        "email": format!("user{id}@example.com")
    })
}

pub fn id_card_json(id: i64, owner: i64) -> Value {
    json!({
        "id": id,
        "image_front_url": null,
        "image_back_url": null,
        "user": user_json(owner),
        "name": format!("Holder {id}"),
        "sex": "male",
        "nationality": "HU",
        "birthDate": "1990-01-01",
        "expiryDate": "2031-01-01",
        "identifier": format!("ID-{id}"),
        "can": "123456",
        "mothersName": "Jane Roe",
        "birthPlace": "Budapest"
    })
}

pub fn student_card_json(id: i64, owner: i64) -> Value {
    json!({
        "id": id,
        "image_front_url": null,
        "image_back_url": null,
        "user": user_json(owner),
        "name": format!("Student {id}"),
        "cardNumber": format!("SC-{id}"),
        "expiryDate": "2027-09-01",
        "birthDate": "2001-03-03",
        "issueDate": "2023-09-01",
        "OMNUmber": format!("OM-{id}"),
        "school": "ELTE",
        "address": "Budapest",
        "placeOfBirth": "Szeged"
    })
}

pub fn health_card_json(id: i64, owner: i64) -> Value {
    json!({
        "id": id,
        "image_front_url": null,
        "user": user_json(owner),
        "name": format!("Patient {id}"),
        "birthDate": "1985-05-05",
        "issueDate": "2020-01-01",
        "cardNumber": format!("HC-{id}")
    })
}

pub fn group_json(id: i64, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "createdAt": "2024-05-01T10:00:00Z",
        "createdBy": user_json(1),
        "users": [user_json(1), user_json(2)],
        "idCards": [],
        "studentCards": [],
        "healthCareCards": []
    })
}

pub fn invitation_json(id: i64, group_id: i64) -> Value {
    json!({
        "id": id,
        "sender": user_json(2),
        "receiver": user_json(1),
        "group": group_json(group_id, "shared")
    })
}
