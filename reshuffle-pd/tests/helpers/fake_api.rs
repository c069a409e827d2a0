//! Fake Spotify Web API
//!
//! Serves a fixed library on an ephemeral port. Listings are split across
//! pages with absolute `next` links, and every playlist write is recorded.

#![allow(dead_code)]

use axum::extract::{Path, Query, Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

pub const TOKEN: &str = "test-token";

/// One PUT or POST against a playlist's tracks
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedWrite {
    pub method: String,
    pub playlist_id: String,
    pub uris: Vec<String>,
}

struct ApiState {
    base_url: String,
    requests: AtomicUsize,
    writes: Mutex<Vec<RecordedWrite>>,
    created: Mutex<Vec<Value>>,
}

/// Running fake API; the server task lives as long as the test runtime
pub struct FakeApi {
    pub base_url: String,
    state: Arc<ApiState>,
}

impl FakeApi {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}/v1", listener.local_addr().unwrap());

        let state = Arc::new(ApiState {
            base_url: base_url.clone(),
            requests: AtomicUsize::new(0),
            writes: Mutex::new(Vec::new()),
            created: Mutex::new(Vec::new()),
        });

        let api = Router::new()
            .route("/me", get(me))
            .route("/me/playlists", get(my_playlists))
            .route("/playlists/:id", get(playlist_info))
            .route(
                "/playlists/:id/tracks",
                get(playlist_tracks).put(replace_tracks).post(add_tracks),
            )
            .route("/users/:user/playlists", post(create_playlist))
            .layer(middleware::from_fn_with_state(state.clone(), require_token))
            .with_state(state.clone());
        let router = Router::new().nest("/v1", api);

        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self { base_url, state }
    }

    pub fn request_count(&self) -> usize {
        self.state.requests.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> Vec<RecordedWrite> {
        self.state.writes.lock().unwrap().clone()
    }

    pub fn created_playlists(&self) -> Vec<Value> {
        self.state.created.lock().unwrap().clone()
    }
}

async fn require_token(State(state): State<Arc<ApiState>>, request: Request, next: Next) -> Response {
    state.requests.fetch_add(1, Ordering::SeqCst);

    let expected = format!("Bearer {}", TOKEN);
    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        == Some(expected.as_str());

    if !authorized {
        return (StatusCode::UNAUTHORIZED, "invalid access token").into_response();
    }
    next.run(request).await
}

async fn me() -> Json<Value> {
    Json(json!({ "id": "me", "display_name": "Me" }))
}

/// Two pages: the second holds the playlist later used as the destination
async fn my_playlists(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<HashMap<String, String>>,
) -> Json<Value> {
    if query.get("page").map(String::as_str) == Some("2") {
        return Json(json!({
            "items": [
                { "id": "p2", "name": "Two", "owner": { "id": "me" } },
                { "id": "target", "name": "Reshuffled", "owner": { "id": "me" } }
            ],
            "next": null
        }));
    }

    Json(json!({
        "items": [
            { "id": "p1", "name": "One", "owner": { "id": "me" } },
            { "id": "shared", "name": "Followed", "owner": { "id": "friend" } }
        ],
        "next": format!("{}/me/playlists?limit=50&page=2", state.base_url)
    }))
}

async fn playlist_info(Path(id): Path<String>) -> Result<Json<Value>, StatusCode> {
    match id.as_str() {
        "p1" | "p2" | "shared" | "target" | "odd" => Ok(Json(json!({ "id": id, "name": "Reshuffled" }))),
        _ => Err(StatusCode::NOT_FOUND),
    }
}

async fn playlist_tracks(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Json<Value>, StatusCode> {
    let second_page = query.get("page").map(String::as_str) == Some("2");

    let page = match (id.as_str(), second_page) {
        ("p1", false) => json!({
            "items": [
                { "added_at": "2024-01-01T00:00:00Z", "track": { "id": "A", "name": "Alpha", "is_local": false } },
                { "added_at": "2024-01-02T00:00:00Z", "track": { "id": null, "name": "home.mp3", "is_local": true } }
            ],
            "next": format!("{}/playlists/p1/tracks?limit=100&page=2", state.base_url)
        }),
        ("p1", true) => json!({
            "items": [
                { "added_at": "2024-02-01T00:00:00Z", "track": { "id": "B", "name": "Beta", "is_local": false } }
            ],
            "next": null
        }),
        ("p2", _) => json!({
            "items": [
                { "added_at": "2024-03-01T00:00:00Z", "track": { "id": "A", "name": "Alpha", "is_local": false } },
                { "added_at": "2024-03-02T00:00:00Z", "track": null }
            ],
            "next": null
        }),
        ("shared", _) => json!({
            "items": [{ "added_at": "2024-03-05T00:00:00Z", "track": { "id": "F", "name": "Foreign" } }],
            "next": null
        }),
        ("target", _) => json!({
            "items": [{ "added_at": "2024-03-06T00:00:00Z", "track": { "id": "T", "name": "Old pick" } }],
            "next": null
        }),
        // Not listed under /me/playlists; timestamps of the wrong JSON type
        ("odd", _) => json!({
            "items": [
                { "added_at": 1700000000, "track": { "id": "N", "name": "Numeric" } },
                { "added_at": {}, "track": { "id": "O", "name": "Object" } },
                { "added_at": "2024-04-01T00:00:00Z", "track": { "id": "A", "name": "Alpha" } }
            ],
            "next": null
        }),
        _ => return Err(StatusCode::NOT_FOUND),
    };

    Ok(Json(page))
}

fn record_write(state: &ApiState, method: &str, playlist_id: String, body: &Value) {
    let uris = body["uris"]
        .as_array()
        .map(|uris| uris.iter().filter_map(|u| u.as_str().map(str::to_owned)).collect())
        .unwrap_or_default();

    state.writes.lock().unwrap().push(RecordedWrite {
        method: method.to_string(),
        playlist_id,
        uris,
    });
}

async fn replace_tracks(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    record_write(&state, "PUT", id, &body);
    (StatusCode::OK, Json(json!({ "snapshot_id": "snap" })))
}

async fn add_tracks(
    State(state): State<Arc<ApiState>>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    record_write(&state, "POST", id, &body);
    (StatusCode::CREATED, Json(json!({ "snapshot_id": "snap" })))
}

async fn create_playlist(
    State(state): State<Arc<ApiState>>,
    Path(user): Path<String>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let mut created = state.created.lock().unwrap();
    created.push(json!({ "user": user, "body": body }));
    let id = format!("new-{}", created.len());
    (StatusCode::CREATED, Json(json!({ "id": id, "name": body["name"] })))
}
