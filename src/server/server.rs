use anyhow::Result;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use crate::engagement::{
    EngagementError, EngagementManager, PlatformStore, SortDirection, TargetKind, TargetRef,
    ToggleOutcome, VideoSortField,
};

use axum::{
    extract::{Path, Query, State},
    middleware,
    routing::{delete, get, patch, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::metrics::{record_toggle, run_metrics_server, WATCH_EVENTS_TOTAL};
use super::response::ApiSuccess;
use super::session::Session;
use super::state::*;
use super::{log_requests, RequestsLoggingLevel, ServerConfig};

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub user_id: Option<usize>,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

#[derive(Deserialize, Debug)]
struct PageQuery {
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Deserialize, Debug)]
struct UserVideosQuery {
    pub owner_id: usize,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_dir: Option<String>,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Deserialize, Debug)]
struct CreateCommentBody {
    pub content: String,
    pub parent_id: Option<String>,
}

#[derive(Deserialize, Debug)]
struct UpdateCommentBody {
    pub content: String,
}

#[derive(Deserialize, Debug)]
struct RecordWatchBody {
    pub video_id: String,
    pub watch_duration: Option<f64>,
}

#[derive(Deserialize, Debug)]
struct CreatePlaylistBody {
    pub title: String,
    pub description: String,
    pub is_public: Option<bool>,
}

#[derive(Deserialize, Debug)]
struct UpdatePlaylistBody {
    pub title: String,
    pub description: String,
}

fn parse_target_kind(kind: &str) -> Result<TargetKind, EngagementError> {
    match kind {
        "video" => Ok(TargetKind::Video),
        "tweet" => Ok(TargetKind::Tweet),
        "comment" => Ok(TargetKind::Comment),
        _ => Err(EngagementError::validation("Unknown target kind.")),
    }
}

fn parse_comment_target_kind(kind: &str) -> Result<TargetKind, EngagementError> {
    match parse_target_kind(kind)? {
        TargetKind::Comment => Err(EngagementError::validation(
            "Comments cannot target other comments.",
        )),
        kind => Ok(kind),
    }
}

async fn home(session: Option<Session>, State(state): State<ServerState>) -> impl axum::response::IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        user_id: session.map(|s| s.user_id),
    };
    Json(stats)
}

// =============================================================================
// Feed & videos
// =============================================================================

async fn get_feed(
    session: Option<Session>,
    State(manager): State<GuardedEngagementManager>,
    Query(query): Query<PageQuery>,
) -> Result<ApiSuccess<impl Serialize>, EngagementError> {
    let page = manager.get_feed(
        session.map(|s| s.user_id),
        query.page.unwrap_or(1),
        query.limit.unwrap_or(10),
    )?;
    Ok(ApiSuccess::ok(page, "Videos fetched successfully."))
}

async fn get_user_videos(
    session: Session,
    State(manager): State<GuardedEngagementManager>,
    Query(query): Query<UserVideosQuery>,
) -> Result<ApiSuccess<impl Serialize>, EngagementError> {
    let sort_field = match query.sort_by.as_deref() {
        None => VideoSortField::Created,
        Some(s) => VideoSortField::parse(s)
            .ok_or_else(|| EngagementError::validation("Unknown sort field."))?,
    };
    let sort_dir = match query.sort_dir.as_deref() {
        None => SortDirection::Desc,
        Some(s) => SortDirection::parse(s)
            .ok_or_else(|| EngagementError::validation("Unknown sort direction."))?,
    };

    let page = manager.get_user_videos(
        query.owner_id,
        Some(session.user_id),
        query.search.as_deref(),
        sort_field,
        sort_dir,
        query.page.unwrap_or(1),
        query.limit.unwrap_or(10),
    )?;
    Ok(ApiSuccess::ok(page, "All videos fetched successfully."))
}

async fn get_video_by_id(
    _session: Session,
    State(manager): State<GuardedEngagementManager>,
    Path(video_id): Path<String>,
) -> Result<ApiSuccess<impl Serialize>, EngagementError> {
    let video = manager.get_video(&video_id)?;
    Ok(ApiSuccess::ok(video, "Video fetched successfully."))
}

async fn get_channel_profile(
    session: Option<Session>,
    State(manager): State<GuardedEngagementManager>,
    Path(username): Path<String>,
) -> Result<ApiSuccess<impl Serialize>, EngagementError> {
    let profile = manager.get_channel_profile(&username, session.map(|s| s.user_id))?;
    Ok(ApiSuccess::ok(profile, "Channel fetched successfully."))
}

// =============================================================================
// Likes
// =============================================================================

async fn toggle_like(
    session: Session,
    State(manager): State<GuardedEngagementManager>,
    Path((kind, target_id)): Path<(String, String)>,
) -> Result<ApiSuccess<ToggleOutcome>, EngagementError> {
    let kind = parse_target_kind(&kind)?;
    let target = TargetRef::new(kind, target_id);
    let outcome = manager.toggle_like(session.user_id, &target)?;

    Ok(match outcome {
        ToggleOutcome::Added => {
            record_toggle("like", "added");
            ApiSuccess::created(outcome, format!("{} liked successfully.", kind.as_str()))
        }
        ToggleOutcome::Removed => {
            record_toggle("like", "removed");
            ApiSuccess::ok(outcome, format!("{} unliked successfully.", kind.as_str()))
        }
    })
}

async fn get_liked_videos(
    session: Session,
    State(manager): State<GuardedEngagementManager>,
) -> Result<ApiSuccess<impl Serialize>, EngagementError> {
    let videos = manager.list_liked_videos(session.user_id)?;
    Ok(ApiSuccess::ok(
        videos,
        "Fetched all liked videos successfully.",
    ))
}

// =============================================================================
// Comments
// =============================================================================

async fn list_comments(
    _session: Session,
    State(manager): State<GuardedEngagementManager>,
    Path((kind, target_id)): Path<(String, String)>,
    Query(query): Query<PageQuery>,
) -> Result<ApiSuccess<impl Serialize>, EngagementError> {
    let kind = parse_comment_target_kind(&kind)?;
    let page = manager.list_comments(
        &TargetRef::new(kind, target_id),
        query.page.unwrap_or(1),
        query.limit.unwrap_or(10),
    )?;
    Ok(ApiSuccess::ok(page, "Comments fetched successfully."))
}

async fn create_comment(
    session: Session,
    State(manager): State<GuardedEngagementManager>,
    Path((kind, target_id)): Path<(String, String)>,
    Json(body): Json<CreateCommentBody>,
) -> Result<ApiSuccess<impl Serialize>, EngagementError> {
    let kind = parse_comment_target_kind(&kind)?;
    let comment = manager.create_comment(
        session.user_id,
        &TargetRef::new(kind, target_id),
        &body.content,
        body.parent_id.as_deref(),
    )?;
    Ok(ApiSuccess::created(comment, "Commented successfully."))
}

async fn update_comment(
    session: Session,
    State(manager): State<GuardedEngagementManager>,
    Path(comment_id): Path<String>,
    Json(body): Json<UpdateCommentBody>,
) -> Result<ApiSuccess<impl Serialize>, EngagementError> {
    let comment = manager.update_comment(&comment_id, session.user_id, &body.content)?;
    Ok(ApiSuccess::ok(comment, "Comment updated successfully."))
}

async fn delete_comment(
    session: Session,
    State(manager): State<GuardedEngagementManager>,
    Path(comment_id): Path<String>,
) -> Result<ApiSuccess<impl Serialize>, EngagementError> {
    manager.delete_comment(&comment_id, session.user_id)?;
    Ok(ApiSuccess::ok((), "Comment deleted successfully."))
}

// =============================================================================
// Subscriptions
// =============================================================================

async fn toggle_subscription(
    session: Session,
    State(manager): State<GuardedEngagementManager>,
    Path(channel_id): Path<usize>,
) -> Result<ApiSuccess<ToggleOutcome>, EngagementError> {
    let outcome = manager.toggle_subscription(session.user_id, channel_id)?;
    Ok(match outcome {
        ToggleOutcome::Added => {
            record_toggle("subscription", "added");
            ApiSuccess::ok(outcome, "Channel subscribed successfully.")
        }
        ToggleOutcome::Removed => {
            record_toggle("subscription", "removed");
            ApiSuccess::ok(outcome, "Channel unsubscribed successfully.")
        }
    })
}

async fn get_channel_subscribers(
    _session: Session,
    State(manager): State<GuardedEngagementManager>,
    Path(channel_id): Path<usize>,
) -> Result<ApiSuccess<impl Serialize>, EngagementError> {
    let subscribers = manager.list_subscribers(channel_id)?;
    Ok(ApiSuccess::ok(
        subscribers,
        "All channel's subscribers fetched successfully.",
    ))
}

async fn get_user_subscriptions(
    _session: Session,
    State(manager): State<GuardedEngagementManager>,
    Path(user_id): Path<usize>,
) -> Result<ApiSuccess<impl Serialize>, EngagementError> {
    let channels = manager.list_subscriptions(user_id)?;
    Ok(ApiSuccess::ok(
        channels,
        "All subscribed channels fetched successfully.",
    ))
}

// =============================================================================
// Watch history
// =============================================================================

async fn record_watch(
    session: Session,
    State(manager): State<GuardedEngagementManager>,
    Json(body): Json<RecordWatchBody>,
) -> Result<ApiSuccess<impl Serialize>, EngagementError> {
    manager.record_watch(session.user_id, &body.video_id, body.watch_duration)?;
    WATCH_EVENTS_TOTAL.inc();
    Ok(ApiSuccess::created(
        (),
        "Watch history added successfully.",
    ))
}

async fn get_watch_history(
    session: Session,
    State(manager): State<GuardedEngagementManager>,
    Query(query): Query<PageQuery>,
) -> Result<ApiSuccess<impl Serialize>, EngagementError> {
    let page = manager.list_watch_history(
        session.user_id,
        query.page.unwrap_or(1),
        query.limit.unwrap_or(20),
    )?;
    Ok(ApiSuccess::ok(page, "Watch history fetched successfully."))
}

async fn get_continue_watching(
    session: Session,
    State(manager): State<GuardedEngagementManager>,
) -> Result<ApiSuccess<impl Serialize>, EngagementError> {
    let entries = manager.list_continue_watching(session.user_id)?;
    Ok(ApiSuccess::ok(
        entries,
        "Continue watching fetched successfully.",
    ))
}

async fn remove_watch_history_item(
    session: Session,
    State(manager): State<GuardedEngagementManager>,
    Path(video_id): Path<String>,
) -> Result<ApiSuccess<impl Serialize>, EngagementError> {
    manager.remove_watch_history_item(session.user_id, &video_id)?;
    Ok(ApiSuccess::ok(
        (),
        "Watch history item removed successfully.",
    ))
}

async fn clear_watch_history(
    session: Session,
    State(manager): State<GuardedEngagementManager>,
) -> Result<ApiSuccess<impl Serialize>, EngagementError> {
    manager.clear_watch_history(session.user_id)?;
    Ok(ApiSuccess::ok((), "Watch history cleared successfully."))
}

// =============================================================================
// Playlists
// =============================================================================

async fn create_playlist(
    session: Session,
    State(manager): State<GuardedEngagementManager>,
    Json(body): Json<CreatePlaylistBody>,
) -> Result<ApiSuccess<impl Serialize>, EngagementError> {
    let playlist = manager.create_playlist(
        session.user_id,
        &body.title,
        &body.description,
        body.is_public.unwrap_or(true),
    )?;
    Ok(ApiSuccess::created(
        playlist,
        "New playlist created successfully.",
    ))
}

async fn get_playlist(
    _session: Session,
    State(manager): State<GuardedEngagementManager>,
    Path(playlist_id): Path<String>,
) -> Result<ApiSuccess<impl Serialize>, EngagementError> {
    let playlist = manager.get_playlist(&playlist_id)?;
    Ok(ApiSuccess::ok(playlist, "Playlist fetched successfully."))
}

async fn update_playlist(
    session: Session,
    State(manager): State<GuardedEngagementManager>,
    Path(playlist_id): Path<String>,
    Json(body): Json<UpdatePlaylistBody>,
) -> Result<ApiSuccess<impl Serialize>, EngagementError> {
    let playlist =
        manager.update_playlist(&playlist_id, session.user_id, &body.title, &body.description)?;
    Ok(ApiSuccess::ok(playlist, "Playlist updated successfully."))
}

async fn delete_playlist(
    session: Session,
    State(manager): State<GuardedEngagementManager>,
    Path(playlist_id): Path<String>,
) -> Result<ApiSuccess<impl Serialize>, EngagementError> {
    manager.delete_playlist(&playlist_id, session.user_id)?;
    Ok(ApiSuccess::ok((), "Playlist deleted successfully."))
}

async fn add_playlist_video(
    session: Session,
    State(manager): State<GuardedEngagementManager>,
    Path((playlist_id, video_id)): Path<(String, String)>,
) -> Result<ApiSuccess<impl Serialize>, EngagementError> {
    let playlist = manager.add_playlist_video(&playlist_id, &video_id, session.user_id)?;
    Ok(ApiSuccess::ok(
        playlist,
        "Video added to playlist successfully.",
    ))
}

async fn remove_playlist_video(
    session: Session,
    State(manager): State<GuardedEngagementManager>,
    Path((playlist_id, video_id)): Path<(String, String)>,
) -> Result<ApiSuccess<impl Serialize>, EngagementError> {
    let playlist = manager.remove_playlist_video(&playlist_id, &video_id, session.user_id)?;
    Ok(ApiSuccess::ok(
        playlist,
        "Video removed from the playlist successfully.",
    ))
}

async fn get_user_playlists(
    _session: Session,
    State(manager): State<GuardedEngagementManager>,
    Path(user_id): Path<usize>,
) -> Result<ApiSuccess<impl Serialize>, EngagementError> {
    let playlists = manager.list_user_playlists(user_id)?;
    Ok(ApiSuccess::ok(playlists, "Playlists fetched successfully."))
}

// =============================================================================
// App wiring
// =============================================================================

pub fn make_app(config: ServerConfig, store: Arc<dyn PlatformStore>) -> Result<Router> {
    let manager = Arc::new(EngagementManager::new(store));
    let state = ServerState {
        config,
        start_time: Instant::now(),
        manager,
    };

    let api_routes: Router = Router::new()
        .route("/feed", get(get_feed))
        .route("/videos", get(get_user_videos))
        .route("/videos/{id}", get(get_video_by_id))
        .route("/channel/{username}", get(get_channel_profile))
        .route("/likes/{kind}/{id}", post(toggle_like))
        .route("/likes/videos", get(get_liked_videos))
        .route("/comments/{kind}/{id}", get(list_comments))
        .route("/comments/{kind}/{id}", post(create_comment))
        .route("/comments/{id}", patch(update_comment))
        .route("/comments/{id}", delete(delete_comment))
        .route("/subscriptions/{channel_id}", post(toggle_subscription))
        .route(
            "/channels/{channel_id}/subscribers",
            get(get_channel_subscribers),
        )
        .route("/users/{user_id}/subscriptions", get(get_user_subscriptions))
        .route("/users/{user_id}/playlists", get(get_user_playlists))
        .route("/history", post(record_watch))
        .route("/history", get(get_watch_history))
        .route("/history", delete(clear_watch_history))
        .route("/history/continue-watching", get(get_continue_watching))
        .route("/history/{video_id}", delete(remove_watch_history_item))
        .route("/playlists", post(create_playlist))
        .route("/playlists/{id}", get(get_playlist))
        .route("/playlists/{id}", patch(update_playlist))
        .route("/playlists/{id}", delete(delete_playlist))
        .route("/playlists/{id}/videos/{video_id}", put(add_playlist_video))
        .route(
            "/playlists/{id}/videos/{video_id}",
            delete(remove_playlist_video),
        )
        .with_state(state.clone());

    let mut app: Router = Router::new()
        .route("/", get(home))
        .with_state(state.clone())
        .nest("/v1", api_routes);

    #[cfg(feature = "slowdown")]
    {
        app = app.layer(middleware::from_fn(super::slowdown_request));
    }
    app = app.layer(middleware::from_fn_with_state(state.clone(), log_requests));

    Ok(app)
}

pub async fn run_server(
    store: Arc<dyn PlatformStore>,
    requests_logging_level: RequestsLoggingLevel,
    port: u16,
    metrics_port: Option<u16>,
) -> Result<()> {
    let config = ServerConfig {
        port,
        metrics_port,
        requests_logging_level,
    };
    let app = make_app(config, store)?;

    if let Some(metrics_port) = metrics_port {
        tokio::spawn(async move {
            if let Err(e) = run_metrics_server(metrics_port).await {
                tracing::error!("Metrics server failed: {}", e);
            }
        });
    }

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;

    Ok(axum::serve(listener, app).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engagement::{
        AuthToken, AuthTokenStore, AuthTokenValue, CatalogStore, SqliteEngagementStore,
    };
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tempfile::TempDir;
    use tower::ServiceExt;

    struct TestApp {
        app: Router,
        store: Arc<SqliteEngagementStore>,
        _temp_dir: TempDir,
    }

    fn make_test_app() -> TestApp {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(SqliteEngagementStore::new(temp_dir.path().join("test.db")).unwrap());
        let config = ServerConfig {
            requests_logging_level: RequestsLoggingLevel::None,
            ..Default::default()
        };
        let app = make_app(config, store.clone()).unwrap();
        TestApp {
            app,
            store,
            _temp_dir: temp_dir,
        }
    }

    fn token_for(store: &SqliteEngagementStore, username: &str) -> (usize, String) {
        let user_id = store.create_user(username, None).unwrap();
        let token = AuthToken {
            user_id,
            value: AuthTokenValue::generate(),
        };
        store.add_auth_token(token.clone()).unwrap();
        (user_id, token.value.0)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn responds_unauthorized_on_protected_routes() {
        let test_app = make_test_app();

        let protected_routes = vec![
            ("GET", "/v1/videos?owner_id=1"),
            ("GET", "/v1/videos/123"),
            ("POST", "/v1/likes/video/123"),
            ("GET", "/v1/likes/videos"),
            ("GET", "/v1/comments/video/123"),
            ("POST", "/v1/subscriptions/1"),
            ("GET", "/v1/history"),
            ("GET", "/v1/history/continue-watching"),
            ("POST", "/v1/playlists"),
        ];

        for (method, route) in protected_routes {
            let request = Request::builder()
                .method(method)
                .uri(route)
                .body(Body::empty())
                .unwrap();
            let response = test_app.app.clone().oneshot(request).await.unwrap();
            assert_eq!(
                response.status(),
                StatusCode::UNAUTHORIZED,
                "route {method} {route}"
            );
            let body = body_json(response).await;
            assert_eq!(body["success"], false);
        }
    }

    #[tokio::test]
    async fn feed_is_viewable_anonymously() {
        let test_app = make_test_app();
        let alice = test_app.store.create_user("alice", None).unwrap();
        test_app
            .store
            .create_video(alice, "hello", None, None, None)
            .unwrap();

        let request = Request::builder()
            .uri("/v1/feed")
            .body(Body::empty())
            .unwrap();
        let response = test_app.app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["statusCode"], 200);
        assert_eq!(body["data"]["totalItems"], 1);
        assert_eq!(body["data"]["items"][0]["is_liked_by_me"], false);
    }

    #[tokio::test]
    async fn like_toggle_round_trip_over_http() {
        let test_app = make_test_app();
        let (alice, token) = token_for(&test_app.store, "alice");
        let video_id = test_app
            .store
            .create_video(alice, "hello", None, None, None)
            .unwrap();

        let uri = format!("/v1/likes/video/{video_id}");
        let request = Request::builder()
            .method("POST")
            .uri(&uri)
            .header("Authorization", &token)
            .body(Body::empty())
            .unwrap();
        let response = test_app.app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["data"], "added");

        let request = Request::builder()
            .method("POST")
            .uri(&uri)
            .header("Authorization", &token)
            .body(Body::empty())
            .unwrap();
        let response = test_app.app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"], "removed");
    }

    #[tokio::test]
    async fn validation_errors_use_the_envelope() {
        let test_app = make_test_app();
        let (_, token) = token_for(&test_app.store, "alice");

        let request = Request::builder()
            .method("POST")
            .uri("/v1/likes/gif/123")
            .header("Authorization", &token)
            .body(Body::empty())
            .unwrap();
        let response = test_app.app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["statusCode"], 400);
        assert!(body["data"].is_null());
    }

    #[tokio::test]
    async fn comment_flow_over_http() {
        let test_app = make_test_app();
        let (alice, token) = token_for(&test_app.store, "alice");
        let (_, bob_token) = token_for(&test_app.store, "bob");
        let video_id = test_app
            .store
            .create_video(alice, "hello", None, None, None)
            .unwrap();

        let request = Request::builder()
            .method("POST")
            .uri(format!("/v1/comments/video/{video_id}"))
            .header("Authorization", &token)
            .header("content-type", "application/json")
            .body(Body::from(r#"{"content": "first!"}"#))
            .unwrap();
        let response = test_app.app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        let comment_id = body["data"]["id"].as_str().unwrap().to_string();

        // A different user cannot delete it.
        let request = Request::builder()
            .method("DELETE")
            .uri(format!("/v1/comments/{comment_id}"))
            .header("Authorization", &bob_token)
            .body(Body::empty())
            .unwrap();
        let response = test_app.app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        // It is still listed.
        let request = Request::builder()
            .uri(format!("/v1/comments/video/{video_id}"))
            .header("Authorization", &token)
            .body(Body::empty())
            .unwrap();
        let response = test_app.app.clone().oneshot(request).await.unwrap();
        let body = body_json(response).await;
        assert_eq!(body["data"]["totalItems"], 1);
        assert_eq!(body["data"]["items"][0]["content"], "first!");
    }
}
