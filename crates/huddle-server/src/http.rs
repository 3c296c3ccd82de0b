// HTTP routes: admin dashboard, roster and poll management, the feedback
// walk, results and CSV export.
//
// Handlers never fail on user input. Unknown sessions and participants render
// empty views, following the store's semantics.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::extract::{Form, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::Router;
use huddle_core::{ExportMode, NextStep, RawRatings, SessionId, Store};
use serde::Deserialize;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::pages;

pub const CSV_FILENAME: &str = "results.csv";

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// State shared by all handlers. Cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    store: Arc<Mutex<Store>>,
    /// Advertised to the admin page so the browser can reach the live feed.
    ws_port: u16,
}

impl AppState {
    pub fn new(store: Store, ws_port: u16) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            ws_port,
        }
    }

    /// Lock the store for one request.
    ///
    /// Panics if the mutex is poisoned (a handler panicked while holding it).
    pub fn store(&self) -> MutexGuard<'_, Store> {
        self.store.lock().expect("store mutex poisoned")
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/admin", get(admin_dashboard))
        .route("/add_participants", post(add_participants))
        .route("/start_poll", get(start_poll))
        .route("/reset", post(reset))
        .route(
            "/feedback/{session_id}/{participant}",
            get(feedback_form).post(submit_feedback),
        )
        .route("/success", get(success))
        .route("/results/{session_id}", get(results))
        .route("/export/{session_id}", get(export_results))
        .with_state(state)
}

/// Serve the router on an already-bound listener until the process exits.
pub async fn serve(listener: TcpListener, state: AppState) -> anyhow::Result<()> {
    let local_addr = listener.local_addr()?;
    info!("HTTP server listening on {local_addr}");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn home() -> Html<String> {
    Html(pages::home())
}

async fn admin_dashboard(State(state): State<AppState>) -> Html<String> {
    let store = state.store();
    let session = store.current_session().map(|s| s.id.clone());
    Html(pages::admin(&pages::AdminView {
        roster: store.roster(),
        session: session.as_ref(),
        ws_port: state.ws_port,
    }))
}

#[derive(Debug, Deserialize)]
struct AddParticipantsForm {
    #[serde(default)]
    participants: String,
}

async fn add_participants(
    State(state): State<AppState>,
    Form(form): Form<AddParticipantsForm>,
) -> Redirect {
    state.store().add_participants(&form.participants);
    Redirect::to("/admin")
}

async fn start_poll(State(state): State<AppState>) -> Redirect {
    state.store().start_poll();
    Redirect::to("/admin")
}

async fn reset(State(state): State<AppState>) -> Redirect {
    state.store().reset();
    Redirect::to("/admin")
}

async fn feedback_form(Path((session_id, participant)): Path<(String, String)>) -> Html<String> {
    Html(pages::feedback_form(
        &SessionId::from(session_id),
        &participant,
    ))
}

async fn submit_feedback(
    State(state): State<AppState>,
    Path((session_id, participant)): Path<(String, String)>,
    Form(fields): Form<HashMap<String, String>>,
) -> Redirect {
    let session = SessionId::from(session_id);
    let ratings = RawRatings::from_form(&fields);
    let next = state.store().submit_feedback(&session, &participant, &ratings);
    match next {
        NextStep::Participant(next) => Redirect::to(&pages::feedback_path(&session, &next)),
        NextStep::Complete => Redirect::to("/success"),
    }
}

async fn success() -> Html<String> {
    Html(pages::success())
}

async fn results(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Html<String> {
    let session = SessionId::from(session_id);
    let aggregates = state.store().aggregate(&session);
    Html(pages::results(&session, &aggregates))
}

/// `?mode=aggregated` selects the aggregated export; any other value, or none,
/// falls back to raw.
fn export_mode(query: &HashMap<String, String>) -> ExportMode {
    match query.get("mode").map(|m| m.trim()) {
        Some(m) if m.eq_ignore_ascii_case("aggregated") => ExportMode::Aggregated,
        _ => ExportMode::Raw,
    }
}

async fn export_results(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let session = SessionId::from(session_id);
    let csv = state.store().export_csv(&session, export_mode(&query));
    match csv {
        Ok(body) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "text/csv".to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename={CSV_FILENAME}"),
                ),
            ],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("CSV export failed for session {session}: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, "export failed").into_response()
        }
    }
}
