// Integration tests for the HTTP surface and the live WebSocket feed.
//
// Each test binds real listeners on ephemeral ports, drives the HTTP routes
// with reqwest (redirects disabled so each hop can be checked) and, where
// needed, joins a live room with a tokio-tungstenite client.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use huddle_core::Store;
use huddle_server::http::{self, AppState};
use huddle_server::ws_server::{self, LiveHub};
use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use reqwest::StatusCode;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

// ===========================================================================
// Test harness
// ===========================================================================

struct Harness {
    base: String,
    ws_url: String,
    client: reqwest::Client,
    state: AppState,
}

impl Harness {
    async fn start() -> Self {
        let hub = LiveHub::default();
        let store = Store::new(Arc::new(hub.clone()));

        let ws_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let ws_port = ws_listener.local_addr().unwrap().port();
        tokio::spawn(ws_server::run(ws_listener, hub));

        let state = AppState::new(store, ws_port);
        let http_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let http_port = http_listener.local_addr().unwrap().port();
        tokio::spawn(http::serve(http_listener, state.clone()));

        let client = reqwest::Client::builder()
            .redirect(Policy::none())
            .build()
            .unwrap();

        Self {
            base: format!("http://127.0.0.1:{http_port}"),
            ws_url: format!("ws://127.0.0.1:{ws_port}"),
            client,
            state,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn add_participants(&self, names: &str) {
        let resp = self
            .client
            .post(self.url("/add_participants"))
            .form(&[("participants", names)])
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers()[LOCATION], "/admin");
    }

    async fn start_poll(&self) -> String {
        let resp = self.client.get(self.url("/start_poll")).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        self.state
            .store()
            .current_session()
            .map(|s| s.id.to_string())
            .expect("poll should have started")
    }

    /// Submit a form and return the redirect target.
    async fn submit(&self, path: &str, fields: &[(&str, &str)]) -> String {
        let resp = self
            .client
            .post(self.url(path))
            .form(fields)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        resp.headers()[LOCATION].to_str().unwrap().to_string()
    }
}

// ===========================================================================
// Pages and roster
// ===========================================================================

#[tokio::test]
async fn home_and_admin_render() {
    let h = Harness::start().await;
    let home = h.client.get(h.url("/")).send().await.unwrap();
    assert_eq!(home.status(), StatusCode::OK);
    assert!(home.text().await.unwrap().contains("/admin"));

    h.add_participants("Alice, Bob , Carol").await;
    let admin = h.client.get(h.url("/admin")).send().await.unwrap().text().await.unwrap();
    assert!(admin.contains("<li>Alice</li>"));
    assert!(admin.contains("<li>Bob</li>"));
    assert!(!admin.contains("live-feed"));
    assert_eq!(h.state.store().roster(), ["Alice", "Bob", "Carol"]);
}

#[tokio::test]
async fn start_poll_with_empty_roster_keeps_session_unset() {
    let h = Harness::start().await;
    let resp = h.client.get(h.url("/start_poll")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert!(h.state.store().current_session().is_none());
}

#[tokio::test]
async fn admin_links_first_participant_once_poll_started() {
    let h = Harness::start().await;
    h.add_participants("Mary Ann, Bob").await;
    let session = h.start_poll().await;

    let admin = h.client.get(h.url("/admin")).send().await.unwrap().text().await.unwrap();
    assert!(admin.contains(&format!("/feedback/{session}/Mary%20Ann")));
    assert!(admin.contains("live-feed"));
}

// ===========================================================================
// Feedback walk, results and export
// ===========================================================================

#[tokio::test]
async fn feedback_walk_redirects_through_roster_then_success() {
    let h = Harness::start().await;
    h.add_participants("Alice,Mary Ann").await;
    let session = h.start_poll().await;

    let form = h
        .client
        .get(h.url(&format!("/feedback/{session}/Alice")))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(form.contains("Feedback for Alice"));

    let next = h
        .submit(
            &format!("/feedback/{session}/Alice"),
            &[("communicate", "+"), ("hustle", "+/-"), ("get_it", "yes")],
        )
        .await;
    assert_eq!(next, format!("/feedback/{session}/Mary%20Ann"));

    let done = h.submit(&next, &[("communicate", "-")]).await;
    assert_eq!(done, "/success");

    let store = h.state.store();
    let record = store
        .feedback_record(&session.as_str().into(), "Mary Ann")
        .expect("decoded participant name is recorded");
    assert_eq!(record.submissions.len(), 1);
}

#[tokio::test]
async fn results_and_exports_reflect_submissions() {
    let h = Harness::start().await;
    h.add_participants("Alice,Bob,Carol").await;
    let session = h.start_poll().await;
    let path = format!("/feedback/{session}/Alice");
    h.submit(&path, &[("communicate", "+")]).await;
    h.submit(&path, &[("communicate", "+/-")]).await;
    h.submit(&format!("/feedback/{session}/Bob"), &[("communicate", "-")]).await;

    let results = h
        .client
        .get(h.url(&format!("/results/{session}")))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(results.contains("<td>Alice</td><td>2</td><td>7.5</td>"));

    let resp = h
        .client
        .get(h.url(&format!("/export/{session}?mode=aggregated")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["content-type"], "text/csv");
    assert_eq!(
        resp.headers()["content-disposition"],
        "attachment; filename=results.csv"
    );
    let aggregated = resp.text().await.unwrap();
    let lines: Vec<&str> = aggregated.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].ends_with("Overall Score"));
    assert!(lines[1].starts_with("Alice,7.5,"));

    let raw = h
        .client
        .get(h.url(&format!("/export/{session}")))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(raw.lines().count(), 4);
    assert!(raw.lines().next().unwrap().ends_with("Capacity"));
}

#[tokio::test]
async fn unknown_session_renders_empty_views() {
    let h = Harness::start().await;
    let results = h
        .client
        .get(h.url("/results/nope"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(results.contains("No feedback yet."));

    let csv = h
        .client
        .get(h.url("/export/nope?mode=aggregated"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(csv.lines().count(), 1);
}

#[tokio::test]
async fn unknown_export_mode_serves_raw_csv() {
    let h = Harness::start().await;
    h.add_participants("Alice").await;
    let session = h.start_poll().await;
    let path = format!("/feedback/{session}/Alice");
    h.submit(&path, &[("communicate", "+")]).await;
    h.submit(&path, &[("communicate", "-")]).await;

    let resp = h
        .client
        .get(h.url(&format!("/export/{session}?mode=csv")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["content-type"], "text/csv");
    let csv = resp.text().await.unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].ends_with("Capacity"));
    assert!(lines[1].starts_with("Alice,10,"));
    assert!(lines[2].starts_with("Alice,0,"));
}

#[tokio::test]
async fn reset_clears_roster_and_session() {
    let h = Harness::start().await;
    h.add_participants("Alice").await;
    h.start_poll().await;
    let resp = h.client.post(h.url("/reset")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let store = h.state.store();
    assert!(store.roster().is_empty());
    assert!(store.current_session().is_none());
}

// ===========================================================================
// Live feed
// ===========================================================================

async fn next_text<S>(ws: &mut S) -> serde_json::Value
where
    S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    let msg = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => return text.to_string(),
                Some(Ok(_)) => continue,
                other => panic!("unexpected websocket item {other:?}"),
            }
        }
    })
    .await
    .expect("timed out waiting for websocket message");
    serde_json::from_str(&msg).unwrap()
}

#[tokio::test]
async fn submission_is_pushed_to_joined_room_only() {
    let h = Harness::start().await;
    h.add_participants("Alice,Bob").await;
    let session = h.start_poll().await;

    let (mut admin, _) = tokio_tungstenite::connect_async(h.ws_url.as_str()).await.unwrap();
    let join = format!(r#"{{"type":"join","room":"{session}","username":"admin"}}"#);
    admin.send(Message::Text(join.into())).await.unwrap();

    let status = next_text(&mut admin).await;
    assert_eq!(status["event"], "status");
    assert_eq!(status["data"]["msg"], "admin has joined the session.");

    // Feedback for another session must not reach this room.
    h.submit("/feedback/other-session/Alice", &[("communicate", "-")]).await;
    h.submit(
        &format!("/feedback/{session}/Bob"),
        &[("communicate", "+"), ("capacity", "on")],
    )
    .await;

    let update = next_text(&mut admin).await;
    assert_eq!(update["event"], "new_feedback");
    assert_eq!(update["data"]["participant"], "Bob");
    assert_eq!(update["data"]["feedback"]["Communicate"], 10.0);
    assert_eq!(update["data"]["feedback"]["Capacity"], 10.0);
    assert_eq!(update["data"]["feedback"]["Get It"], 0.0);
    assert!(update["data"]["feedback"]["Hustle"].is_null());
}
