// HTML pages and URL helpers for the HTTP surface.
//
// Pages are plain strings built from data the store hands out. There is no
// template engine; every interpolated value goes through `escape_html`.

use std::fmt::Write as _;

use huddle_core::{Criterion, CriterionKind, ParticipantAggregate, SessionId};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters left unescaped in a path segment (RFC 3986 unreserved).
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

// ---------------------------------------------------------------------------
// URL helpers
// ---------------------------------------------------------------------------

pub fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}

pub fn feedback_path(session: &SessionId, participant: &str) -> String {
    format!(
        "/feedback/{}/{}",
        encode_segment(session.as_str()),
        encode_segment(participant)
    )
}

pub fn results_path(session: &SessionId) -> String {
    format!("/results/{}", encode_segment(session.as_str()))
}

pub fn export_path(session: &SessionId, aggregated: bool) -> String {
    let mode = if aggregated { "aggregated" } else { "raw" };
    format!("/export/{}?mode={mode}", encode_segment(session.as_str()))
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n{body}\n</body>\n</html>\n",
        escape_html(title)
    )
}

// ---------------------------------------------------------------------------
// Pages
// ---------------------------------------------------------------------------

pub fn home() -> String {
    layout(
        "Huddle",
        "<h1>Huddle</h1>\n<p>Live team feedback.</p>\n<p><a href=\"/admin\">Admin dashboard</a></p>",
    )
}

/// Data shown on the admin dashboard.
pub struct AdminView<'a> {
    pub roster: &'a [String],
    pub session: Option<&'a SessionId>,
    pub ws_port: u16,
}

const LIVE_FEED_SCRIPT: &str = r#"<script>
const feed = document.getElementById("live-feed");
const ws = new WebSocket("ws://" + location.hostname + ":__WS_PORT__");
ws.onopen = () => ws.send(JSON.stringify({ type: "join", room: __SESSION__, username: "admin" }));
ws.onmessage = (e) => {
  const m = JSON.parse(e.data);
  const li = document.createElement("li");
  if (m.event === "new_feedback") {
    const scores = Object.entries(m.data.feedback)
      .map(([k, v]) => k + ": " + (v === null ? "-" : v))
      .join(", ");
    li.textContent = m.data.participant + " | " + scores;
  } else {
    li.textContent = m.data.msg;
  }
  feed.appendChild(li);
};
</script>"#;

pub fn admin(view: &AdminView<'_>) -> String {
    let mut body = String::from("<h1>Admin dashboard</h1>\n");

    body.push_str("<h2>Participants</h2>\n<ol>\n");
    for name in view.roster {
        let _ = writeln!(body, "<li>{}</li>", escape_html(name));
    }
    body.push_str("</ol>\n");

    body.push_str(
        "<form method=\"post\" action=\"/add_participants\">\n\
         <input type=\"text\" name=\"participants\" placeholder=\"Alice, Bob, Carol\">\n\
         <button type=\"submit\">Add participants</button>\n</form>\n",
    );
    body.push_str("<p><a href=\"/start_poll\">Start poll</a></p>\n");
    body.push_str(
        "<form method=\"post\" action=\"/reset\">\n<button type=\"submit\">Reset</button>\n</form>\n",
    );

    if let Some(session) = view.session {
        let _ = writeln!(
            body,
            "<h2>Session</h2>\n<p>Session ID: <code>{}</code></p>",
            escape_html(session.as_str())
        );
        if let Some(first) = view.roster.first() {
            let _ = writeln!(
                body,
                "<p>Feedback link: <a id=\"session-link\" href=\"{0}\">{0}</a></p>",
                escape_html(&feedback_path(session, first))
            );
        }
        let _ = writeln!(
            body,
            "<p><a href=\"{}\">Results</a> | <a href=\"{}\">Export raw CSV</a> | <a href=\"{}\">Export aggregated CSV</a></p>",
            escape_html(&results_path(session)),
            escape_html(&export_path(session, false)),
            escape_html(&export_path(session, true)),
        );
        body.push_str("<h2>Live feedback</h2>\n<ul id=\"live-feed\"></ul>\n");
        let session_literal =
            serde_json::to_string(session.as_str()).unwrap_or_else(|_| "\"\"".to_string());
        body.push_str(
            &LIVE_FEED_SCRIPT
                .replace("__WS_PORT__", &view.ws_port.to_string())
                .replace("__SESSION__", &session_literal),
        );
    }

    layout("Huddle admin", &body)
}

pub fn feedback_form(session: &SessionId, participant: &str) -> String {
    let mut body = format!(
        "<h1>Feedback for {}</h1>\n<form method=\"post\" action=\"{}\">\n",
        escape_html(participant),
        escape_html(&feedback_path(session, participant))
    );

    for criterion in Criterion::ALL {
        let field = criterion.field_name();
        let label = escape_html(criterion.label());
        match criterion.kind() {
            CriterionKind::Qualitative => {
                let _ = write!(body, "<fieldset>\n<legend>{label}</legend>\n");
                for rating in ["+", "+/-", "-"] {
                    let _ = writeln!(
                        body,
                        "<label><input type=\"radio\" name=\"{field}\" value=\"{0}\"> {0}</label>",
                        escape_html(rating)
                    );
                }
                body.push_str("</fieldset>\n");
            }
            CriterionKind::YesNo => {
                let _ = writeln!(
                    body,
                    "<p><label><input type=\"checkbox\" name=\"{field}\" value=\"yes\"> {label}</label></p>"
                );
            }
        }
    }

    body.push_str("<button type=\"submit\">Submit</button>\n</form>");
    layout("Huddle feedback", &body)
}

pub fn success() -> String {
    layout(
        "Huddle",
        "<h1>Thank you!</h1>\n<p>Your feedback has been submitted.</p>",
    )
}

pub fn results(session: &SessionId, aggregates: &[ParticipantAggregate]) -> String {
    let mut body = format!(
        "<h1>Results</h1>\n<p>Session ID: <code>{}</code></p>\n",
        escape_html(session.as_str())
    );

    if aggregates.is_empty() {
        body.push_str("<p>No feedback yet.</p>\n");
    } else {
        body.push_str("<table>\n<tr><th>Participant</th><th>Responses</th>");
        for criterion in Criterion::ALL {
            let _ = write!(body, "<th>{}</th>", escape_html(criterion.label()));
        }
        body.push_str("<th>Overall Score</th></tr>\n");

        for agg in aggregates {
            let _ = write!(
                body,
                "<tr><td>{}</td><td>{}</td>",
                escape_html(&agg.participant),
                agg.submissions
            );
            for (_, mean) in agg.means.iter() {
                let _ = write!(body, "<td>{}</td>", format_mean(mean));
            }
            let _ = writeln!(body, "<td>{}</td></tr>", format_mean(agg.overall));
        }
        body.push_str("</table>\n");
    }

    let _ = write!(
        body,
        "<p><a href=\"{}\">Export raw CSV</a> | <a href=\"{}\">Export aggregated CSV</a></p>",
        escape_html(&export_path(session, false)),
        escape_html(&export_path(session, true)),
    );
    layout("Huddle results", &body)
}

fn format_mean(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.1}")).unwrap_or_else(|| "-".to_string())
}
