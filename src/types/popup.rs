//! Cross-window contract between the consent popup and its opener.

use serde::{Deserialize, Serialize};
use url::Url;

/// Message the popup posts to `window.opener` after the provider redirect.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum PopupMessage {
    #[serde(rename = "GOOGLE_AUTH_SUCCESS")]
    Success { code: String },
    #[serde(rename = "GOOGLE_AUTH_ERROR")]
    Error { error: String },
}

impl PopupMessage {
    /// Build the message from the redirect query. A provider error wins over a code.
    pub fn from_redirect(code: Option<&str>, error: Option<&str>) -> Self {
        if let Some(error) = error.map(str::trim).filter(|e| !e.is_empty()) {
            return Self::Error {
                error: error.to_string(),
            };
        }
        match code.map(str::trim).filter(|c| !c.is_empty()) {
            Some(code) => Self::Success {
                code: code.to_string(),
            },
            None => Self::Error {
                error: "missing authorization code".to_string(),
            },
        }
    }
}

/// How a pending authorization attempt ended from the opener's side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationOutcome {
    Code(String),
    Denied(String),
    /// Popup closed, attempt abandoned, or timed out before any message.
    Cancelled,
}

impl From<PopupMessage> for AuthorizationOutcome {
    fn from(message: PopupMessage) -> Self {
        match message {
            PopupMessage::Success { code } => Self::Code(code),
            PopupMessage::Error { error } => Self::Denied(error),
        }
    }
}

/// Normalize an origin string to its ASCII serialization (`scheme://host[:port]`).
/// Only http(s) tuple origins are accepted.
pub fn normalize_origin(raw: &str) -> Option<String> {
    let url = Url::parse(raw.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    let origin = url.origin();
    origin
        .is_tuple()
        .then(|| origin.ascii_serialization())
}

/// Accept `message` only when it was sent from `opener_origin`.
pub fn accept_from(
    opener_origin: &str,
    sender_origin: &str,
    message: PopupMessage,
) -> Option<PopupMessage> {
    let sender = normalize_origin(sender_origin)?;
    (sender == opener_origin).then_some(message)
}

/// Self-closing page served at the redirect URI.
///
/// Posts `message` to the opener restricted to `opener_origin`, then closes
/// the window whether or not an opener exists.
pub fn render_relay_page(message: &PopupMessage, opener_origin: Option<&str>) -> String {
    let payload = script_json(&serde_json::to_string(message).unwrap_or_else(|_| "null".to_string()));
    let target = script_json(
        &serde_json::to_string(&opener_origin).unwrap_or_else(|_| "null".to_string()),
    );
    format!(
        r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>Calendar connection</title></head>
<body>
<p>You can close this window.</p>
<script>
(function () {{
  var message = {payload};
  var targetOrigin = {target};
  try {{
    if (window.opener && targetOrigin) {{
      window.opener.postMessage(message, targetOrigin);
    }}
  }} finally {{
    window.close();
  }}
}})();
</script>
</body>
</html>
"#
    )
}

// keep embedded JSON from terminating the script element
fn script_json(json: &str) -> String {
    json.replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
}
