use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("not signed in or session expired")]
    Unauthenticated,
    #[error("{message}")]
    Http { status: u16, message: String },
    #[error("network error: {0}")]
    Transport(String),
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

/// Message to surface for a non-2xx body: a JSON `message` or `error`
/// string when present, the raw text otherwise, the status reason when the
/// body is empty.
pub fn error_message(body: &str, reason: Option<&str>) -> String {
    let body = body.trim();
    if let Ok(Value::Object(fields)) = serde_json::from_str::<Value>(body) {
        let from_json = ["message", "error"].iter().find_map(|key| match fields.get(*key) {
            Some(Value::String(text)) if !text.trim().is_empty() => Some(text.trim().to_string()),
            Some(Value::Array(items)) => {
                let joined: Vec<&str> = items.iter().filter_map(Value::as_str).collect();
                (!joined.is_empty()).then(|| joined.join("; "))
            }
            _ => None,
        });
        if let Some(message) = from_json {
            return message;
        }
    }
    if body.is_empty() {
        return reason.unwrap_or("request failed").to_string();
    }
    body.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_message_field_wins() {
        assert_eq!(
            error_message(r#"{"statusCode":403,"message":"Only the host can delete"}"#, Some("Forbidden")),
            "Only the host can delete"
        );
        assert_eq!(error_message(r#"{"error":"Room not found"}"#, None), "Room not found");
        assert_eq!(
            error_message(r#"{"message":["name too long","bad visibility"]}"#, None),
            "name too long; bad visibility"
        );
    }

    #[test]
    fn plain_text_and_empty_bodies() {
        assert_eq!(error_message("  Bad Gateway upstream  ", None), "Bad Gateway upstream");
        assert_eq!(error_message("", Some("Not Found")), "Not Found");
        assert_eq!(error_message(r#"{"other":1}"#, None), r#"{"other":1}"#);
    }
}
