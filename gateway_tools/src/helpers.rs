use serde_json::Value;

/// The gateway reports errors as `{"error": {"code": "...", "description": "..."}}`. Falls back to the raw body when
/// it is not in that shape.
pub fn error_message(body: &str) -> String {
    let parsed = serde_json::from_str::<Value>(body).ok();
    let error = parsed.as_ref().map(|v| &v["error"]);
    match error {
        Some(e) if e["description"].is_string() => {
            let code = e["code"].as_str().unwrap_or("ERROR");
            format!("{code}: {}", e["description"].as_str().unwrap_or_default())
        },
        _ => body.trim().to_string(),
    }
}
