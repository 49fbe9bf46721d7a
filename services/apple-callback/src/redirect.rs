//! Frontend landing page URLs

/// `{frontend}/success.html?token=..&email=..&name=..` built from the backend's response.
///
/// The token is the backend's `accessToken`, falling back to `token`.
/// Missing fields become empty parameters.
pub fn success_redirect_url(frontend_url: &str, data: &serde_json::Value) -> String {
    let field = |name: &str| data.get(name).and_then(serde_json::Value::as_str);

    let token = field("accessToken").or_else(|| field("token")).unwrap_or("");
    let email = field("email").unwrap_or("");
    let name = field("name").unwrap_or("");

    page_url(
        frontend_url,
        "success.html",
        &[("token", token), ("email", email), ("name", name)],
    )
}

/// `{frontend}/error.html?error=..`
pub fn error_redirect_url(frontend_url: &str, message: &str) -> String {
    page_url(frontend_url, "error.html", &[("error", message)])
}

fn page_url(frontend_url: &str, page: &str, params: &[(&str, &str)]) -> String {
    let query = params
        .iter()
        .map(|(k, v)| format!("{k}={}", urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");
    format!("{}/{page}?{query}", frontend_url.trim_end_matches('/'))
}
