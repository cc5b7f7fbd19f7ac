use warp::{Rejection, Reply};

const INDEX_HTML: &str = include_str!("../web/index.html");
const STYLE_CSS: &str = include_str!("../web/style.css");
const SCRIPT_JS: &str = include_str!("../web/script.js");

/// Body and content type of an embedded page asset.
pub fn asset(path: &str) -> Option<(&'static str, &'static str)> {
    match path.trim_start_matches('/') {
        "" | "index.html" => Some((INDEX_HTML, "text/html; charset=utf-8")),
        "style.css" => Some((STYLE_CSS, "text/css")),
        "script.js" => Some((SCRIPT_JS, "application/javascript")),
        _ => None,
    }
}

pub async fn serve_web_ui(path: warp::path::Tail) -> Result<impl Reply, Rejection> {
    let (body, content_type) = asset(path.as_str()).ok_or_else(warp::reject::not_found)?;
    Ok(warp::reply::with_header(body, "content-type", content_type))
}
