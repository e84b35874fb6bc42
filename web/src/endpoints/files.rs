/*
 * SPDX-FileCopyrightText: 2026 Wavelens GmbH <info@wavelens.io>
 *
 * SPDX-License-Identifier: AGPL-3.0-only
 */

//! Plain file browser over the build directory.

use axum::body::Body;
use axum::extract::{Path, Request, State};
use axum::response::{Html, IntoResponse, Response};
use builder::ServerState;
use std::fmt::Write;
use std::path::{Component, PathBuf};
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::services::ServeFile;

use crate::error::{WebError, WebResult};

pub async fn get_files_root(state: State<Arc<ServerState>>, request: Request) -> WebResult<Response> {
    serve_path(&state, "", request).await
}

pub async fn get_file(
    state: State<Arc<ServerState>>,
    Path(path): Path<String>,
    request: Request,
) -> WebResult<Response> {
    serve_path(&state, &path, request).await
}

async fn serve_path(state: &ServerState, path: &str, request: Request) -> WebResult<Response> {
    let relative = sanitize(path).ok_or_else(|| WebError::not_found("File"))?;
    let target = state.cli.base_dir().join(&relative);

    let metadata = tokio::fs::metadata(&target)
        .await
        .map_err(|_| WebError::not_found("File"))?;

    if metadata.is_dir() {
        let listing = render_listing(&target, &relative).await?;
        return Ok(Html(listing).into_response());
    }

    let response = ServeFile::new(&target)
        .oneshot(request)
        .await
        .map_err(|e| WebError::Internal(e.into()))?;

    Ok(response.map(Body::new))
}

fn sanitize(path: &str) -> Option<PathBuf> {
    let mut relative = PathBuf::new();

    for component in std::path::Path::new(path.trim_start_matches('/')).components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }

    Some(relative)
}

async fn render_listing(dir: &std::path::Path, relative: &std::path::Path) -> WebResult<String> {
    let mut entries = tokio::fs::read_dir(dir)
        .await
        .map_err(|e| WebError::Internal(e.into()))?;

    let mut names = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| WebError::Internal(e.into()))?
    {
        let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
        let mut name = entry.file_name().to_string_lossy().into_owned();
        if is_dir {
            name.push('/');
        }
        names.push(name);
    }
    names.sort();

    let base = if relative.as_os_str().is_empty() {
        "/files/".to_string()
    } else {
        format!("/files/{}/", relative.display())
    };
    let title = escape_html(&base);

    let mut html = String::new();
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>Index of {title}</title></head>\n<body><h1>Index of {title}</h1>\n<ul>\n"
    );

    if !relative.as_os_str().is_empty() {
        html.push_str("<li><a href=\"../\">../</a></li>\n");
    }

    for name in &names {
        let escaped = escape_html(name);
        let _ = writeln!(html, "<li><a href=\"{}{}\">{}</a></li>", escape_html(&base), escaped, escaped);
    }

    html.push_str("</ul></body></html>\n");

    Ok(html)
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());

    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }

    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize(""), Some(PathBuf::new()));
        assert_eq!(sanitize("12/build.log"), Some(PathBuf::from("12/build.log")));
        assert_eq!(sanitize("/12/./app/"), Some(PathBuf::from("12/app")));
        assert_eq!(sanitize("12/../../etc/passwd"), None);
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<a href=\"x\">&</a>"), "&lt;a href=&quot;x&quot;&gt;&amp;&lt;/a&gt;");
    }
}
