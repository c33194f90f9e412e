use axum::extract::{Host, Query, State};
use axum::response::Redirect;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::oauth::OAuthConnector;
use crate::state::AppState;

#[derive(Serialize)]
pub struct ConnectionStatus {
    pub connected: bool,
}

#[derive(Deserialize)]
pub struct CallbackQuery {
    pub state: Option<String>,
    pub code: Option<String>,
    pub error: Option<String>,
}

fn app_base_url(host: &str) -> String {
    format!("http://{host}")
}

fn callback_url(host: &str, slug: &str) -> String {
    format!("{}/api/v1/{}/oauth/callback", app_base_url(host), slug)
}

fn error_redirect(host: &str, slug: &str, message: &str) -> Redirect {
    Redirect::temporary(&format!(
        "{}/?{}_auth=error&message={}",
        app_base_url(host),
        slug,
        urlencoding::encode(message)
    ))
}

fn connected_redirect(host: &str, slug: &str) -> Redirect {
    Redirect::temporary(&format!("{}/?{}_auth=connected", app_base_url(host), slug))
}

/// Shared start leg: issue the pending authorization and bounce the browser
/// to the provider, or back to the app with the failure message.
async fn start_flow(connector: &dyn OAuthConnector, slug: &str, host: &str) -> Redirect {
    match connector.start_browser_oauth(&callback_url(host, slug)).await {
        Ok(auth_url) => Redirect::temporary(&auth_url),
        Err(err) => error_redirect(host, slug, &err.0),
    }
}

/// Shared callback leg: validate the delivered state and code, finish the
/// exchange, and bounce the browser back to the app either way.
async fn finish_flow(
    connector: &dyn OAuthConnector,
    slug: &str,
    host: &str,
    params: CallbackQuery,
) -> Redirect {
    if let Some(error) = params.error {
        return error_redirect(host, slug, &error);
    }

    let (Some(state), Some(code)) = (params.state, params.code) else {
        return error_redirect(host, slug, "Missing OAuth callback parameters.");
    };

    match connector
        .finish_browser_oauth(&state, &code, &callback_url(host, slug))
        .await
    {
        Ok(()) => connected_redirect(host, slug),
        Err(err) => error_redirect(host, slug, &err.0),
    }
}

/// GET /api/v1/gmail/status
pub async fn gmail_status(State(state): State<AppState>) -> Json<ConnectionStatus> {
    Json(ConnectionStatus {
        connected: state.gmail.is_connected().await,
    })
}

/// GET /api/v1/gmail/oauth/start
pub async fn gmail_oauth_start(State(state): State<AppState>, Host(host): Host) -> Redirect {
    start_flow(state.gmail.as_ref(), "gmail", &host).await
}

/// GET /api/v1/gmail/oauth/callback
pub async fn gmail_oauth_callback(
    State(state): State<AppState>,
    Host(host): Host,
    Query(params): Query<CallbackQuery>,
) -> Redirect {
    finish_flow(state.gmail.as_ref(), "gmail", &host, params).await
}

/// GET /api/v1/linkedin/status
pub async fn linkedin_status(State(state): State<AppState>) -> Json<ConnectionStatus> {
    Json(ConnectionStatus {
        connected: state.linkedin.is_connected().await,
    })
}

/// GET /api/v1/linkedin/oauth/start
pub async fn linkedin_oauth_start(State(state): State<AppState>, Host(host): Host) -> Redirect {
    start_flow(state.linkedin.as_ref(), "linkedin", &host).await
}

/// GET /api/v1/linkedin/oauth/callback
pub async fn linkedin_oauth_callback(
    State(state): State<AppState>,
    Host(host): Host,
    Query(params): Query<CallbackQuery>,
) -> Redirect {
    finish_flow(state.linkedin.as_ref(), "linkedin", &host, params).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_url_includes_provider_slug() {
        assert_eq!(
            callback_url("localhost:8000", "gmail"),
            "http://localhost:8000/api/v1/gmail/oauth/callback"
        );
    }
}
