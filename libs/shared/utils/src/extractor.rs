use std::sync::Arc;

use axum::{
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
    body::Body,
};

use shared_config::AppConfig;
use shared_models::error::AppError;
use shared_models::session::UserSession;

pub const SESSION_HEADER: &str = "X-User-Id";

const MAX_USER_ID_LEN: usize = 128;

// Resolves the session for a request and stores it in the request extensions.
pub async fn session_middleware(
    State(config): State<Arc<AppConfig>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let session = resolve_session(&request, &config)?;
    tracing::debug!("Request for session {}", session.user_id());

    request.extensions_mut().insert(session);

    Ok(next.run(request).await)
}

fn resolve_session<B>(request: &Request<B>, config: &AppConfig) -> Result<UserSession, AppError> {
    let Some(header) = request.headers().get(SESSION_HEADER) else {
        return Ok(UserSession::new(config.default_user_id.clone()));
    };

    let user_id = header
        .to_str()
        .map_err(|_| AppError::BadRequest("Invalid user id header format".to_string()))?
        .trim();

    if !is_valid_user_id(user_id) {
        return Err(AppError::BadRequest(format!(
            "User id must be 1-{} characters of letters, digits, '-' or '_'",
            MAX_USER_ID_LEN
        )));
    }

    Ok(UserSession::new(user_id))
}

pub fn is_valid_user_id(user_id: &str) -> bool {
    !user_id.is_empty()
        && user_id.len() <= MAX_USER_ID_LEN
        && user_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{middleware, routing::get, Extension, Router};
    use axum::http::StatusCode;
    use tower::ServiceExt;

    fn app() -> Router {
        let config = Arc::new(AppConfig::default());
        Router::new()
            .route("/whoami", get(|Extension(session): Extension<UserSession>| async move { session.user_id }))
            .layer(middleware::from_fn_with_state(config.clone(), session_middleware))
            .with_state(config)
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_user_id_validation() {
        assert!(is_valid_user_id("demoUser"));
        assert!(is_valid_user_id("550e8400-e29b-41d4-a716-446655440000"));
        assert!(!is_valid_user_id(""));
        assert!(!is_valid_user_id("../etc"));
        assert!(!is_valid_user_id("a&id=eq.b"));
        assert!(!is_valid_user_id(&"x".repeat(129)));
    }

    #[test]
    fn test_missing_header_uses_default_user() {
        let request = Request::builder().uri("/").body(()).unwrap();
        let session = resolve_session(&request, &AppConfig::default()).unwrap();
        assert_eq!(session.user_id(), "demoUser");
    }

    #[test]
    fn test_middleware_injects_header_session() {
        let response = tokio_test::block_on(
            app().oneshot(
                Request::builder()
                    .uri("/whoami")
                    .header(SESSION_HEADER, "patient-42")
                    .body(Body::empty())
                    .unwrap(),
            ),
        ).unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(tokio_test::block_on(body_text(response)), "patient-42");
    }

    #[test]
    fn test_middleware_rejects_invalid_header() {
        let response = tokio_test::block_on(
            app().oneshot(
                Request::builder()
                    .uri("/whoami")
                    .header(SESSION_HEADER, "../../etc")
                    .body(Body::empty())
                    .unwrap(),
            ),
        ).unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
