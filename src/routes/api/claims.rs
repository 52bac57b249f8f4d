use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use utoipa_axum::routes;

use crate::{
    axum_error::AxumResult,
    context::RequestContext,
    identity_data::{IdentityDataService, LocalClaimsError},
    routes::RouteType,
};

use super::Route;

const LOCAL_PATH: &str = "/api/claims/local";
const REMOTE_PATH: &str = "/api/claims/remote";

pub fn routes() -> Vec<Route> {
    vec![
        (RouteType::OpenApi(routes!(get_local)), true),
        (RouteType::OpenApi(routes!(get_remote)), true),
    ]
}

fn json_response(json: String) -> Response {
    ([(header::CONTENT_TYPE, "application/json")], json).into_response()
}

/// Get the claims of the signed-in user as seen by this application
#[utoipa::path(
    method(get),
    path = LOCAL_PATH,
    responses(
        (status = OK, description = "Success", body = serde_json::Value, content_type = "application/json"),
        (status = UNAUTHORIZED, description = "Not signed in", body = str, content_type = "text/plain")
    )
)]
async fn get_local(
    State(identity_data): State<IdentityDataService>,
    context: RequestContext,
) -> AxumResult<Response> {
    match identity_data.fetch_local_claims(&context) {
        Ok(json) => Ok(json_response(json)),
        Err(err @ LocalClaimsError::Unauthenticated) => {
            Ok((StatusCode::UNAUTHORIZED, err.to_string()).into_response())
        }
        Err(err) => Err(err.into()),
    }
}

/// Get the claims of the signed-in user as seen by the identity API
#[utoipa::path(
    method(get),
    path = REMOTE_PATH,
    responses(
        (status = OK, description = "Success", body = serde_json::Value, content_type = "application/json"),
        (status = BAD_GATEWAY, description = "The identity API could not be reached or returned invalid data", body = str, content_type = "text/plain")
    )
)]
async fn get_remote(
    State(identity_data): State<IdentityDataService>,
    context: RequestContext,
) -> Response {
    match identity_data.fetch_remote_claims(&context).await {
        Ok(json) => json_response(json),
        Err(err) => {
            let status = err
                .status()
                .filter(|status| status.is_client_error() || status.is_server_error())
                .unwrap_or(StatusCode::BAD_GATEWAY);

            (status, err.to_string()).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::Request, Extension, Router};
    use axum_oidc::OidcAccessToken;
    use tower::ServiceExt as _;
    use wiremock::matchers::{header as header_eq, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::{routes, state::test_state};

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn router(mock_server: &MockServer) -> Router {
        let (router, _) = routes::into_router(super::routes().into_iter().map(|(route, _)| route))
            .with_state(test_state(&format!("{}/", mock_server.uri())))
            .split_for_parts();
        router
    }

    fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_local_claims_anonymous() {
        let mock_server = MockServer::start().await;

        let response = router(&mock_server)
            .oneshot(get(super::LOCAL_PATH))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_remote_claims_forwards_token() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/identity"))
            .and(header_eq("authorization", "Bearer abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"sub":"42"}"#))
            .expect(1)
            .mount(&mock_server)
            .await;

        let response = router(&mock_server)
            .layer(Extension(OidcAccessToken("abc123".to_string())))
            .oneshot(get(super::REMOTE_PATH))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
        assert_eq!(body_text(response).await, "{\n  \"sub\": \"42\"\n}");
    }

    #[tokio::test]
    async fn test_remote_claims_upstream_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/identity"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&mock_server)
            .await;

        let response = router(&mock_server)
            .oneshot(get(super::REMOTE_PATH))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            body_text(response).await,
            "Response status code does not indicate success: 403 Forbidden"
        );
    }

    #[tokio::test]
    async fn test_remote_claims_invalid_body() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/identity"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&mock_server)
            .await;

        let response = router(&mock_server)
            .oneshot(get(super::REMOTE_PATH))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(!body_text(response).await.is_empty());
    }
}
