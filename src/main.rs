mod axum_error;
mod context;
mod identity_data;
mod routes;
mod settings;
mod state;

use std::{net::SocketAddr, sync::Arc};

use axum::{
    error_handling::HandleErrorLayer, http::StatusCode, response::IntoResponse, routing::any,
    Router,
};
use axum_oidc::{
    error::MiddlewareError, handle_oidc_redirect, OidcAuthLayer, OidcClient, OidcLoginLayer,
};
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_sessions::{cookie::SameSite, Expiry, MemoryStore, SessionManagerLayer};
use tracing::{error, info, info_span, instrument, level_filters::LevelFilter, Instrument};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    fmt::format::FmtSpan, layer::SubscriberExt as _, util::SubscriberInitExt as _,
};
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_rapidoc::RapiDoc;
use utoipa_redoc::{Redoc, Servable};
use utoipa_scalar::{Scalar, Servable as _};

use crate::{
    identity_data::IdentityDataService,
    routes::Route,
    settings::{env_name, Settings},
    state::{AppState, InnerState},
};

#[derive(OpenApi)]
#[openapi()]
struct ApiDoc;

/// ID token claims outside the standard OpenID Connect set, in the order the
/// provider issued them
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct ProviderClaims {
    #[serde(flatten)]
    claims: serde_json::Map<String, serde_json::Value>,
}

impl ProviderClaims {
    pub fn as_map(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.claims
    }
}

impl axum_oidc::AdditionalClaims for ProviderClaims {}
impl openidconnect::AdditionalClaims for ProviderClaims {}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    dotenvy::dotenv().ok();
    init_tracing().wrap_err("failed to set global tracing subscriber")?;

    info!(
        "Starting {} {}...",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
    );

    let settings = Arc::new(Settings::try_load().wrap_err("failed to load settings")?);

    let identity_data = init_identity_data(&settings)?;

    let app_state = AppState::new(InnerState {
        settings: settings.clone(),
        identity_data,
    });

    let app = init_axum(app_state).await?;
    let listener = init_listener(&settings).await?;

    info!(
        "listening on {} ({})",
        listener
            .local_addr()
            .wrap_err("failed to get local address")?,
        settings.general.public_url
    );

    axum::serve(listener, app.into_make_service())
        .await
        .wrap_err("failed to run server")?;

    Ok(())
}

fn init_tracing() -> Result<()> {
    tracing_subscriber::Registry::default()
        .with(tracing_subscriber::fmt::layer().with_span_events(FmtSpan::NEW | FmtSpan::CLOSE))
        .with(ErrorLayer::default())
        .with(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var(env_name("LOG"))
                .from_env()?,
        )
        .try_init()?;

    Ok(())
}

#[instrument(skip(settings))]
fn init_identity_data(settings: &Settings) -> Result<IdentityDataService> {
    let identity_data = IdentityDataService::builder()
        .with_default_http_client(settings.identity_api.timeout())
        .wrap_err("failed to build HTTP client")?
        .with_base_url(settings.identity_api.base_url.clone())
        .build()
        .wrap_err("failed to configure identity API")?;

    info!(url = %identity_data.identity_url(), "Using identity API");

    Ok(identity_data)
}

fn split_routes(all_routes: Vec<Route>) -> (OpenApiRouter<AppState>, OpenApiRouter<AppState>) {
    let (protected, public): (Vec<_>, Vec<_>) = all_routes
        .into_iter()
        .partition(|(_, login_required)| *login_required);

    (
        routes::into_router(protected.into_iter().map(|(route, _)| route)),
        routes::into_router(public.into_iter().map(|(route, _)| route)),
    )
}

#[instrument(skip(state))]
async fn init_axum(state: AppState) -> Result<Router> {
    let session_store = MemoryStore::default();

    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(false)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(60 * 60),
        ));

    let handle_error_layer = HandleErrorLayer::new(|e: MiddlewareError| async {
        error!(error = ?e, "An error occurred in OIDC middleware");
        e.into_response()
    });

    let oidc_login_service = ServiceBuilder::new()
        .layer(handle_error_layer.clone())
        .layer(OidcLoginLayer::<ProviderClaims>::new());

    let mut oidc_client = OidcClient::<ProviderClaims>::builder()
        .with_default_http_client()
        .with_redirect_url(format!("{}/oidc", state.settings.general.public_url).parse()?)
        .with_client_id(openidconnect::ClientId::new(
            state.settings.oidc.client_id.clone(),
        ));

    for scope in &state.settings.oidc.scopes {
        oidc_client = oidc_client.add_scope(openidconnect::Scope::new(scope.clone()));
    }

    if let Some(client_secret) = state.settings.oidc.client_secret.as_ref() {
        oidc_client = oidc_client
            .with_client_secret(openidconnect::ClientSecret::new(client_secret.clone()));
    }

    let oidc_client = oidc_client
        .discover(openidconnect::IssuerUrl::new(
            state.settings.oidc.issuer.clone(),
        )?)
        .instrument(info_span!("OIDC discovery"))
        .await?
        .build();

    let oidc_auth_service = ServiceBuilder::new()
        .layer(handle_error_layer)
        .layer(OidcAuthLayer::new(oidc_client));

    let (protected_router, public_router) = split_routes(routes::routes());
    let autologin_router = protected_router.layer(oidc_login_service);

    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .merge(autologin_router)
        .merge(public_router)
        .route("/oidc", any(handle_oidc_redirect::<ProviderClaims>))
        .with_state(state)
        .split_for_parts();

    let openapi_prefix = "/apidoc";
    let spec_path = format!("{openapi_prefix}/openapi.json");

    let router = router
        .merge(Redoc::with_url(
            format!("{openapi_prefix}/redoc"),
            api.clone(),
        ))
        .merge(
            RapiDoc::with_openapi(spec_path, api.clone()).path(format!("{openapi_prefix}/rapidoc")),
        )
        .merge(Scalar::with_url(format!("{openapi_prefix}/scalar"), api));

    let router = router
        .layer(oidc_auth_service)
        .layer(session_layer)
        .fallback(|| async { (StatusCode::NOT_FOUND, "Not found").into_response() });

    Ok(router)
}

async fn init_listener(settings: &Settings) -> Result<TcpListener> {
    let addr: Vec<SocketAddr> = settings.general.listen_address.clone().into();

    Ok(TcpListener::bind(addr.as_slice()).await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_routes_by_login_requirement() {
        let (protected, public) = split_routes(routes::routes());
        let (_, protected_api) = protected.split_for_parts();
        let (_, public_api) = public.split_for_parts();

        let protected_paths: Vec<_> = protected_api.paths.paths.keys().cloned().collect();
        let public_paths: Vec<_> = public_api.paths.paths.keys().cloned().collect();

        assert!(protected_paths.contains(&"/api/claims/local".to_string()));
        assert!(protected_paths.contains(&"/api/claims/remote".to_string()));
        assert!(public_paths.contains(&"/api/health".to_string()));
        assert!(public_paths.contains(&"/api/info".to_string()));
        assert!(!public_paths.iter().any(|path| path.starts_with("/api/claims")));
    }

    #[test]
    fn test_provider_claims_keep_issue_order() {
        let claims: ProviderClaims =
            serde_json::from_str(r#"{"role":"admin","idp":"local","groups":["users"]}"#).unwrap();

        let keys: Vec<_> = claims.as_map().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["role", "idp", "groups"]);
    }
}
