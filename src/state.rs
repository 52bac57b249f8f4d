use std::{ops::Deref, sync::Arc};

use axum::extract::FromRef;

use crate::{identity_data::IdentityDataService, settings::ArcSettings};

#[derive(Clone)]
pub struct AppState(Arc<InnerState>);

impl AppState {
    pub fn new(state: InnerState) -> Self {
        Self(Arc::new(state))
    }
}

impl Deref for AppState {
    type Target = InnerState;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

pub struct InnerState {
    pub settings: ArcSettings,
    pub identity_data: IdentityDataService,
}

impl FromRef<AppState> for ArcSettings {
    fn from_ref(state: &AppState) -> Self {
        state.settings.clone()
    }
}

impl FromRef<AppState> for IdentityDataService {
    fn from_ref(state: &AppState) -> Self {
        state.identity_data.clone()
    }
}

#[cfg(test)]
pub fn test_state(identity_api: &str) -> AppState {
    use crate::settings::{
        GeneralSettings, IdentityApiSettings, ListenAddress, OidcSettings, Settings,
    };

    let base_url: url::Url = identity_api.parse().expect("invalid identity API URL");

    let settings = Settings {
        general: GeneralSettings {
            listen_address: ListenAddress::default(),
            public_url: "http://localhost:8080".to_string(),
        },
        oidc: OidcSettings {
            issuer: "https://sso.example.com".to_string(),
            client_id: "claimview".to_string(),
            client_secret: None,
            scopes: vec!["profile".to_string()],
        },
        identity_api: IdentityApiSettings {
            base_url: base_url.clone(),
            timeout_secs: None,
        },
    };

    AppState::new(InnerState {
        settings: Arc::new(settings),
        identity_data: IdentityDataService::builder()
            .with_http_client(reqwest::Client::new())
            .with_base_url(base_url)
            .build()
            .expect("failed to build identity data service"),
    })
}
