use axum::{extract::State, response::Redirect, routing::get};
use maud::{html, Markup};

use crate::{
    axum_error::AxumResult,
    context::RequestContext,
    identity_data::{IdentityDataService, LocalClaimsError},
    routes::{dash::page, RouteType},
};

use super::Route;

pub const PATH: &str = "/claims";

pub fn routes() -> Vec<Route> {
    vec![
        (RouteType::Undocumented((PATH, get(get_claims))), true),
        (RouteType::Undocumented(("/", get(index_claims_redirect))), false),
    ]
}

async fn get_claims(
    State(identity_data): State<IdentityDataService>,
    context: RequestContext,
) -> AxumResult<Markup> {
    // A failed API call is shown in place of its claims
    let (remote, remote_failed) = match identity_data.fetch_remote_claims(&context).await {
        Ok(json) => (json, false),
        Err(err) => (err.to_string(), true),
    };

    let local = match identity_data.fetch_local_claims(&context) {
        Ok(json) => Some(json),
        Err(LocalClaimsError::Unauthenticated) => None,
        Err(err) => return Err(err.into()),
    };

    Ok(page(
        html! {
            h1 { "Your claims" }

            section {
                h2 { "Identity API" }
                p { "Claims returned by " code { (identity_data.identity_url().as_str()) } "." }
                pre class=[remote_failed.then_some("error")] { (remote) }
            }

            section {
                h2 { "Application" }
                p { "Claims attached to your session by the identity provider." }
                @match local {
                    Some(local) => {
                        pre { (local) }
                    },
                    None => {
                        p { "You are not signed in." }
                    },
                }
            }
        },
        Some("Claims"),
    ))
}

async fn index_claims_redirect() -> Redirect {
    Redirect::to(PATH)
}
