mod api;
mod dash;

use axum::routing::MethodRouter;
use utoipa_axum::router::{OpenApiRouter, UtoipaMethodRouter};

use crate::state::AppState;

pub fn routes() -> Vec<Route> {
    [api::routes(), dash::routes()].concat()
}

/// A route and whether it requires the user to be logged in
pub type Route = (RouteType, bool);

#[derive(Clone)]
pub enum RouteType {
    OpenApi(UtoipaMethodRouter<AppState>),
    Undocumented((&'static str, MethodRouter<AppState>)),
}

pub fn into_router(routes: impl IntoIterator<Item = RouteType>) -> OpenApiRouter<AppState> {
    routes
        .into_iter()
        .fold(OpenApiRouter::new(), |router, route| match route {
            RouteType::OpenApi(method_router) => router.routes(method_router),
            RouteType::Undocumented((path, method_router)) => router.route(path, method_router),
        })
}
