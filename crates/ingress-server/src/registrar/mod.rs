//! Route registrar extension point
//!
//! The gateway's single extension point: a collaborator receives the bare
//! router and attaches arbitrary endpoint logic to it. The bootstrap
//! guarantees the attachment lands after the pipeline stages and before
//! the error boundary; the gateway knows nothing about what is attached.

use crate::state::AppState;
use axum::Router;

/// Attaches domain endpoints to the assembled pipeline
pub trait RouteRegistrar {
    /// Attach routes and return the extended router
    fn attach(self, router: Router<AppState>) -> Router<AppState>;
}

impl<F> RouteRegistrar for F
where
    F: FnOnce(Router<AppState>) -> Router<AppState>,
{
    fn attach(self, router: Router<AppState>) -> Router<AppState> {
        self(router)
    }
}

/// Registrar attaching nothing; the gateway then serves only its own
/// health and socket routes
pub fn no_routes(router: Router<AppState>) -> Router<AppState> {
    router
}
