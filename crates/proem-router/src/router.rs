//! Front router tying route matching to dispatch.

use tracing::{debug, error, warn};

use crate::dispatch::Dispatcher;
use crate::error::{Result, RouterError};
use crate::manager::{RouteManager, Routed};
use crate::request::Request;
use crate::response::Response;

/// Matches requests against a [`RouteManager`] and dispatches the first
/// dispatchable match.
///
/// Matching routes are tried in order. A route with a callback answers
/// immediately; otherwise its payload is resolved by the [`Dispatcher`], and
/// a route that resolves to nothing is skipped in favour of the next one.
///
/// The router keeps no per-request state, so one instance can be shared
/// between threads.
pub struct Router {
    routes: RouteManager,
    dispatcher: Dispatcher,
}

impl Router {
    /// Creates a router.
    pub fn new(routes: RouteManager, dispatcher: Dispatcher) -> Self {
        Self { routes, dispatcher }
    }

    /// Returns the route manager.
    pub fn routes(&self) -> &RouteManager {
        &self.routes
    }

    /// Returns the route manager for registering more routes.
    pub fn routes_mut(&mut self) -> &mut RouteManager {
        &mut self.routes
    }

    /// Returns the dispatcher.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Routes and dispatches a request.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::NotFound`] when no matching route could be
    /// dispatched, or the configuration error of a misconfigured route.
    pub fn dispatch_request(&self, request: &Request) -> Result<Response> {
        for routed in self.routes.matches(request) {
            match routed? {
                Routed::Callback(response) => return Ok(response),
                Routed::Route(matched) => match self.dispatcher.resolve(&matched.payload) {
                    Some(target) => {
                        let mut req = request.clone();
                        return Ok(target.dispatch(&mut req));
                    }
                    None => warn!(
                        name = matched.name,
                        rule = matched.route.rule(),
                        "matched route is not dispatchable"
                    ),
                },
            }
        }

        Err(RouterError::NotFound {
            method: request.method.to_string(),
            path: request.path.clone(),
        })
    }

    /// Handles a request, turning routing failures into responses.
    ///
    /// Exhausted routes give a 404; configuration errors give a 500.
    pub fn handle(&self, request: Request) -> Response {
        match self.dispatch_request(&request) {
            Ok(response) => response,
            Err(err @ RouterError::NotFound { .. }) => {
                debug!(%err, "responding 404");
                Response::not_found()
            }
            Err(err) => {
                error!(%err, method = %request.method, path = %request.path, "routing failed");
                Response::internal_server_error()
            }
        }
    }
}
