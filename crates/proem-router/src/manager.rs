//! Route registry and match iteration.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{Result, RouterError};
use crate::payload::Payload;
use crate::request::{Method, Params, Request, Scheme};
use crate::response::Response;
use crate::route::{Route, RouteOptions};

/// Partition key: routes are indexed by scheme and method, `None` being any.
type Partition = (Scheme, Option<Method>);

/// A route and the name it was attached under.
///
/// Names are not unique; attaching twice under one name keeps both routes.
#[derive(Debug, Clone)]
pub struct NamedRoute {
    name: String,
    route: Route,
}

impl NamedRoute {
    /// Returns the name the route was attached under.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the route.
    pub fn route(&self) -> &Route {
        &self.route
    }
}

/// A route that matched a request, with the payload it produced.
#[derive(Debug)]
pub struct RouteMatch<'a> {
    /// Name the route was attached under.
    pub name: &'a str,
    /// The matched route.
    pub route: &'a Route,
    /// Values produced by the match.
    pub payload: Payload,
}

/// Outcome of a successful match.
#[derive(Debug)]
pub enum Routed<'a> {
    /// A route without a callback matched; the caller dispatches it.
    Route(RouteMatch<'a>),
    /// A route with a callback matched and the callback already ran.
    Callback(Response),
}

/// Runs the callback of a matched route, or hands the route back.
fn routed<'a>(named: &'a NamedRoute, request: &Request, payload: Payload) -> Routed<'a> {
    debug!(name = %named.name, rule = named.route.rule(), "route matched");
    match named.route.get_callback() {
        Some(callback) => Routed::Callback(callback(request, &payload)),
        None => Routed::Route(RouteMatch {
            name: &named.name,
            route: &named.route,
            payload,
        }),
    }
}

/// Routes of interest for one request and how far they have been tried.
#[derive(Debug)]
struct Cursor {
    candidates: Vec<usize>,
    position: usize,
}

/// Registry of routes.
///
/// For a request, routes registered for its exact method are tried before
/// routes registered for any method, each group in registration order, and
/// only routes of the request's scheme take part.
///
/// [`RouteManager::route`] walks matches one call at a time and resets
/// itself once exhausted. [`RouteManager::matches`] does the same walk
/// without touching the manager, so a single manager can serve concurrent
/// requests.
///
/// # Example
///
/// ```
/// use proem_router::{Method, Request, Route, RouteManager, Routed};
///
/// let mut manager = RouteManager::new();
/// manager.attach("any", Route::new("/{controller}"));
/// manager.attach("get", Route::new("/{controller}").method(Method::Get));
///
/// let request = Request::get("/users");
/// let mut names = Vec::new();
/// while let Some(Routed::Route(m)) = manager.route(&request).unwrap() {
///     names.push(m.name.to_string());
/// }
/// assert_eq!(names, ["get", "any"]);
/// ```
#[derive(Debug, Default)]
pub struct RouteManager {
    routes: Vec<NamedRoute>,
    partitions: HashMap<Partition, Vec<usize>>,
    group_attributes: Option<RouteOptions>,
    cursor: Option<Cursor>,
}

impl RouteManager {
    /// Creates an empty manager.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a route under `name`.
    ///
    /// Inside [`RouteManager::group`] the group attributes fill any option
    /// the route leaves unset.
    pub fn attach(&mut self, name: impl Into<String>, route: impl Into<Route>) -> &mut Self {
        let mut route = route.into();
        if let Some(defaults) = &self.group_attributes {
            route = route.with_defaults(defaults);
        }

        let name = name.into();
        let partition = (route.route_scheme(), route.route_method());
        debug!(
            %name,
            rule = route.rule(),
            scheme = %partition.0,
            method = partition.1.map_or("*", |m| m.as_str()),
            "route attached"
        );

        self.partitions
            .entry(partition)
            .or_default()
            .push(self.routes.len());
        self.routes.push(NamedRoute { name, route });
        self
    }

    /// Attaches a route built from `rule` and `options`.
    pub fn attach_rule(
        &mut self,
        name: impl Into<String>,
        rule: impl Into<String>,
        options: RouteOptions,
    ) -> &mut Self {
        self.attach(name, Route::with_options(rule, options))
    }

    /// Registers routes with shared attributes.
    ///
    /// `attributes` act as defaults for every route attached inside `f`.
    /// Groups nest; inner attributes take precedence over outer ones.
    pub fn group<F>(&mut self, attributes: RouteOptions, f: F) -> &mut Self
    where
        F: FnOnce(&mut Self),
    {
        let outer = self.group_attributes.take();
        let attributes = match &outer {
            Some(outer) => attributes.with_defaults(outer),
            None => attributes,
        };
        self.group_attributes = Some(attributes);
        f(self);
        self.group_attributes = outer;
        self
    }

    /// Returns the next route matching `request`.
    ///
    /// The candidate list is built on the first call of a cycle. Each call
    /// resumes after the last candidate tried. When the candidates run out
    /// the cycle resets and `None` is returned, so the next call starts
    /// over.
    ///
    /// A route with a callback is not returned; its callback is invoked and
    /// the response returned as [`Routed::Callback`].
    ///
    /// # Errors
    ///
    /// Fails if a candidate route is misconfigured. The cycle continues past
    /// that route on the next call.
    pub fn route(&mut self, request: &Request) -> Result<Option<Routed<'_>>> {
        if self.cursor.is_none() {
            self.cursor = Some(Cursor {
                candidates: self.candidates(request),
                position: 0,
            });
        }

        loop {
            let Some(cursor) = self.cursor.as_mut() else {
                return Ok(None);
            };
            let Some(&index) = cursor.candidates.get(cursor.position) else {
                self.cursor = None;
                return Ok(None);
            };
            cursor.position += 1;

            let Some(named) = self.routes.get(index) else {
                continue;
            };
            if let Some(payload) = named.route.process(request)? {
                return Ok(Some(routed(named, request, payload)));
            }
        }
    }

    /// Discards the current [`RouteManager::route`] cycle.
    pub fn reset(&mut self) {
        self.cursor = None;
    }

    /// Iterates over every route matching `request`, in the same order as
    /// [`RouteManager::route`], without keeping state in the manager.
    pub fn matches<'a>(&'a self, request: &'a Request) -> Matches<'a> {
        let candidates = self
            .candidates(request)
            .into_iter()
            .filter_map(|index| self.routes.get(index))
            .collect::<Vec<_>>();
        Matches {
            candidates: candidates.into_iter(),
            request,
        }
    }

    /// Builds a URL for the first route attached under `name`.
    ///
    /// # Errors
    ///
    /// Fails if no route has that name or a required token is missing.
    pub fn url_for(&self, name: &str, params: &Params) -> Result<String> {
        self.get(name)
            .ok_or_else(|| RouterError::RouteNotFound(name.to_string()))?
            .assemble(params)
    }

    /// Returns the first route attached under `name`.
    pub fn get(&self, name: &str) -> Option<&Route> {
        self.routes
            .iter()
            .find(|named| named.name == name)
            .map(|named| &named.route)
    }

    /// Iterates over all routes in registration order.
    pub fn routes(&self) -> impl Iterator<Item = &NamedRoute> {
        self.routes.iter()
    }

    /// Number of attached routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns whether no route is attached.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Indices of routes of interest: exact method first, then any method.
    fn candidates(&self, request: &Request) -> Vec<usize> {
        [
            (request.scheme, Some(request.method)),
            (request.scheme, None),
        ]
        .iter()
        .filter_map(|partition| self.partitions.get(partition))
        .flatten()
        .copied()
        .collect()
    }
}

/// Iterator over the routes matching a request.
///
/// Created by [`RouteManager::matches`].
pub struct Matches<'a> {
    candidates: std::vec::IntoIter<&'a NamedRoute>,
    request: &'a Request,
}

impl<'a> Iterator for Matches<'a> {
    type Item = Result<Routed<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        for named in self.candidates.by_ref() {
            match named.route.process(self.request) {
                Ok(Some(payload)) => return Some(Ok(routed(named, self.request, payload))),
                Ok(None) => {}
                Err(e) => return Some(Err(e)),
            }
        }
        None
    }
}
