//! # proem-router
//!
//! Pattern-based request routing and controller dispatch.
//!
//! This crate provides:
//! - Rule compilation with `{token}`, optional `{token?}` and legacy `:token`
//!   placeholders, constrained by named or custom regex filters
//! - Routes matching on method, scheme, hostname and path, with static
//!   targets merged into the match payload
//! - A route manager trying method-specific routes before wildcard ones
//! - A dispatcher resolving payloads to controllers through naming templates
//!
//! ## Quick Start
//!
//! ```
//! use proem_router::{
//!     Controller, ControllerRegistry, Dispatcher, Request, Response, RouteManager, Router,
//! };
//!
//! struct Index;
//!
//! impl Controller for Index {
//!     fn actions(&self) -> &'static [&'static str] {
//!         &["indexAction"]
//!     }
//!
//!     fn call(&mut self, _action: &str, _request: &mut Request) -> Response {
//!         Response::text("Hello, World!")
//!     }
//! }
//!
//! let mut routes = RouteManager::new();
//! routes.attach("default", "/{module?}/{controller?}/{action?}");
//!
//! let registry = ControllerRegistry::new().register("Module\\Index\\Controller\\Index", || Index);
//! let router = Router::new(routes, Dispatcher::new(registry));
//!
//! let response = router.handle(Request::get("/"));
//! assert_eq!(response.body_string(), Some("Hello, World!".to_string()));
//! ```
//!
//! ## Tokens and Filters
//!
//! Tokens match `[a-zA-Z0-9_+\-%]+` unless told otherwise. A token named
//! `params` also accepts `/` and, when it holds `key/value` pairs, is
//! exploded into separate payload values.
//!
//! ```
//! use proem_router::{Request, Route};
//!
//! let route = Route::new("/post/{id}/{params?}").filter("id", "{int}");
//! let payload = route.process(&Request::get("/post/7/page/2")).unwrap().unwrap();
//! assert_eq!(payload.get("id"), Some("7"));
//! assert_eq!(payload.get("page"), Some("2"));
//! ```
//!
//! ## Hostnames
//!
//! ```
//! use proem_router::{Request, Route};
//!
//! let route = Route::new("/").hostname("{username}.domain.com");
//! let request = Request::get("/").host("trq.domain.com");
//! let payload = route.process(&request).unwrap().unwrap();
//! assert_eq!(payload.get("username"), Some("trq"));
//! ```
//!
//! ## Groups
//!
//! ```
//! use proem_router::{Method, RouteManager, RouteOptions};
//!
//! let mut routes = RouteManager::new();
//! let attributes = RouteOptions {
//!     method: Some(Method::Post),
//!     ..RouteOptions::default()
//! };
//! routes.group(attributes, |routes| {
//!     routes.attach("save", "/save/{id}");
//! });
//! assert_eq!(routes.get("save").unwrap().route_method(), Some(Method::Post));
//! ```

mod config;
mod controller;
mod dispatch;
mod error;
mod manager;
mod pattern;
mod payload;
mod request;
mod response;
mod route;
mod router;

pub use config::{DispatcherConfig, RouteDefinition, DEFAULT_ACTION_MAP, DEFAULT_CONTROLLER_MAP};
pub use controller::{Controller, ControllerFactory, ControllerRegistry};
pub use dispatch::{ControllerMap, DispatchTarget, Dispatcher};
pub use error::{Result, RouterError};
pub use manager::{Matches, NamedRoute, RouteManager, RouteMatch, Routed};
pub use pattern::{default_filter, CompiledPattern, DEFAULT_FILTERS};
pub use payload::{Payload, PARAMS_KEY};
pub use request::{Method, Params, Request, Scheme};
pub use response::Response;
pub use route::{Callback, Route, RouteOptions};
pub use router::Router;
