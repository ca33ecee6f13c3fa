//! Route definitions and matching.

use std::fmt;
use std::sync::{Arc, OnceLock};

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer};
use tracing::trace;

use crate::error::Result;
use crate::pattern::CompiledPattern;
use crate::payload::Payload;
use crate::request::{Method, Params, Request, Scheme};
use crate::response::Response;

/// A handler invoked directly when its route matches.
pub type Callback = Arc<dyn Fn(&Request, &Payload) -> Response + Send + Sync>;

/// Options controlling how a route matches.
///
/// Every field is optional so the same type doubles as the set of group
/// attributes applied to routes registered inside
/// [`RouteManager::group`](crate::RouteManager::group).
#[derive(Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RouteOptions {
    /// Static values merged into the payload, overriding matched values.
    pub targets: IndexMap<String, String>,
    /// Per-token filters: `{name}` of a default filter or a raw regex.
    pub filters: IndexMap<String, String>,
    /// Required method. `None` (or `"*"` in configuration) matches any.
    #[serde(deserialize_with = "deserialize_method")]
    pub method: Option<Method>,
    /// Pattern matched against the request host.
    pub hostname: Option<String>,
    /// Scheme the route is registered under; `http` when unset.
    pub scheme: Option<Scheme>,
    /// Handler invoked instead of returning the route.
    #[serde(skip)]
    pub callback: Option<Callback>,
}

impl RouteOptions {
    /// Fills every option that is unset here from `defaults`.
    ///
    /// Values already present always win, including individual keys of
    /// `targets` and `filters`.
    #[must_use]
    pub fn with_defaults(mut self, defaults: &Self) -> Self {
        for (key, value) in &defaults.targets {
            if !self.targets.contains_key(key) {
                self.targets.insert(key.clone(), value.clone());
            }
        }
        for (key, value) in &defaults.filters {
            if !self.filters.contains_key(key) {
                self.filters.insert(key.clone(), value.clone());
            }
        }
        self.method = self.method.or(defaults.method);
        self.scheme = self.scheme.or(defaults.scheme);
        if self.hostname.is_none() {
            self.hostname.clone_from(&defaults.hostname);
        }
        if self.callback.is_none() {
            self.callback.clone_from(&defaults.callback);
        }
        self
    }
}

impl fmt::Debug for RouteOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteOptions")
            .field("targets", &self.targets)
            .field("filters", &self.filters)
            .field("method", &self.method)
            .field("hostname", &self.hostname)
            .field("scheme", &self.scheme)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

fn deserialize_method<'de, D>(deserializer: D) -> std::result::Result<Option<Method>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(s) if s == "*" => Ok(None),
        Some(s) => s.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

/// A rule plus the options it matches with.
///
/// Compiled patterns are built on first use and kept for the lifetime of the
/// route, so a route can be matched from many requests without recompiling.
/// Matching itself never mutates the route.
#[derive(Clone)]
pub struct Route {
    rule: String,
    options: RouteOptions,
    compiled: OnceLock<CompiledPattern>,
    compiled_host: OnceLock<CompiledPattern>,
}

impl Route {
    /// Creates a route for `rule` with default options.
    pub fn new(rule: impl Into<String>) -> Self {
        Self::with_options(rule, RouteOptions::default())
    }

    /// Creates a route for `rule` with the given options.
    pub fn with_options(rule: impl Into<String>, options: RouteOptions) -> Self {
        Self {
            rule: rule.into(),
            options,
            compiled: OnceLock::new(),
            compiled_host: OnceLock::new(),
        }
    }

    /// Restricts the route to a method.
    #[must_use]
    pub fn method(mut self, method: Method) -> Self {
        self.options.method = Some(method);
        self
    }

    /// Adds a static target value.
    #[must_use]
    pub fn target(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.targets.insert(key.into(), value.into());
        self
    }

    /// Adds a filter for a token.
    #[must_use]
    pub fn filter(mut self, token: impl Into<String>, filter: impl Into<String>) -> Self {
        self.options_mut().filters.insert(token.into(), filter.into());
        self
    }

    /// Sets the hostname pattern.
    #[must_use]
    pub fn hostname(mut self, hostname: impl Into<String>) -> Self {
        self.options_mut().hostname = Some(hostname.into());
        self
    }

    /// Sets the scheme the route is registered under.
    #[must_use]
    pub fn scheme(mut self, scheme: Scheme) -> Self {
        self.options.scheme = Some(scheme);
        self
    }

    /// Sets a callback invoked when the route matches.
    #[must_use]
    pub fn callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Request, &Payload) -> Response + Send + Sync + 'static,
    {
        self.options.callback = Some(Arc::new(callback));
        self
    }

    /// Applies group attributes as defaults for unset options.
    #[must_use]
    pub fn with_defaults(mut self, defaults: &RouteOptions) -> Self {
        let options = std::mem::take(self.options_mut());
        self.options = options.with_defaults(defaults);
        self
    }

    /// Returns the rule.
    pub fn rule(&self) -> &str {
        &self.rule
    }

    /// Returns the options.
    pub fn options(&self) -> &RouteOptions {
        &self.options
    }

    /// Returns the scheme the route is registered under.
    pub fn route_scheme(&self) -> Scheme {
        self.options.scheme.unwrap_or_default()
    }

    /// Returns the method restriction, `None` for any method.
    pub fn route_method(&self) -> Option<Method> {
        self.options.method
    }

    /// Returns the callback, if any.
    pub fn get_callback(&self) -> Option<&Callback> {
        self.options.callback.as_ref()
    }

    /// Attempts to match `request`.
    ///
    /// Returns `Ok(None)` when the route does not match. The method is
    /// checked before any pattern work, then the hostname, then the path.
    /// Hostname values are merged first, path values next and targets
    /// last, so targets override matched values of the same name.
    ///
    /// # Errors
    ///
    /// Fails if a filter of this route is misconfigured.
    pub fn process(&self, request: &Request) -> Result<Option<Payload>> {
        if let Some(method) = self.options.method {
            if method != request.method {
                trace!(rule = %self.rule, %method, "method mismatch");
                return Ok(None);
            }
        }

        let mut values = Params::new();

        if let Some(hostname) = &self.options.hostname {
            let pattern = cached(&self.compiled_host, hostname, &self.options.filters)?;
            let Some(host_values) = pattern.captures(request.http_host()) else {
                trace!(rule = %self.rule, host = request.http_host(), "hostname mismatch");
                return Ok(None);
            };
            values.extend(host_values.iter());
        }

        let pattern = cached(&self.compiled, &self.rule, &self.options.filters)?;
        let Some(path_values) = pattern.captures(&request.path) else {
            trace!(rule = %self.rule, path = %request.path, "path mismatch");
            return Ok(None);
        };
        values.extend(path_values.iter());
        values.extend(
            self.options
                .targets
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str())),
        );

        Ok(Some(Payload::populated(values)))
    }

    /// Returns the compiled path pattern.
    ///
    /// # Errors
    ///
    /// Fails if a filter of this route is misconfigured.
    pub fn pattern(&self) -> Result<&CompiledPattern> {
        cached(&self.compiled, &self.rule, &self.options.filters)
    }

    /// Builds a path for this route from `params`.
    ///
    /// # Errors
    ///
    /// Fails if a required token is missing or a filter is misconfigured.
    pub fn assemble(&self, params: &Params) -> Result<String> {
        self.pattern()?.assemble(params)
    }

    /// Mutable access to options that feed compiled patterns.
    fn options_mut(&mut self) -> &mut RouteOptions {
        self.compiled = OnceLock::new();
        self.compiled_host = OnceLock::new();
        &mut self.options
    }
}

impl From<&str> for Route {
    fn from(rule: &str) -> Self {
        Self::new(rule)
    }
}

impl From<String> for Route {
    fn from(rule: String) -> Self {
        Self::new(rule)
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("rule", &self.rule)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

fn cached<'a>(
    cell: &'a OnceLock<CompiledPattern>,
    rule: &str,
    filters: &IndexMap<String, String>,
) -> Result<&'a CompiledPattern> {
    if let Some(pattern) = cell.get() {
        return Ok(pattern);
    }
    let pattern = CompiledPattern::new(rule, filters)?;
    Ok(cell.get_or_init(|| pattern))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RouterError;

    #[test]
    fn test_module_controller_action() {
        let route = Route::new("/{module}/{controller}/{action}");
        let req = Request::get("/somemodule/somecontroller/someaction");
        let payload = route.process(&req).unwrap().unwrap();

        assert!(payload.is_populated());
        assert_eq!(payload.get("module"), Some("somemodule"));
        assert_eq!(payload.get("controller"), Some("somecontroller"));
        assert_eq!(payload.get("action"), Some("someaction"));
    }

    #[test]
    fn test_method_mismatch() {
        let route = Route::new("/").method(Method::Post);
        assert!(route.process(&Request::get("/")).unwrap().is_none());
        assert!(route.process(&Request::post("/")).unwrap().is_some());
    }

    #[test]
    fn test_method_checked_before_filters() {
        let route = Route::new("/{id}").filter("id", "{missing}").method(Method::Post);
        assert!(route.process(&Request::get("/1")).unwrap().is_none());
        assert!(route.process(&Request::post("/1")).is_err());
    }

    #[test]
    fn test_targets_override_matches() {
        let route = Route::new("/{controller}/{action}").target("action", "index");
        let payload = route.process(&Request::get("/user/edit")).unwrap().unwrap();
        assert_eq!(payload.get("controller"), Some("user"));
        assert_eq!(payload.get("action"), Some("index"));
    }

    #[test]
    fn test_custom_filter() {
        let route = Route::new("/{custom}").filter("custom", "{int}");
        assert!(route.process(&Request::get("/200")).unwrap().is_some());
        assert!(route.process(&Request::get("/abc")).unwrap().is_none());
    }

    #[test]
    fn test_undefined_filter_fails_at_match_time() {
        let route = Route::new("/{custom}").filter("custom", "{undefined}");
        let err = route.process(&Request::get("/200")).unwrap_err();
        assert!(matches!(err, RouterError::UndefinedFilter { .. }));
    }

    #[test]
    fn test_hostname() {
        let route = Route::new("/").hostname("{username}.domain.com");
        let req = Request::get("/").host("trq.domain.com");
        let payload = route.process(&req).unwrap().unwrap();
        assert_eq!(payload.get("username"), Some("trq"));

        let other = Request::get("/").host("trq.other.com");
        assert!(route.process(&other).unwrap().is_none());
    }

    #[test]
    fn test_hostname_mismatch_wins_over_path_match() {
        let route = Route::new("/{controller}").hostname("admin.domain.com");
        let req = Request::get("/users").host("www.domain.com");
        assert!(route.process(&req).unwrap().is_none());
    }

    #[test]
    fn test_optional_token_absent() {
        let route = Route::new("/{controller}/{action?}");
        let payload = route.process(&Request::get("/user")).unwrap().unwrap();
        assert!(!payload.has("action"));
    }

    #[test]
    fn test_params_explode() {
        let route = Route::new("/{controller}/{params}");
        let payload = route.process(&Request::get("/user/a/b/c/d")).unwrap().unwrap();
        assert_eq!(payload.get("a"), Some("b"));
        assert_eq!(payload.get("c"), Some("d"));
        assert!(!payload.has("params"));
    }

    #[test]
    fn test_values_are_decoded() {
        let route = Route::new("/tag/{tag}");
        let payload = route.process(&Request::get("/tag/rust%2Dlang")).unwrap().unwrap();
        assert_eq!(payload.get("tag"), Some("rust-lang"));
    }

    #[test]
    fn test_encoded_slash_in_params() {
        let route = Route::new("/{controller}/{params}");
        let payload = route
            .process(&Request::get("/c/path/a%2Fb/page/2"))
            .unwrap()
            .unwrap();
        assert_eq!(payload.get("controller"), Some("c"));
        assert_eq!(payload.get("path"), Some("a/b"));
        assert_eq!(payload.get("page"), Some("2"));
        assert!(!payload.has("params"));
    }

    #[test]
    fn test_callback_is_kept() {
        let route = Route::new("/").callback(|_, _| Response::text("hi"));
        assert!(route.get_callback().is_some());
    }

    #[test]
    fn test_group_defaults_do_not_override() {
        let defaults = RouteOptions {
            method: Some(Method::Post),
            scheme: Some(Scheme::Https),
            targets: [("module".to_string(), "admin".to_string())]
                .into_iter()
                .collect(),
            ..RouteOptions::default()
        };
        let route = Route::new("/")
            .method(Method::Get)
            .target("module", "blog")
            .with_defaults(&defaults);

        assert_eq!(route.route_method(), Some(Method::Get));
        assert_eq!(route.route_scheme(), Scheme::Https);
        assert_eq!(route.options().targets.get("module").map(String::as_str), Some("blog"));
    }

    #[test]
    fn test_options_from_json() {
        let options: RouteOptions = serde_json::from_str(
            r#"{"method": "get", "filters": {"id": "{int}"}, "scheme": "https"}"#,
        )
        .unwrap();
        assert_eq!(options.method, Some(Method::Get));
        assert_eq!(options.scheme, Some(Scheme::Https));

        let any: RouteOptions = serde_json::from_str(r#"{"method": "*"}"#).unwrap();
        assert_eq!(any.method, None);
    }
}
