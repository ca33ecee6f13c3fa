//! Resolving payloads to controller actions.

use std::fmt;

use serde::Deserialize;
use tracing::{debug, trace};

use crate::config::DispatcherConfig;
use crate::controller::{Controller, ControllerRegistry};
use crate::error::{Result, RouterError};
use crate::payload::Payload;
use crate::request::Request;
use crate::response::Response;

/// A naming template locating a controller from module and controller names.
///
/// `{module}` and `{controller}` are substituted with the normalized names.
/// Maps with a higher priority are tried first; equal priorities keep the
/// order they were added in.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ControllerMap {
    /// Template such as `Module\{module}\Controller\{controller}`.
    pub template: String,
    /// Higher runs first.
    #[serde(default)]
    pub priority: i32,
}

impl ControllerMap {
    /// Creates a controller map.
    pub fn new(template: impl Into<String>, priority: i32) -> Self {
        Self {
            template: template.into(),
            priority,
        }
    }

    fn expand(&self, module: &str, controller: &str) -> String {
        self.template
            .replace("{module}", module)
            .replace("{controller}", controller)
    }
}

/// A controller action resolved from a payload, ready to run.
pub struct DispatchTarget {
    name: String,
    action: &'static str,
    controller: Box<dyn Controller>,
    payload: Payload,
}

impl DispatchTarget {
    /// Name of the resolved controller.
    pub fn controller_name(&self) -> &str {
        &self.name
    }

    /// Method name of the resolved action.
    pub fn action(&self) -> &str {
        self.action
    }

    /// The payload the target was resolved from.
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Injects the payload into `request` and runs the pre-action hook, the
    /// action and the post-action hook.
    ///
    /// Payload values never replace parameters already set on the request.
    pub fn dispatch(mut self, request: &mut Request) -> Response {
        for (key, value) in self.payload.iter() {
            if !request.params.contains(key) {
                request.params.insert(key, value);
            }
        }

        debug!(controller = %self.name, action = self.action, "dispatching");
        self.controller.pre_action(request);
        let mut response = self.controller.call(self.action, request);
        self.controller.post_action(request, &mut response);
        response
    }
}

impl fmt::Debug for DispatchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchTarget")
            .field("name", &self.name)
            .field("action", &self.action)
            .field("payload", &self.payload)
            .finish_non_exhaustive()
    }
}

/// Resolves payloads to controllers through controller maps and an action
/// map, and runs them.
///
/// [`Dispatcher::resolve`] is stateless. [`Dispatcher::is_dispatchable`] and
/// [`Dispatcher::dispatch`] keep the last resolution between the two calls.
pub struct Dispatcher {
    registry: ControllerRegistry,
    config: DispatcherConfig,
    resolved: Option<DispatchTarget>,
}

impl Dispatcher {
    /// Creates a dispatcher with the default configuration.
    pub fn new(registry: ControllerRegistry) -> Self {
        Self::with_config(registry, DispatcherConfig::default())
    }

    /// Creates a dispatcher with the given configuration.
    pub fn with_config(registry: ControllerRegistry, mut config: DispatcherConfig) -> Self {
        sort_maps(&mut config.controller_maps);
        Self {
            registry,
            config,
            resolved: None,
        }
    }

    /// Adds a controller map.
    pub fn add_controller_map(&mut self, template: impl Into<String>, priority: i32) -> &mut Self {
        self.config
            .controller_maps
            .push(ControllerMap::new(template, priority));
        sort_maps(&mut self.config.controller_maps);
        self
    }

    /// Replaces the action map template, e.g. `{action}Action`.
    pub fn set_action_map(&mut self, template: impl Into<String>) -> &mut Self {
        self.config.action_map = template.into();
        self
    }

    /// Controller maps in the order they are tried.
    pub fn controller_maps(&self) -> &[ControllerMap] {
        &self.config.controller_maps
    }

    /// Returns the registry.
    pub fn registry(&self) -> &ControllerRegistry {
        &self.registry
    }

    /// Finds the controller and action a payload refers to.
    ///
    /// Missing `module`, `controller` or `action` values fall back to the
    /// configured defaults. Returns `None` for an unpopulated payload or
    /// when no controller map leads to a registered controller exposing the
    /// action.
    pub fn resolve(&self, payload: &Payload) -> Option<DispatchTarget> {
        if !payload.is_populated() {
            return None;
        }

        let module = normalize(payload.get("module").unwrap_or(&self.config.default_module));
        let controller = normalize(
            payload
                .get("controller")
                .unwrap_or(&self.config.default_controller),
        );
        let action = payload.get("action").unwrap_or(&self.config.default_action);
        let method = self.config.action_map.replace("{action}", action);

        for map in &self.config.controller_maps {
            let name = map.expand(&module, &controller);
            let Some(instance) = self.registry.create(&name) else {
                trace!(controller = %name, "no such controller");
                continue;
            };
            let Some(action) = instance.find_action(&method) else {
                trace!(controller = %name, action = %method, "no such action");
                continue;
            };

            debug!(controller = %name, action, "dispatch target resolved");
            return Some(DispatchTarget {
                name,
                action,
                controller: instance,
                payload: payload.clone(),
            });
        }

        None
    }

    /// Resolves `payload` and keeps the result for [`Dispatcher::dispatch`].
    pub fn is_dispatchable(&mut self, payload: &Payload) -> bool {
        self.resolved = self.resolve(payload);
        self.resolved.is_some()
    }

    /// Runs the target found by the last successful
    /// [`Dispatcher::is_dispatchable`].
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::NotDispatchable`] if nothing was resolved.
    pub fn dispatch(&mut self, request: &mut Request) -> Result<Response> {
        let target = self.resolved.take().ok_or(RouterError::NotDispatchable)?;
        Ok(target.dispatch(request))
    }
}

fn sort_maps(maps: &mut [ControllerMap]) {
    maps.sort_by(|a, b| b.priority.cmp(&a.priority));
}

/// Lower-cases a name and upper-cases its first letter.
fn normalize(name: &str) -> String {
    let lower = name.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::request::Params;

    type Calls = Arc<Mutex<Vec<String>>>;

    struct Recording {
        calls: Calls,
    }

    impl Controller for Recording {
        fn actions(&self) -> &'static [&'static str] {
            &["indexAction"]
        }

        fn pre_action(&mut self, _request: &mut Request) {
            self.calls.lock().unwrap().push("pre".to_string());
        }

        fn call(&mut self, action: &str, _request: &mut Request) -> Response {
            self.calls.lock().unwrap().push(action.to_string());
            Response::text(action)
        }

        fn post_action(&mut self, _request: &Request, response: &mut Response) {
            self.calls.lock().unwrap().push("post".to_string());
            response.headers.insert("X-Post".to_string(), "1".to_string());
        }
    }

    fn payload(pairs: &[(&str, &str)]) -> Payload {
        Payload::populated(pairs.iter().copied().collect::<Params>())
    }

    fn recording(name: &str, calls: &Calls) -> ControllerRegistry {
        let calls = calls.clone();
        ControllerRegistry::new().register(name, move || Recording {
            calls: calls.clone(),
        })
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("index"), "Index");
        assert_eq!(normalize("BLOG"), "Blog");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_dispatch_runs_hooks_in_order() {
        let calls = Calls::default();
        let mut dispatcher = Dispatcher::new(recording("Module\\Index\\Controller\\Index", &calls));
        let payload = payload(&[("module", "index"), ("controller", "index"), ("action", "index")]);

        assert!(dispatcher.is_dispatchable(&payload));
        let response = dispatcher.dispatch(&mut Request::get("/")).unwrap();

        assert_eq!(*calls.lock().unwrap(), ["pre", "indexAction", "post"]);
        assert_eq!(response.headers.get("X-Post"), Some(&"1".to_string()));
    }

    #[test]
    fn test_unpopulated_payload_is_not_dispatchable() {
        let calls = Calls::default();
        let mut dispatcher = Dispatcher::new(recording("Module\\Index\\Controller\\Index", &calls));
        assert!(!dispatcher.is_dispatchable(&Payload::new()));
        assert!(matches!(
            dispatcher.dispatch(&mut Request::get("/")),
            Err(RouterError::NotDispatchable)
        ));
    }

    #[test]
    fn test_defaults_fill_missing_names() {
        let calls = Calls::default();
        let dispatcher = Dispatcher::new(recording("Module\\Index\\Controller\\Index", &calls));
        let target = dispatcher.resolve(&payload(&[])).unwrap();
        assert_eq!(target.controller_name(), "Module\\Index\\Controller\\Index");
        assert_eq!(target.action(), "indexAction");
    }

    #[test]
    fn test_missing_action_is_not_dispatchable() {
        let calls = Calls::default();
        let dispatcher = Dispatcher::new(recording("Module\\Index\\Controller\\Index", &calls));
        assert!(dispatcher.resolve(&payload(&[("action", "edit")])).is_none());
    }

    #[test]
    fn test_higher_priority_map_wins() {
        let calls = Calls::default();
        let registry = recording("Module\\Index\\Controller\\Index", &calls)
            .register("App\\Index\\Index", move || Recording {
                calls: Calls::default(),
            });
        let mut dispatcher = Dispatcher::new(registry);
        dispatcher.add_controller_map("App\\{module}\\{controller}", 10);

        let target = dispatcher.resolve(&payload(&[])).unwrap();
        assert_eq!(target.controller_name(), "App\\Index\\Index");
    }

    #[test]
    fn test_maps_fall_through_in_order() {
        let calls = Calls::default();
        let mut dispatcher = Dispatcher::new(recording("Module\\Index\\Controller\\Index", &calls));
        dispatcher.add_controller_map("Missing\\{controller}", 5);
        dispatcher.add_controller_map("Other\\{controller}", 5);

        let templates: Vec<&str> = dispatcher
            .controller_maps()
            .iter()
            .map(|m| m.template.as_str())
            .collect();
        assert_eq!(
            templates,
            [
                "Missing\\{controller}",
                "Other\\{controller}",
                "Module\\{module}\\Controller\\{controller}"
            ]
        );
        assert!(dispatcher.resolve(&payload(&[])).is_some());
    }

    #[test]
    fn test_custom_action_map() {
        let calls = Calls::default();
        let mut dispatcher = Dispatcher::new(recording("Module\\Index\\Controller\\Index", &calls));
        dispatcher.set_action_map("{action}");
        assert!(dispatcher.resolve(&payload(&[("action", "index")])).is_none());
        assert!(dispatcher
            .resolve(&payload(&[("action", "indexAction")]))
            .is_some());
    }

    #[test]
    fn test_payload_does_not_replace_request_params() {
        let calls = Calls::default();
        let dispatcher = Dispatcher::new(recording("Module\\Index\\Controller\\Index", &calls));
        let target = dispatcher.resolve(&payload(&[("id", "1"), ("page", "2")])).unwrap();

        let mut request = Request::get("/");
        request.params.insert("id", "9");
        target.dispatch(&mut request);

        assert_eq!(request.param("id"), Some("9"));
        assert_eq!(request.param("page"), Some("2"));
    }
}
