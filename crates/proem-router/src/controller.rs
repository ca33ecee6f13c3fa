//! Controller capability and registry.

use std::collections::HashMap;
use std::sync::Arc;

use crate::request::Request;
use crate::response::Response;

/// A handler that actions are dispatched to.
///
/// The dispatcher looks an action up by the method name produced from the
/// action map (e.g. `indexAction`), then calls [`Controller::pre_action`],
/// [`Controller::call`] and [`Controller::post_action`] in that order.
///
/// # Example
///
/// ```
/// use proem_router::{Controller, Request, Response};
///
/// struct Index;
///
/// impl Controller for Index {
///     fn actions(&self) -> &'static [&'static str] {
///         &["indexAction"]
///     }
///
///     fn call(&mut self, action: &str, _request: &mut Request) -> Response {
///         match action {
///             "indexAction" => Response::text("home"),
///             _ => Response::not_found(),
///         }
///     }
/// }
///
/// assert_eq!(Index.find_action("INDEXACTION"), Some("indexAction"));
/// ```
pub trait Controller: Send + Sync {
    /// Method names this controller answers to.
    fn actions(&self) -> &'static [&'static str];

    /// Runs the named action. `action` is always one of [`Controller::actions`].
    fn call(&mut self, action: &str, request: &mut Request) -> Response;

    /// Runs before the action.
    fn pre_action(&mut self, _request: &mut Request) {}

    /// Runs after the action and may amend its response.
    fn post_action(&mut self, _request: &Request, _response: &mut Response) {}

    /// Finds the action matching `method`, ignoring ASCII case.
    fn find_action(&self, method: &str) -> Option<&'static str> {
        self.actions()
            .iter()
            .copied()
            .find(|action| action.eq_ignore_ascii_case(method))
    }
}

/// Creates a fresh controller for each dispatch.
pub type ControllerFactory = Arc<dyn Fn() -> Box<dyn Controller> + Send + Sync>;

/// Controllers known to the dispatcher, keyed by the names controller maps
/// produce (e.g. `Module\Index\Controller\Index`).
#[derive(Clone, Default)]
pub struct ControllerRegistry {
    factories: HashMap<String, ControllerFactory>,
}

impl ControllerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a controller factory under `name`.
    #[must_use]
    pub fn register<F, C>(mut self, name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> C + Send + Sync + 'static,
        C: Controller + 'static,
    {
        let factory: ControllerFactory =
            Arc::new(move || Box::new(factory()) as Box<dyn Controller>);
        self.factories.insert(name.into(), factory);
        self
    }

    /// Returns whether a controller is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Builds the controller registered under `name`.
    pub fn create(&self, name: &str) -> Option<Box<dyn Controller>> {
        self.factories.get(name).map(|factory| factory())
    }

    /// Iterates over the registered names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Blog;

    impl Controller for Blog {
        fn actions(&self) -> &'static [&'static str] {
            &["listAction", "viewAction"]
        }

        fn call(&mut self, action: &str, _request: &mut Request) -> Response {
            Response::text(action)
        }
    }

    #[test]
    fn test_find_action_ignores_case() {
        assert_eq!(Blog.find_action("viewaction"), Some("viewAction"));
        assert_eq!(Blog.find_action("editAction"), None);
    }

    #[test]
    fn test_registry_creates_controllers() {
        let registry =
            ControllerRegistry::new().register("Module\\Blog\\Controller\\Blog", || Blog);

        assert!(registry.contains("Module\\Blog\\Controller\\Blog"));
        assert!(registry.create("Module\\Blog\\Controller\\Post").is_none());

        let mut controller = registry.create("Module\\Blog\\Controller\\Blog").unwrap();
        let response = controller.call("listAction", &mut Request::get("/"));
        assert_eq!(response.body_string(), Some("listAction".to_string()));
    }

    #[test]
    fn test_registry_names() {
        let registry = ControllerRegistry::new()
            .register("Module\\Blog\\Controller\\Blog", || Blog)
            .register("Module\\Blog\\Controller\\Post", || Blog);

        let mut names: Vec<&str> = registry.names().collect();
        names.sort_unstable();
        assert_eq!(
            names,
            ["Module\\Blog\\Controller\\Blog", "Module\\Blog\\Controller\\Post"]
        );
    }
}
