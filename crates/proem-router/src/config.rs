//! Serializable configuration for routes and the dispatcher.
//!
//! Route tables can be described in JSON:
//!
//! ```json
//! [
//!     {"name": "home", "rule": "/", "options": {"targets": {"controller": "index"}}},
//!     {
//!         "name": "post",
//!         "rule": "/post/{id}",
//!         "options": {"method": "GET", "filters": {"id": "{int}"}}
//!     }
//! ]
//! ```

use serde::Deserialize;

use crate::dispatch::ControllerMap;
use crate::error::Result;
use crate::manager::RouteManager;
use crate::route::{Route, RouteOptions};

/// Default controller map template.
pub const DEFAULT_CONTROLLER_MAP: &str = "Module\\{module}\\Controller\\{controller}";

/// Default action map template.
pub const DEFAULT_ACTION_MAP: &str = "{action}Action";

/// One entry of a route table.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteDefinition {
    /// Name the route is attached under.
    pub name: String,
    /// The rule, e.g. `/{controller}/{action?}`.
    pub rule: String,
    /// Matching options.
    #[serde(default)]
    pub options: RouteOptions,
}

impl From<RouteDefinition> for Route {
    fn from(definition: RouteDefinition) -> Self {
        Self::with_options(definition.rule, definition.options)
    }
}

impl RouteManager {
    /// Attaches every definition, in order.
    pub fn load(&mut self, definitions: impl IntoIterator<Item = RouteDefinition>) -> &mut Self {
        for definition in definitions {
            let name = definition.name.clone();
            self.attach(name, definition);
        }
        self
    }

    /// Builds a manager from a JSON array of route definitions.
    ///
    /// # Errors
    ///
    /// Fails if the JSON does not describe a valid route table.
    pub fn from_json(json: &str) -> Result<Self> {
        let definitions: Vec<RouteDefinition> = serde_json::from_str(json)?;
        let mut manager = Self::new();
        manager.load(definitions);
        Ok(manager)
    }
}

/// Naming conventions used by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatcherConfig {
    /// Module used when the payload has none.
    pub default_module: String,
    /// Controller used when the payload has none.
    pub default_controller: String,
    /// Action used when the payload has none.
    pub default_action: String,
    /// Controller maps, tried by descending priority.
    pub controller_maps: Vec<ControllerMap>,
    /// Template deriving a method name from an action name.
    pub action_map: String,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            default_module: "index".to_string(),
            default_controller: "index".to_string(),
            default_action: "index".to_string(),
            controller_maps: vec![ControllerMap::new(DEFAULT_CONTROLLER_MAP, 0)],
            action_map: DEFAULT_ACTION_MAP.to_string(),
        }
    }
}

impl DispatcherConfig {
    /// Parses a configuration from JSON. Missing fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Fails on malformed JSON or unknown fields.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
