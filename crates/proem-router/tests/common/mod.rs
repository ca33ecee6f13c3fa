#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use proem_router::{
    Controller, ControllerRegistry, Payload, Request, Response, Route, RouteManager, Routed,
};

pub fn matched(route: &Route, request: &Request) -> Payload {
    route
        .process(request)
        .unwrap_or_else(|e| panic!("Failed to match {}: {e}", route.rule()))
        .unwrap_or_else(|| panic!("Expected {} to match {}", route.rule(), request.path))
}

pub fn rejected(route: &Route, request: &Request) {
    let result = route
        .process(request)
        .unwrap_or_else(|e| panic!("Failed to match {}: {e}", route.rule()));
    assert!(
        result.is_none(),
        "Expected {} not to match {}",
        route.rule(),
        request.path
    );
}

/// Drains one `route()` cycle, collecting the names of matched routes.
pub fn route_names(manager: &mut RouteManager, request: &Request) -> Vec<String> {
    let mut names = Vec::new();
    while let Some(routed) = manager.route(request).unwrap() {
        match routed {
            Routed::Route(m) => names.push(m.name.to_string()),
            Routed::Callback(_) => names.push("<callback>".to_string()),
        }
    }
    names
}

pub type Log = Arc<Mutex<Vec<String>>>;

/// A controller recording every hook it goes through.
pub struct Recorder {
    pub log: Log,
}

impl Controller for Recorder {
    fn actions(&self) -> &'static [&'static str] {
        &["indexAction", "viewAction"]
    }

    fn pre_action(&mut self, _request: &mut Request) {
        self.log.lock().unwrap().push("preAction".to_string());
    }

    fn call(&mut self, action: &str, request: &mut Request) -> Response {
        self.log.lock().unwrap().push(action.to_string());
        let params: Vec<String> = request
            .params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        Response::text(params.join("&"))
    }

    fn post_action(&mut self, _request: &Request, _response: &mut Response) {
        self.log.lock().unwrap().push("postAction".to_string());
    }
}

pub fn recorder_registry(names: &[&str], log: &Log) -> ControllerRegistry {
    names.iter().fold(ControllerRegistry::new(), |registry, name| {
        let log = log.clone();
        registry.register(*name, move || Recorder { log: log.clone() })
    })
}
