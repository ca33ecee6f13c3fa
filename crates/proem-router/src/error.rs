//! Error types for routing and dispatch.

use thiserror::Error;

/// Router-specific errors.
///
/// A request that simply fails to match a route is not an error; matching
/// returns `None`. These variants cover route exhaustion at the front router
/// and configuration defects that should surface loudly.
#[derive(Debug, Error)]
pub enum RouterError {
    /// Every candidate route was tried and none could be dispatched.
    #[error("no route matched: {method} {path}")]
    NotFound { method: String, path: String },

    /// A custom filter refers to a named filter that does not exist.
    #[error("token `{token}` refers to undefined filter `{filter}`")]
    UndefinedFilter { token: String, filter: String },

    /// A rule or filter did not compile into a valid regular expression.
    #[error("invalid route pattern `{rule}`: {reason}")]
    InvalidPattern { rule: String, reason: String },

    /// An HTTP method string could not be parsed.
    #[error("invalid method: {0}")]
    InvalidMethod(String),

    /// A scheme string could not be parsed.
    #[error("invalid scheme: {0}")]
    InvalidScheme(String),

    /// Route name not found.
    #[error("route not found: {0}")]
    RouteNotFound(String),

    /// A required token was missing when assembling a URL.
    #[error("missing parameter `{param}` for rule `{rule}`")]
    MissingParameter { rule: String, param: String },

    /// `dispatch` was called without a resolved dispatch target.
    #[error("payload is not dispatchable")]
    NotDispatchable,

    /// A route table could not be parsed.
    #[error("invalid route configuration: {0}")]
    Config(#[from] serde_json::Error),
}

/// Result type alias for router operations.
pub type Result<T> = std::result::Result<T, RouterError>;
