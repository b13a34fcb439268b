//! Request-tracking and authorization middleware.

pub mod auth_filter;
pub mod forwarded;
pub mod request_tracking;

pub use auth_filter::auth_filter;
pub use forwarded::{forwarded_headers, ForwardedInfo};
pub use request_tracking::{
    request_id_layer, request_id_propagation_layer, sensitive_headers_layer,
    PROPAGATE_HEADERS, SENSITIVE_HEADERS, TRACE_ID_HEADER,
};
