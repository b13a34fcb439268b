//! Pure, side-effect-free lookups over a [`RoutingConfig`](super::model::RoutingConfig).

use super::model::{RoutingConfig, Scope};

/// Read-only view over a routing configuration. Holds a reference so the
/// config can be shared behind an `Arc` across every request task without
/// copying.
pub struct Router<'a> {
    config: &'a RoutingConfig,
}

impl<'a> Router<'a> {
    pub fn new(config: &'a RoutingConfig) -> Self {
        Self { config }
    }

    /// Returns the target broker queue for a microservice, or `None` if the
    /// microservice is unknown. Intentionally non-throwing: callers serving
    /// HTTP turn `None` into `400 Unknown microservice` instead of a panic.
    pub fn resolve_queue(&self, ms: &str) -> Option<&str> {
        self.config
            .find_microservice(ms)
            .map(|m| m.queue.as_str())
    }

    /// Returns the declared resource-type tag, or `None` if either the
    /// microservice or the resource is unknown.
    pub fn resolve_type(&self, ms: &str, resource: &str) -> Option<&str> {
        self.config
            .find_microservice(ms)?
            .find_resource(resource)
            .map(|r| r.type_tag.as_str())
    }

    /// True iff the microservice exists and declares the named resource.
    pub fn is_resource_allowed(&self, ms: &str, resource: &str) -> bool {
        self.config
            .find_microservice(ms)
            .and_then(|m| m.find_resource(resource))
            .is_some()
    }

    /// True iff the action is permitted on the resource. A resource
    /// declaring zero actions is open by default: any action name is
    /// allowed. This mirrors the source system's observed behavior; it is
    /// surprising in a default-deny system, but is the specified contract.
    pub fn is_action_allowed(&self, ms: &str, resource: &str, action: &str) -> bool {
        let Some(resource) = self
            .config
            .find_microservice(ms)
            .and_then(|m| m.find_resource(resource))
        else {
            return false;
        };

        if resource.actions.is_empty() {
            return true;
        }

        resource.find_action(action).is_some()
    }

    /// The effective-scope evaluator: action-scope overrides resource-scope
    /// overrides microservice-scope. Missing microservice or resource is
    /// never public.
    pub fn is_public(&self, ms: &str, resource: &str, action: Option<&str>) -> bool {
        let Some(microservice) = self.config.find_microservice(ms) else {
            return false;
        };
        let Some(resource) = microservice.find_resource(resource) else {
            return false;
        };

        let effective = action
            .and_then(|a| resource.find_action(a))
            .and_then(|a| a.scope)
            .or(resource.scope)
            .unwrap_or(microservice.scope);

        effective == Scope::Public
    }

    /// All configured microservice ids, for the aggregated health probe.
    pub fn list_microservices(&self) -> impl Iterator<Item = &str> {
        self.config.microservices.iter().map(|m| m.id.as_str())
    }
}
