//! Typed, immutable representation of the gateway's routing policy tree.

use serde::{Deserialize, Serialize};

/// Access scope: `Public` requires no authentication, `Private` requires a
/// valid bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum Scope {
    Public,
    Private,
}

impl Default for Scope {
    fn default() -> Self {
        Self::Private
    }
}

/// A single operation on a `Resource`; either an implicit CRUD verb or a
/// configured custom action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub name: String,
    #[serde(default)]
    pub scope: Option<Scope>,
}

/// A named collection exposed by a `Microservice`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub name: String,
    #[serde(rename = "type")]
    pub type_tag: String,
    #[serde(default)]
    pub scope: Option<Scope>,
    #[serde(default)]
    pub actions: Vec<Action>,
}

/// A logical backend bound to one broker queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Microservice {
    pub id: String,
    pub queue: String,
    #[serde(default)]
    pub scope: Scope,
    #[serde(default)]
    pub resources: Vec<Resource>,
}

/// The full routing policy tree, built once at startup and read-only
/// thereafter. Construction does not validate; call [`crate::routing::validator::validate`]
/// before trusting an instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoutingConfig {
    #[serde(default)]
    pub microservices: Vec<Microservice>,
}

impl RoutingConfig {
    pub fn find_microservice(&self, ms: &str) -> Option<&Microservice> {
        self.microservices
            .iter()
            .find(|m| m.id.eq_ignore_ascii_case(ms))
    }
}

impl Microservice {
    pub fn find_resource(&self, resource: &str) -> Option<&Resource> {
        self.resources
            .iter()
            .find(|r| r.name.eq_ignore_ascii_case(resource))
    }
}

impl Resource {
    pub fn find_action(&self, action: &str) -> Option<&Action> {
        self.actions
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(action))
    }
}
