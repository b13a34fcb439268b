//! The canonical wire shape published to backend microservices over the bus.

use serde::Serialize;

/// One unit of work sent to a backend queue. Serializes with camelCase
/// field names and omits absent optional fields, matching the bus contract.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BusEnvelope {
    #[serde(rename = "type")]
    pub type_tag: String,
    pub resource: String,
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

impl BusEnvelope {
    pub fn new(type_tag: impl Into<String>, resource: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            type_tag: type_tag.into(),
            resource: resource.into(),
            action: action.into(),
            id: None,
            data: None,
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Serialize to the canonical JSON payload sent on the bus.
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_envelope_omits_id_and_data() {
        let envelope = BusEnvelope::new("DATA", "Countries", "List");
        let json = serde_json::to_string(&envelope).unwrap();
        assert_eq!(json, r#"{"type":"DATA","resource":"Countries","action":"List"}"#);
    }

    #[test]
    fn create_envelope_carries_data_only() {
        let envelope = BusEnvelope::new("DATA", "Countries", "Create").with_data(r#"{"iso":"DE"}"#);
        let json = serde_json::to_string(&envelope).unwrap();
        assert_eq!(
            json,
            r#"{"type":"DATA","resource":"Countries","action":"Create","data":"{\"iso\":\"DE\"}"}"#
        );
    }

    #[test]
    fn update_envelope_carries_id_and_data() {
        let envelope = BusEnvelope::new("DATA", "Countries", "Update")
            .with_id(42)
            .with_data(r#"{"iso":"DE"}"#);
        let json = serde_json::to_string(&envelope).unwrap();
        assert!(json.contains(r#""id":42"#));
    }

    #[test]
    fn get_envelope_carries_id_as_decimal_string_in_data() {
        let envelope = BusEnvelope::new("DATA", "Countries", "Get").with_data("5");
        let json = serde_json::to_string(&envelope).unwrap();
        assert!(json.contains(r#""data":"5""#));
        assert!(!json.contains("\"id\""));
    }

    #[test]
    fn health_check_envelope_matches_infra_contract() {
        let envelope = BusEnvelope::new("INFRA", "Health", "Check");
        let json = serde_json::to_string(&envelope).unwrap();
        assert_eq!(json, r#"{"type":"INFRA","resource":"Health","action":"Check"}"#);
    }
}
