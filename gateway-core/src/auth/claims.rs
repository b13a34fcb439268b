//! Idempotent normalization of Keycloak-shaped nested role claims into flat
//! role claims.

use serde_json::Value;
use std::collections::HashSet;

const SENTINEL: &str = "__kc_roles_flattened";

/// Flatten `realm_access.roles` and `resource_access.<client>.roles` into
/// `realm:<role>` / `<client>:<role>` entries added to `roles`, deduped
/// against whatever is already present.
///
/// A no-op if the sentinel is already present (idempotent across repeated
/// middleware passes). Malformed or absent source claims are ignored
/// silently: a token may legitimately lack them.
pub fn flatten_claims(extra: &mut std::collections::HashMap<String, Value>, roles: &mut Vec<String>) {
    if extra.get(SENTINEL).and_then(Value::as_u64) == Some(1) {
        return;
    }

    let mut seen: HashSet<String> = roles.iter().cloned().collect();

    if let Some(realm_access) = extra.get("realm_access") {
        if let Some(realm_roles) = realm_access.get("roles").and_then(Value::as_array) {
            for role in realm_roles.iter().filter_map(Value::as_str) {
                let flat = format!("realm:{role}");
                if seen.insert(flat.clone()) {
                    roles.push(flat);
                }
            }
        }
    }

    if let Some(resource_access) = extra.get("resource_access").and_then(Value::as_object) {
        for (client_id, client_claims) in resource_access {
            let Some(client_roles) = client_claims.get("roles").and_then(Value::as_array) else {
                continue;
            };
            for role in client_roles.iter().filter_map(Value::as_str) {
                let flat = format!("{client_id}:{role}");
                if seen.insert(flat.clone()) {
                    roles.push(flat);
                }
            }
        }
    }

    extra.insert(SENTINEL.to_string(), Value::from(1));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn extras_with_nested_roles() -> std::collections::HashMap<String, Value> {
        let mut extra = std::collections::HashMap::new();
        extra.insert(
            "realm_access".to_string(),
            json!({ "roles": ["admin", "viewer"] }),
        );
        extra.insert(
            "resource_access".to_string(),
            json!({ "gateway-client": { "roles": ["operator"] } }),
        );
        extra
    }

    #[test]
    fn flattens_realm_and_client_roles() {
        let mut extra = extras_with_nested_roles();
        let mut roles = Vec::new();
        flatten_claims(&mut extra, &mut roles);

        assert!(roles.contains(&"realm:admin".to_string()));
        assert!(roles.contains(&"realm:viewer".to_string()));
        assert!(roles.contains(&"gateway-client:operator".to_string()));
        assert_eq!(extra.get(SENTINEL).and_then(Value::as_u64), Some(1));
    }

    #[test]
    fn is_idempotent_across_repeated_passes() {
        let mut extra = extras_with_nested_roles();
        let mut roles = Vec::new();
        flatten_claims(&mut extra, &mut roles);
        let first_pass = roles.clone();

        flatten_claims(&mut extra, &mut roles);
        assert_eq!(roles, first_pass);
    }

    #[test]
    fn missing_claims_are_silently_ignored() {
        let mut extra = std::collections::HashMap::new();
        let mut roles = vec!["existing:role".to_string()];
        flatten_claims(&mut extra, &mut roles);
        assert_eq!(roles, vec!["existing:role".to_string()]);
    }

    #[test]
    fn dedupes_against_preexisting_roles() {
        let mut extra = extras_with_nested_roles();
        let mut roles = vec!["realm:admin".to_string()];
        flatten_claims(&mut extra, &mut roles);
        assert_eq!(roles.iter().filter(|r| *r == "realm:admin").count(), 1);
    }
}
