//! Parses the `/api/{ms}/{resource}[/{id}][/actions/{action}]` URL shape into
//! its constituent parts, shared by the authorization filter and the
//! request→envelope dispatch pipeline so both agree on exactly the same
//! route grammar.

use axum::http::Method;

/// The decomposed route, with the effective action name already resolved
/// (either the configured custom action, or the implicit CRUD verb implied
/// by the HTTP method and the presence of an id segment).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteParts {
    pub microservice: String,
    pub resource: String,
    pub id: Option<i64>,
    /// `Some` only for `.../actions/{action}` routes.
    pub custom_action: Option<String>,
    /// The action name to use for authorization and envelope construction:
    /// `custom_action` if present, else the implicit CRUD verb.
    pub effective_action: String,
}

/// Parse `path` (expected to start with `/api/`) and `method` into
/// [`RouteParts`]. Returns `None` if the path does not match any of the
/// eight recognized shapes.
pub fn parse(path: &str, method: &Method) -> Option<RouteParts> {
    let rest = path.strip_prefix("/api/")?;
    let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();

    match segments.as_slice() {
        [ms, resource] => {
            let implicit = match *method {
                Method::GET => "List",
                Method::POST => "Create",
                _ => return None,
            };
            Some(RouteParts {
                microservice: ms.to_string(),
                resource: resource.to_string(),
                id: None,
                custom_action: None,
                effective_action: implicit.to_string(),
            })
        }
        [ms, resource, "actions", action] => Some(RouteParts {
            microservice: ms.to_string(),
            resource: resource.to_string(),
            id: None,
            custom_action: Some(action.to_string()),
            effective_action: action.to_string(),
        }),
        [ms, resource, id] => {
            let id: i64 = id.parse().ok()?;
            let implicit = match *method {
                Method::GET => "Get",
                Method::PUT => "Update",
                Method::DELETE => "Delete",
                _ => return None,
            };
            Some(RouteParts {
                microservice: ms.to_string(),
                resource: resource.to_string(),
                id: Some(id),
                custom_action: None,
                effective_action: implicit.to_string(),
            })
        }
        [ms, resource, id, "actions", action] => {
            let id: i64 = id.parse().ok()?;
            if *method != Method::POST {
                return None;
            }
            Some(RouteParts {
                microservice: ms.to_string(),
                resource: resource.to_string(),
                id: Some(id),
                custom_action: Some(action.to_string()),
                effective_action: action.to_string(),
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_list() {
        let parts = parse("/api/mainsite/Countries", &Method::GET).unwrap();
        assert_eq!(parts.effective_action, "List");
        assert_eq!(parts.id, None);
    }

    #[test]
    fn parses_create() {
        let parts = parse("/api/mainsite/Countries", &Method::POST).unwrap();
        assert_eq!(parts.effective_action, "Create");
    }

    #[test]
    fn parses_get_by_id() {
        let parts = parse("/api/mainsite/Countries/5", &Method::GET).unwrap();
        assert_eq!(parts.effective_action, "Get");
        assert_eq!(parts.id, Some(5));
    }

    #[test]
    fn parses_update_and_delete() {
        assert_eq!(
            parse("/api/mainsite/Countries/5", &Method::PUT)
                .unwrap()
                .effective_action,
            "Update"
        );
        assert_eq!(
            parse("/api/mainsite/Countries/5", &Method::DELETE)
                .unwrap()
                .effective_action,
            "Delete"
        );
    }

    #[test]
    fn parses_custom_action_without_id() {
        let parts = parse("/api/mainsite/Countries/actions/Export", &Method::POST).unwrap();
        assert_eq!(parts.custom_action, Some("Export".to_string()));
        assert_eq!(parts.id, None);
    }

    #[test]
    fn parses_custom_action_with_id() {
        let parts = parse("/api/mainsite/Countries/5/actions/Archive", &Method::POST).unwrap();
        assert_eq!(parts.custom_action, Some("Archive".to_string()));
        assert_eq!(parts.id, Some(5));
    }

    #[test]
    fn rejects_non_numeric_id() {
        assert!(parse("/api/mainsite/Countries/abc", &Method::GET).is_none());
    }

    #[test]
    fn rejects_unmatched_method_for_two_segment_path() {
        assert!(parse("/api/mainsite/Countries", &Method::DELETE).is_none());
    }
}
