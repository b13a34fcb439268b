//! Startup validation of a [`RoutingConfig`](super::model::RoutingConfig).
//!
//! Collects every violation in one pass rather than failing on the first,
//! so operators can fix a bad configuration in a single edit cycle.

use super::model::RoutingConfig;

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

/// Validate the five invariants from the routing configuration's data model.
///
/// Returns `Ok(())` if the configuration is sound, or `Err(violations)` with
/// one human-readable line per violation found.
pub fn validate(config: &RoutingConfig) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();
    let mut seen_ids = std::collections::HashSet::new();

    for ms in &config.microservices {
        if is_blank(&ms.id) {
            errors.push("microservice has an empty or whitespace id".to_string());
        } else if !seen_ids.insert(ms.id.to_lowercase()) {
            errors.push(format!("duplicate microservice id: '{}'", ms.id));
        }

        if is_blank(&ms.queue) {
            errors.push(format!("microservice '{}' has an empty queue", ms.id));
        }

        let mut seen_resources = std::collections::HashSet::new();
        for resource in &ms.resources {
            if is_blank(&resource.name) {
                errors.push(format!(
                    "microservice '{}' has a resource with an empty or whitespace name",
                    ms.id
                ));
            } else if !seen_resources.insert(resource.name.to_lowercase()) {
                errors.push(format!(
                    "duplicate resource name '{}' under microservice '{}'",
                    resource.name, ms.id
                ));
            }

            let mut seen_actions = std::collections::HashSet::new();
            for action in &resource.actions {
                if is_blank(&action.name) {
                    errors.push(format!(
                        "resource '{}.{}' has an action with an empty or whitespace name",
                        ms.id, resource.name
                    ));
                } else if !seen_actions.insert(action.name.to_lowercase()) {
                    errors.push(format!(
                        "duplicate action name '{}' under resource '{}.{}'",
                        action.name, ms.id, resource.name
                    ));
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::model::{Action, Microservice, Resource, Scope};

    fn ms(id: &str, queue: &str, resources: Vec<Resource>) -> Microservice {
        Microservice {
            id: id.to_string(),
            queue: queue.to_string(),
            scope: Scope::Private,
            resources,
        }
    }

    fn resource(name: &str, actions: Vec<Action>) -> Resource {
        Resource {
            name: name.to_string(),
            type_tag: "DATA".to_string(),
            scope: None,
            actions,
        }
    }

    fn action(name: &str) -> Action {
        Action {
            name: name.to_string(),
            scope: None,
        }
    }

    #[test]
    fn sound_config_validates() {
        let config = RoutingConfig {
            microservices: vec![ms(
                "mainsite",
                "mainsite_queue",
                vec![resource("Countries", vec![action("List")])],
            )],
        };
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn duplicate_microservice_id_is_case_insensitive() {
        let config = RoutingConfig {
            microservices: vec![
                ms("mainsite", "q1", vec![]),
                ms("MainSite", "q2", vec![]),
            ],
        };
        let errors = validate(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.contains("duplicate microservice id")));
    }

    #[test]
    fn missing_queue_is_reported() {
        let config = RoutingConfig {
            microservices: vec![ms("mainsite", "  ", vec![])],
        };
        let errors = validate(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.contains("empty queue")));
    }

    #[test]
    fn duplicate_resource_name_is_reported() {
        let config = RoutingConfig {
            microservices: vec![ms(
                "mainsite",
                "q",
                vec![resource("Countries", vec![]), resource("countries", vec![])],
            )],
        };
        let errors = validate(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.contains("duplicate resource name")));
    }

    #[test]
    fn duplicate_action_name_is_reported() {
        let config = RoutingConfig {
            microservices: vec![ms(
                "mainsite",
                "q",
                vec![resource("Countries", vec![action("List"), action("list")])],
            )],
        };
        let errors = validate(&config).unwrap_err();
        assert!(errors.iter().any(|e| e.contains("duplicate action name")));
    }

    #[test]
    fn all_violations_reported_in_one_pass() {
        let config = RoutingConfig {
            microservices: vec![
                ms("mainsite", "", vec![resource("", vec![])]),
                ms("mainsite", "q2", vec![]),
            ],
        };
        let errors = validate(&config).unwrap_err();
        // empty queue + empty resource name + duplicate microservice id
        assert!(errors.len() >= 3);
    }
}
