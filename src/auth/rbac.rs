/*!
 * # Default role matrix
 *
 * Built-in roles and the grants they start with. The permissions table is
 * seeded from this matrix when it is empty; afterwards the table is the only
 * source of truth.
 */

use lazy_static::lazy_static;
use std::collections::HashMap;
use std::str::FromStr;
use sea_orm::Iterable;
use tracing::warn;

use crate::entities::permission::{PermissionAction, Resource};

/// Role definition with its default grants, written as `resource:action`
/// or `resource:*`.
#[derive(Debug, Clone)]
pub struct Role {
    pub name: &'static str,
    pub description: &'static str,
    pub permissions: Vec<&'static str>,
}

lazy_static! {
    pub static ref ROLES: HashMap<&'static str, Role> = {
        let mut roles = HashMap::new();

        roles.insert(
            "admin",
            Role {
                name: "admin",
                description: "Administrator with full access",
                permissions: vec![
                    "pr:*",
                    "inventory:*",
                    "departments:*",
                    "users:*",
                    "incidents:*",
                    "reports:*",
                    "settings:*",
                ],
            },
        );

        roles.insert(
            "manager",
            Role {
                name: "manager",
                description: "Department manager; approves and routes purchase requests",
                permissions: vec![
                    "pr:create",
                    "pr:read",
                    "pr:update",
                    "pr:approve",
                    "pr:assign",
                    "pr:export",
                    "inventory:read",
                    "inventory:update",
                    "inventory:assign",
                    "departments:read",
                    "users:read",
                    "incidents:create",
                    "incidents:read",
                    "incidents:update",
                    "reports:read",
                    "reports:export",
                ],
            },
        );

        roles.insert(
            "officer",
            Role {
                name: "officer",
                description: "IT officer; fulfils requests and manages stock",
                permissions: vec![
                    "pr:create",
                    "pr:read",
                    "pr:update",
                    "pr:assign",
                    "pr:export",
                    "inventory:create",
                    "inventory:read",
                    "inventory:update",
                    "inventory:assign",
                    "departments:read",
                    "users:read",
                    "incidents:*",
                    "reports:read",
                ],
            },
        );

        roles.insert(
            "employee",
            Role {
                name: "employee",
                description: "Standard employee; raises and follows own requests",
                permissions: vec![
                    "pr:create",
                    "pr:read",
                    "inventory:read",
                    "departments:read",
                    "incidents:create",
                    "incidents:read",
                ],
            },
        );

        roles
    };
}

/// Expands the matrix into concrete `(role, resource, action)` grants.
pub fn default_grants() -> Vec<(&'static str, Resource, PermissionAction)> {
    let mut grants = Vec::new();
    let mut names: Vec<_> = ROLES.keys().copied().collect();
    names.sort_unstable();

    for name in names {
        for entry in &ROLES[name].permissions {
            let Some((resource, action)) = entry.split_once(':') else {
                warn!(role = name, entry, "Malformed default permission");
                continue;
            };
            let Ok(resource) = Resource::from_str(resource) else {
                warn!(role = name, entry, "Unknown resource in default permission");
                continue;
            };
            if action == "*" {
                grants.extend(PermissionAction::iter().map(|a| (name, resource, a)));
            } else if let Ok(action) = PermissionAction::from_str(action) {
                grants.push((name, resource, action));
            } else {
                warn!(role = name, entry, "Unknown action in default permission");
            }
        }
    }

    grants
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_gets_every_pair() {
        let admin = default_grants()
            .into_iter()
            .filter(|(role, _, _)| *role == "admin")
            .count();
        assert_eq!(
            admin,
            Resource::iter().count() * PermissionAction::iter().count()
        );
    }

    #[test]
    fn employee_cannot_approve() {
        assert!(!default_grants().contains(&(
            "employee",
            Resource::Pr,
            PermissionAction::Approve
        )));
        assert!(default_grants().contains(&("manager", Resource::Pr, PermissionAction::Approve)));
    }

    #[test]
    fn every_default_entry_parses() {
        let expected: usize = ROLES
            .values()
            .flat_map(|r| r.permissions.iter())
            .map(|p| {
                if p.ends_with(":*") {
                    PermissionAction::iter().count()
                } else {
                    1
                }
            })
            .sum();
        assert_eq!(default_grants().len(), expected);
    }
}
