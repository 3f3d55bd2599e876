//! Granular permission matrix stored per user.
//!
//! The matrix is persisted as JSON on the user row. Both the guard in
//! `middleware::auth` and the admin endpoint that edits the matrix go
//! through the types here, so the set of categories and actions is defined
//! in exactly one place.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct PromptPermissions {
    pub view: bool,
    pub create: bool,
    pub edit: bool,
    pub delete: bool,
    pub review: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct CommentPermissions {
    pub view: bool,
    pub delete: bool,
    pub moderate: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct UserPermissions {
    pub view: bool,
    pub create: bool,
    pub edit: bool,
    pub delete: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct SystemPermissions {
    pub settings: bool,
    pub logs: bool,
    pub analytics: bool,
}

/// Missing categories or actions deserialize as `false`; unknown keys are
/// ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct PermissionMatrix {
    pub prompts: PromptPermissions,
    pub comments: CommentPermissions,
    pub users: UserPermissions,
    pub system: SystemPermissions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    PromptsView,
    /// Shown in the matrix only; any signed-in user may submit prompts.
    PromptsCreate,
    PromptsEdit,
    PromptsDelete,
    PromptsReview,
    CommentsView,
    CommentsDelete,
    CommentsModerate,
    UsersView,
    UsersCreate,
    /// Shown in the matrix only; role and matrix edits are admin-only.
    UsersEdit,
    UsersDelete,
    SystemSettings,
    SystemLogs,
    SystemAnalytics,
}

impl Permission {
    pub const ALL: [Permission; 15] = [
        Permission::PromptsView,
        Permission::PromptsCreate,
        Permission::PromptsEdit,
        Permission::PromptsDelete,
        Permission::PromptsReview,
        Permission::CommentsView,
        Permission::CommentsDelete,
        Permission::CommentsModerate,
        Permission::UsersView,
        Permission::UsersCreate,
        Permission::UsersEdit,
        Permission::UsersDelete,
        Permission::SystemSettings,
        Permission::SystemLogs,
        Permission::SystemAnalytics,
    ];

    /// `(category, action)` pair as it appears in the stored JSON.
    pub fn key(&self) -> (&'static str, &'static str) {
        match self {
            Permission::PromptsView => ("prompts", "view"),
            Permission::PromptsCreate => ("prompts", "create"),
            Permission::PromptsEdit => ("prompts", "edit"),
            Permission::PromptsDelete => ("prompts", "delete"),
            Permission::PromptsReview => ("prompts", "review"),
            Permission::CommentsView => ("comments", "view"),
            Permission::CommentsDelete => ("comments", "delete"),
            Permission::CommentsModerate => ("comments", "moderate"),
            Permission::UsersView => ("users", "view"),
            Permission::UsersCreate => ("users", "create"),
            Permission::UsersEdit => ("users", "edit"),
            Permission::UsersDelete => ("users", "delete"),
            Permission::SystemSettings => ("system", "settings"),
            Permission::SystemLogs => ("system", "logs"),
            Permission::SystemAnalytics => ("system", "analytics"),
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (category, action) = self.key();
        write!(f, "{category}.{action}")
    }
}

impl FromStr for Permission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Permission::ALL
            .iter()
            .copied()
            .find(|p| p.to_string() == s)
            .ok_or_else(|| format!("Unknown permission '{s}'"))
    }
}

impl PermissionMatrix {
    /// Every action granted.
    pub fn full() -> Self {
        let mut matrix = Self::default();
        for permission in Permission::ALL {
            matrix.set(permission, true);
        }
        matrix
    }

    /// Lenient read of a stored matrix. Anything that is not an object
    /// yields the empty (deny-all) matrix.
    pub fn from_json(value: &serde_json::Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or_default()
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::json!({}))
    }

    pub fn allows(&self, permission: Permission) -> bool {
        match permission {
            Permission::PromptsView => self.prompts.view,
            Permission::PromptsCreate => self.prompts.create,
            Permission::PromptsEdit => self.prompts.edit,
            Permission::PromptsDelete => self.prompts.delete,
            Permission::PromptsReview => self.prompts.review,
            Permission::CommentsView => self.comments.view,
            Permission::CommentsDelete => self.comments.delete,
            Permission::CommentsModerate => self.comments.moderate,
            Permission::UsersView => self.users.view,
            Permission::UsersCreate => self.users.create,
            Permission::UsersEdit => self.users.edit,
            Permission::UsersDelete => self.users.delete,
            Permission::SystemSettings => self.system.settings,
            Permission::SystemLogs => self.system.logs,
            Permission::SystemAnalytics => self.system.analytics,
        }
    }

    pub fn set(&mut self, permission: Permission, granted: bool) {
        let slot = match permission {
            Permission::PromptsView => &mut self.prompts.view,
            Permission::PromptsCreate => &mut self.prompts.create,
            Permission::PromptsEdit => &mut self.prompts.edit,
            Permission::PromptsDelete => &mut self.prompts.delete,
            Permission::PromptsReview => &mut self.prompts.review,
            Permission::CommentsView => &mut self.comments.view,
            Permission::CommentsDelete => &mut self.comments.delete,
            Permission::CommentsModerate => &mut self.comments.moderate,
            Permission::UsersView => &mut self.users.view,
            Permission::UsersCreate => &mut self.users.create,
            Permission::UsersEdit => &mut self.users.edit,
            Permission::UsersDelete => &mut self.users.delete,
            Permission::SystemSettings => &mut self.system.settings,
            Permission::SystemLogs => &mut self.system.logs,
            Permission::SystemAnalytics => &mut self.system.analytics,
        };
        *slot = granted;
    }

    pub fn granted(&self) -> Vec<Permission> {
        Permission::ALL
            .iter()
            .copied()
            .filter(|p| self.allows(*p))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_matrix_denies_everything() {
        let matrix = PermissionMatrix::default();
        assert!(Permission::ALL.iter().all(|p| !matrix.allows(*p)));
        assert!(matrix.granted().is_empty());
    }

    #[test]
    fn full_matrix_allows_everything() {
        let matrix = PermissionMatrix::full();
        assert_eq!(matrix.granted().len(), Permission::ALL.len());
    }

    #[test]
    fn partial_json_fills_missing_with_false() {
        let matrix = PermissionMatrix::from_json(&json!({
            "prompts": { "review": true },
            "system": { "logs": true }
        }));
        assert!(matrix.allows(Permission::PromptsReview));
        assert!(matrix.allows(Permission::SystemLogs));
        assert!(!matrix.allows(Permission::PromptsDelete));
        assert!(!matrix.allows(Permission::UsersView));
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let matrix = PermissionMatrix::from_json(&json!({
            "prompts": { "view": true, "teleport": true },
            "billing": { "refund": true }
        }));
        assert_eq!(matrix.granted(), vec![Permission::PromptsView]);
    }

    #[test]
    fn malformed_json_denies() {
        assert_eq!(
            PermissionMatrix::from_json(&json!("admin")),
            PermissionMatrix::default()
        );
        assert_eq!(
            PermissionMatrix::from_json(&json!({ "prompts": { "view": "yes" } })),
            PermissionMatrix::default()
        );
    }

    #[test]
    fn set_then_allows() {
        let mut matrix = PermissionMatrix::default();
        matrix.set(Permission::CommentsModerate, true);
        assert!(matrix.allows(Permission::CommentsModerate));
        matrix.set(Permission::CommentsModerate, false);
        assert!(!matrix.allows(Permission::CommentsModerate));
    }

    #[test]
    fn json_shape_is_nested_by_category() {
        let mut matrix = PermissionMatrix::default();
        matrix.set(Permission::UsersDelete, true);
        let value = matrix.to_json();
        assert_eq!(value["users"]["delete"], json!(true));
        assert_eq!(value["prompts"]["view"], json!(false));
    }

    #[test]
    fn permission_names_parse() {
        assert_eq!(
            "prompts.review".parse::<Permission>(),
            Ok(Permission::PromptsReview)
        );
        assert_eq!(Permission::SystemAnalytics.to_string(), "system.analytics");
        assert!("prompts.fly".parse::<Permission>().is_err());
    }
}
