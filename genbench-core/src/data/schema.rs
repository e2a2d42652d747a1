//! Canonical roles and per-task column mappings.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A named role in the canonical schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Input1,
    Input2,
    Target,
}

impl Role {
    /// Column name the role takes in a canonical table.
    pub fn column_name(self) -> &'static str {
        match self {
            Role::Input1 => "input_1",
            Role::Input2 => "input_2",
            Role::Target => "target",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column_name())
    }
}

/// Mapping from raw source columns to canonical roles for one task variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSchema {
    /// Task name, used in logs and reports.
    pub name: String,
    /// Raw column mapped to `INPUT_1`.
    pub input_1: String,
    /// Raw column mapped to `INPUT_2`; single-input tasks leave it unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_2: Option<String>,
    /// Raw column holding the reference label or text.
    pub target: String,
    /// Raw columns whose lengths are profiled by `analyze`.
    pub text_fields: Vec<String>,
}

impl TaskSchema {
    /// Natural-language inference: premise/hypothesis pairs with a class label.
    pub fn nli() -> Self {
        Self {
            name: "nli".to_string(),
            input_1: "premise".to_string(),
            input_2: Some("hypothesis".to_string()),
            target: "label".to_string(),
            text_fields: vec!["premise".to_string(), "hypothesis".to_string()],
        }
    }

    /// Open question answering with a free-text reference answer.
    pub fn open_qa() -> Self {
        Self {
            name: "open_qa".to_string(),
            input_1: "question".to_string(),
            input_2: None,
            target: "best_answer".to_string(),
            text_fields: vec!["question".to_string()],
        }
    }

    /// Look up a built-in task variant by name.
    pub fn builtin(name: &str) -> Option<Self> {
        match name {
            "nli" => Some(Self::nli()),
            "open_qa" => Some(Self::open_qa()),
            _ => None,
        }
    }

    /// Roles this task populates, in canonical column order.
    pub fn roles(&self) -> Vec<Role> {
        let mut roles = vec![Role::Input1];
        if self.input_2.is_some() {
            roles.push(Role::Input2);
        }
        roles.push(Role::Target);
        roles
    }

    /// Raw column name configured for `role`.
    pub fn source_column(&self, role: Role) -> Option<&str> {
        match role {
            Role::Input1 => Some(&self.input_1),
            Role::Input2 => self.input_2.as_deref(),
            Role::Target => Some(&self.target),
        }
    }

    pub fn is_pair(&self) -> bool {
        self.input_2.is_some()
    }
}

impl Default for TaskSchema {
    fn default() -> Self {
        Self::open_qa()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roles_follow_arity() {
        assert_eq!(
            TaskSchema::nli().roles(),
            vec![Role::Input1, Role::Input2, Role::Target]
        );
        assert_eq!(TaskSchema::open_qa().roles(), vec![Role::Input1, Role::Target]);
    }

    #[test]
    fn test_builtin_lookup() {
        assert_eq!(TaskSchema::builtin("nli"), Some(TaskSchema::nli()));
        assert!(TaskSchema::builtin("summarization").is_none());
    }

    #[test]
    fn test_source_column() {
        let qa = TaskSchema::open_qa();
        assert_eq!(qa.source_column(Role::Target), Some("best_answer"));
        assert_eq!(qa.source_column(Role::Input2), None);
    }
}
