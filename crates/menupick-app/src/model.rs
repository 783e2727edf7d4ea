// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};

use crate::ids::RecordId;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub name: String,
}

impl Record {
    pub fn new(id: impl Into<RecordId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    Success,
    Error,
    Progress,
}

impl NotificationKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Progress => "progress",
        }
    }

    pub const fn auto_dismisses(self) -> bool {
        !matches!(self, Self::Progress)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Screen {
    Picker,
    Login,
    Admin,
}

impl Screen {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Picker => "pick",
            Self::Login => "login",
            Self::Admin => "admin",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,
}

/// Trims an operator-entered name, rejecting blank input.
pub fn validate_name(raw: &str) -> Result<&str, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::{NotificationKind, ValidationError, validate_name};

    #[test]
    fn validate_name_trims_and_rejects_blank_input() {
        assert_eq!(validate_name("  Soup "), Ok("Soup"));
        assert_eq!(validate_name(""), Err(ValidationError::EmptyName));
        assert_eq!(validate_name(" \t\n"), Err(ValidationError::EmptyName));
    }

    #[test]
    fn only_progress_notifications_stay_up() {
        assert!(NotificationKind::Success.auto_dismisses());
        assert!(NotificationKind::Error.auto_dismisses());
        assert!(!NotificationKind::Progress.auto_dismisses());
    }
}
