// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("wrong username or password")]
    InvalidCredentials,
}

/// Proof that an operator signed in. Only [`AuthGate::login`] issues one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatorSession {
    operator: String,
}

impl OperatorSession {
    pub fn operator(&self) -> &str {
        &self.operator
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthGate {
    username: String,
    password_sha256: String,
}

impl AuthGate {
    pub fn new(username: impl Into<String>, password_sha256: impl AsRef<str>) -> Self {
        Self {
            username: username.into(),
            password_sha256: password_sha256.as_ref().trim().to_ascii_lowercase(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn login(&self, username: &str, password: &str) -> Result<OperatorSession, AuthError> {
        if self.username.is_empty() || self.password_sha256.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }
        if username != self.username || password_digest(password) != self.password_sha256 {
            return Err(AuthError::InvalidCredentials);
        }
        Ok(OperatorSession {
            operator: username.to_owned(),
        })
    }
}

/// Lowercase hex SHA-256 of `password`, the form stored in config.
pub fn password_digest(password: &str) -> String {
    let digest = Sha256::digest(password.as_bytes());
    let mut output = String::with_capacity(64);
    for byte in digest {
        use std::fmt::Write as _;
        let _ = write!(&mut output, "{byte:02x}");
    }
    output
}
