// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{Record, RecordId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("{name:?} is already on the menu")]
    DuplicateName { name: String },
    #[error("record {id} not found")]
    NotFound { id: RecordId },
    #[error("{0}")]
    Transport(String),
}

impl StoreError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// The authoritative record collection.
///
/// Implementations return `list` ascending by id. They are free to enforce
/// name uniqueness; when they do, a clash is reported as
/// [`StoreError::DuplicateName`].
pub trait RecordStore {
    fn list(&mut self) -> StoreResult<Vec<Record>>;
    fn insert(&mut self, name: &str) -> StoreResult<Record>;
    fn update(&mut self, id: RecordId, name: &str) -> StoreResult<Record>;
    fn delete(&mut self, id: RecordId) -> StoreResult<()>;
}

impl<S: RecordStore + ?Sized> RecordStore for &mut S {
    fn list(&mut self) -> StoreResult<Vec<Record>> {
        (**self).list()
    }

    fn insert(&mut self, name: &str) -> StoreResult<Record> {
        (**self).insert(name)
    }

    fn update(&mut self, id: RecordId, name: &str) -> StoreResult<Record> {
        (**self).update(id, name)
    }

    fn delete(&mut self, id: RecordId) -> StoreResult<()> {
        (**self).delete(id)
    }
}

impl<S: RecordStore + ?Sized> RecordStore for Box<S> {
    fn list(&mut self) -> StoreResult<Vec<Record>> {
        (**self).list()
    }

    fn insert(&mut self, name: &str) -> StoreResult<Record> {
        (**self).insert(name)
    }

    fn update(&mut self, id: RecordId, name: &str) -> StoreResult<Record> {
        (**self).update(id, name)
    }

    fn delete(&mut self, id: RecordId) -> StoreResult<()> {
        (**self).delete(id)
    }
}
