// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Operator edits against the authoritative store.
//!
//! Every operation is split in two. A `begin_*` step validates, shows a
//! progress notification and returns a [`MutationRequest`]; the driver runs
//! the request against a [`RecordStore`] (possibly elsewhere) and hands the
//! reply back to [`MutationPipeline::complete`]. Local state only changes
//! after the store has confirmed, and rows are located by record id at that
//! moment, so replies may arrive in any order.
//!
//! An open edit, and a delete confirmation that is not yet loading, always
//! name a record present in the list: every path that drops a record also
//! closes the sessions aimed at it. A `NotFound` reply drops the record.

use std::collections::BTreeMap;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::{
    ListStore, MutationTicket, NotificationKind, NotificationScheduler, PageView, Record, RecordId,
    RecordStore, StoreError, StoreResult, ValidationError, validate_name,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Add,
    Rename,
    Delete,
}

impl MutationKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Rename => "rename",
            Self::Delete => "delete",
        }
    }
}

impl std::fmt::Display for MutationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteOp {
    Insert { name: String },
    Update { id: RecordId, name: String },
    Delete { id: RecordId },
}

impl RemoteOp {
    pub const fn kind(&self) -> MutationKind {
        match self {
            Self::Insert { .. } => MutationKind::Add,
            Self::Update { .. } => MutationKind::Rename,
            Self::Delete { .. } => MutationKind::Delete,
        }
    }

    pub fn execute<S: RecordStore + ?Sized>(&self, store: &mut S) -> RemoteOutcome {
        match self {
            Self::Insert { name } => store.insert(name).map(RemoteReply::Inserted),
            Self::Update { id, name } => store.update(*id, name).map(RemoteReply::Updated),
            Self::Delete { id } => store.delete(*id).map(|()| RemoteReply::Deleted(*id)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteReply {
    Inserted(Record),
    Updated(Record),
    Deleted(RecordId),
}

pub type RemoteOutcome = Result<RemoteReply, StoreError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRequest {
    pub ticket: MutationTicket,
    pub op: RemoteOp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    DuplicateName,
    NotFound,
    Transport,
}

impl From<&StoreError> for FailureClass {
    fn from(error: &StoreError) -> Self {
        match error {
            StoreError::DuplicateName { .. } => Self::DuplicateName,
            StoreError::NotFound { .. } => Self::NotFound,
            StoreError::Transport(_) => Self::Transport,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationReport {
    pub ticket: MutationTicket,
    pub kind: MutationKind,
    pub result: Result<(), FailureClass>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MutationError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("no row is being edited")]
    NoActiveEdit,
    #[error("no row {row} on this page")]
    NoSuchRow { row: usize },
    #[error("no delete is waiting for confirmation")]
    NoDeleteTarget,
    #[error("a {0} is already in flight")]
    InFlight(MutationKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditSession {
    pub id: RecordId,
    pub draft: String,
    pub saving: Option<MutationTicket>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteConfirmation {
    pub target: RecordId,
    pub loading: Option<MutationTicket>,
}

impl DeleteConfirmation {
    pub const fn is_loading(&self) -> bool {
        self.loading.is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MutationPipeline {
    list: ListStore,
    view: PageView,
    notifications: NotificationScheduler,
    add_input: String,
    edit: Option<EditSession>,
    delete: Option<DeleteConfirmation>,
    pending: BTreeMap<MutationTicket, RemoteOp>,
    last_ticket: MutationTicket,
}

impl MutationPipeline {
    pub fn new(view: PageView, notifications: NotificationScheduler) -> Self {
        Self {
            view,
            notifications,
            ..Self::default()
        }
    }

    pub fn list(&self) -> &ListStore {
        &self.list
    }

    pub fn view(&self) -> &PageView {
        &self.view
    }

    pub fn notifications(&self) -> &NotificationScheduler {
        &self.notifications
    }

    pub fn visible_records(&self) -> &[Record] {
        self.view.visible(self.list.records())
    }

    pub fn page_count(&self) -> usize {
        self.view.page_count(self.list.len())
    }

    pub fn add_input(&self) -> &str {
        &self.add_input
    }

    pub fn add_input_mut(&mut self) -> &mut String {
        &mut self.add_input
    }

    pub fn set_add_input(&mut self, value: impl Into<String>) {
        self.add_input = value.into();
    }

    pub fn edit_session(&self) -> Option<&EditSession> {
        self.edit.as_ref()
    }

    pub fn edit_draft_mut(&mut self) -> Option<&mut String> {
        self.edit.as_mut().map(|session| &mut session.draft)
    }

    pub fn delete_confirmation(&self) -> Option<&DeleteConfirmation> {
        self.delete.as_ref()
    }

    pub fn delete_target_name(&self) -> Option<&str> {
        let confirmation = self.delete.as_ref()?;
        self.list
            .find(confirmation.target)
            .map(|record| record.name.as_str())
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Advances notification timers. Returns whether a notification was hidden.
    pub fn tick(&mut self, now: Instant) -> bool {
        self.notifications.poll(now)
    }

    pub fn dismiss_notification(&mut self) {
        self.notifications.dismiss();
    }

    /// Replaces the local mirror with a full fetch from `store`.
    pub fn reload<S: RecordStore + ?Sized>(
        &mut self,
        store: &mut S,
        now: Instant,
    ) -> Result<usize, FailureClass> {
        self.apply_listing(store.list(), now)
    }

    /// Applies a full fetch that was performed elsewhere.
    pub fn apply_listing(
        &mut self,
        listing: StoreResult<Vec<Record>>,
        now: Instant,
    ) -> Result<usize, FailureClass> {
        match listing {
            Ok(records) => {
                let len = records.len();
                self.list.replace_all(records);
                self.view.clamp_to(len);
                self.forget_vanished_targets();
                debug!(records = len, "list reloaded");
                Ok(len)
            }
            Err(error) => {
                warn!(%error, "list reload failed");
                self.notifications
                    .show(format!("load failed: {error}"), NotificationKind::Error, now);
                Err(FailureClass::from(&error))
            }
        }
    }

    pub fn set_page(&mut self, page: usize) -> bool {
        let changed = self.view.set_page(page, self.list.len());
        if changed {
            self.end_edit_if_off_page();
        }
        changed
    }

    pub fn next_page(&mut self) -> bool {
        self.set_page(self.view.current_page().saturating_add(1))
    }

    pub fn prev_page(&mut self) -> bool {
        self.set_page(self.view.current_page().saturating_sub(1))
    }

    pub fn begin_add(&mut self, now: Instant) -> Result<MutationRequest, MutationError> {
        let name = match validate_name(&self.add_input) {
            Ok(name) => name.to_owned(),
            Err(error) => return Err(self.reject_invalid(error, now)),
        };

        let op = RemoteOp::Insert { name: name.clone() };
        let request = self.register(op);
        debug!(ticket = request.ticket.get(), %name, "add begun");
        self.notifications
            .show(format!("adding {name}..."), NotificationKind::Progress, now);
        Ok(request)
    }

    /// Opens the edit box on visible `row`, capturing the record's id.
    pub fn start_edit(&mut self, row: usize) -> Result<RecordId, MutationError> {
        if let Some(session) = &self.edit
            && session.saving.is_some()
        {
            return Err(MutationError::InFlight(MutationKind::Rename));
        }
        let record = self.visible_row(row)?.clone();
        self.edit = Some(EditSession {
            id: record.id,
            draft: record.name,
            saving: None,
        });
        Ok(record.id)
    }

    pub fn cancel_edit(&mut self) -> bool {
        self.edit.take().is_some()
    }

    pub fn begin_rename(&mut self, now: Instant) -> Result<MutationRequest, MutationError> {
        let Some(session) = &self.edit else {
            return Err(MutationError::NoActiveEdit);
        };
        if session.saving.is_some() {
            return Err(MutationError::InFlight(MutationKind::Rename));
        }
        let id = session.id;
        let name = match validate_name(&session.draft) {
            Ok(name) => name.to_owned(),
            Err(error) => return Err(self.reject_invalid(error, now)),
        };

        let request = self.register(RemoteOp::Update {
            id,
            name: name.clone(),
        });
        if let Some(session) = &mut self.edit {
            session.saving = Some(request.ticket);
        }
        debug!(ticket = request.ticket.get(), %id, %name, "rename begun");
        self.notifications
            .show(format!("saving {name}..."), NotificationKind::Progress, now);
        Ok(request)
    }

    /// Opens the delete confirmation for visible `row`.
    pub fn request_delete(&mut self, row: usize) -> Result<RecordId, MutationError> {
        if self.delete.as_ref().is_some_and(DeleteConfirmation::is_loading) {
            return Err(MutationError::InFlight(MutationKind::Delete));
        }
        let id = self.visible_row(row)?.id;
        self.delete = Some(DeleteConfirmation {
            target: id,
            loading: None,
        });
        Ok(id)
    }

    /// Closes the confirmation. Refused while the delete is in flight.
    pub fn cancel_delete(&mut self) -> bool {
        match &self.delete {
            Some(confirmation) if !confirmation.is_loading() => {
                self.delete = None;
                true
            }
            _ => false,
        }
    }

    pub fn confirm_delete(&mut self, now: Instant) -> Result<MutationRequest, MutationError> {
        let Some(confirmation) = &self.delete else {
            return Err(MutationError::NoDeleteTarget);
        };
        if confirmation.is_loading() {
            return Err(MutationError::InFlight(MutationKind::Delete));
        }
        let id = confirmation.target;
        let name = self
            .list
            .find(id)
            .map_or_else(|| id.to_string(), |record| record.name.clone());

        let request = self.register(RemoteOp::Delete { id });
        if let Some(confirmation) = &mut self.delete {
            confirmation.loading = Some(request.ticket);
        }
        debug!(ticket = request.ticket.get(), %id, "delete begun");
        self.notifications
            .show(format!("deleting {name}..."), NotificationKind::Progress, now);
        Ok(request)
    }

    /// Runs `request` against `store` and applies the reply in one turn.
    pub fn submit<S: RecordStore + ?Sized>(
        &mut self,
        request: MutationRequest,
        store: &mut S,
        now: Instant,
    ) -> Option<MutationReport> {
        let outcome = request.op.execute(store);
        self.complete(request.ticket, outcome, now)
    }

    /// Applies the store's reply for `ticket`. Unknown tickets are ignored.
    pub fn complete(
        &mut self,
        ticket: MutationTicket,
        outcome: RemoteOutcome,
        now: Instant,
    ) -> Option<MutationReport> {
        let Some(op) = self.pending.remove(&ticket) else {
            warn!(ticket = ticket.get(), "reply for unknown mutation ignored");
            return None;
        };
        let kind = op.kind();

        let result = match outcome {
            Ok(reply) => {
                let checkpoint = self.list.checkpoint();
                match self.reconcile(&op, reply, now) {
                    Ok(()) => Ok(()),
                    Err(failure) => {
                        self.list.rollback(checkpoint);
                        Err(failure)
                    }
                }
            }
            Err(error) => {
                self.fail(&op, &error, now);
                Err(FailureClass::from(&error))
            }
        };
        Some(MutationReport {
            ticket,
            kind,
            result,
        })
    }

    fn reconcile(
        &mut self,
        op: &RemoteOp,
        reply: RemoteReply,
        now: Instant,
    ) -> Result<(), FailureClass> {
        match (op, reply) {
            (RemoteOp::Insert { name }, RemoteReply::Inserted(record)) => {
                info!(id = %record.id, name = %record.name, "record added");
                let message = format!("added {}", record.name);
                self.list.append_one(record);
                if self.add_input.trim() == name {
                    self.add_input.clear();
                }
                self.notifications
                    .show(message, NotificationKind::Success, now);
                Ok(())
            }
            (RemoteOp::Update { id, .. }, RemoteReply::Updated(record)) => {
                let Some(index) = self.list.position_of(*id) else {
                    self.close_edit_for(*id);
                    warn!(%id, "renamed record is gone locally");
                    self.notifications.show(
                        format!("rename failed: record {id} no longer exists"),
                        NotificationKind::Error,
                        now,
                    );
                    return Err(FailureClass::NotFound);
                };
                let message = format!("renamed to {}", record.name);
                self.list.replace_at(index, record).map_err(|error| {
                    warn!(%error, "rename reconcile failed");
                    FailureClass::Transport
                })?;
                self.close_edit_for(*id);
                info!(%id, index, "record renamed");
                self.notifications
                    .show(message, NotificationKind::Success, now);
                Ok(())
            }
            (RemoteOp::Delete { id }, RemoteReply::Deleted(_)) => {
                let name = match self.list.position_of(*id) {
                    Some(index) => {
                        let removed = self.list.remove_at(index).map_err(|error| {
                            warn!(%error, "delete reconcile failed");
                            FailureClass::Transport
                        })?;
                        info!(%id, index, "record deleted");
                        removed.name
                    }
                    None => id.to_string(),
                };
                if self.delete.as_ref().is_some_and(|c| c.target == *id) {
                    self.delete = None;
                }
                self.close_edit_for(*id);
                self.view.clamp_to(self.list.len());
                self.notifications
                    .show(format!("deleted {name}"), NotificationKind::Success, now);
                Ok(())
            }
            (op, reply) => {
                warn!(?op, ?reply, "store reply does not match request");
                self.fail(
                    op,
                    &StoreError::transport("unexpected reply from store"),
                    now,
                );
                Err(FailureClass::Transport)
            }
        }
    }

    fn fail(&mut self, op: &RemoteOp, error: &StoreError, now: Instant) {
        warn!(kind = %op.kind(), %error, "mutation failed");
        let message = match (op, error) {
            (_, StoreError::DuplicateName { name }) => format!("{name} is already on the menu"),
            (op, StoreError::NotFound { id }) => {
                self.forget_record(*id);
                format!("{} failed: record {id} no longer exists", op.kind())
            }
            (op, error) => format!("{} failed: {error}", op.kind()),
        };
        match op {
            RemoteOp::Insert { .. } => {}
            RemoteOp::Update { id, .. } => {
                if let Some(session) = &mut self.edit
                    && session.id == *id
                {
                    session.saving = None;
                }
            }
            RemoteOp::Delete { id } => {
                if let Some(confirmation) = &mut self.delete
                    && confirmation.target == *id
                {
                    confirmation.loading = None;
                }
            }
        }
        self.notifications
            .show(message, NotificationKind::Error, now);
    }

    fn reject_invalid(&mut self, error: ValidationError, now: Instant) -> MutationError {
        debug!(%error, "input rejected");
        self.notifications
            .show(error.to_string(), NotificationKind::Error, now);
        MutationError::Validation(error)
    }

    fn register(&mut self, op: RemoteOp) -> MutationRequest {
        self.last_ticket = self.last_ticket.next();
        let ticket = self.last_ticket;
        self.pending.insert(ticket, op.clone());
        MutationRequest { ticket, op }
    }

    fn visible_row(&self, row: usize) -> Result<&Record, MutationError> {
        self.visible_records()
            .get(row)
            .ok_or(MutationError::NoSuchRow { row })
    }

    fn close_edit_for(&mut self, id: RecordId) {
        if self.edit.as_ref().is_some_and(|session| session.id == id) {
            self.edit = None;
        }
    }

    fn end_edit_if_off_page(&mut self) {
        let Some(session) = &self.edit else {
            return;
        };
        let on_page = self
            .visible_records()
            .iter()
            .any(|record| record.id == session.id);
        if !on_page {
            debug!(id = %session.id, "edit closed by page change");
            self.edit = None;
        }
    }

    /// Drops a record the store no longer has, with any session aimed at it.
    fn forget_record(&mut self, id: RecordId) {
        if let Some(index) = self.list.position_of(id)
            && self.list.remove_at(index).is_ok()
        {
            debug!(%id, index, "dropped record missing from store");
        }
        self.close_edit_for(id);
        if self.delete.as_ref().is_some_and(|c| c.target == id) {
            self.delete = None;
        }
        self.view.clamp_to(self.list.len());
    }

    fn forget_vanished_targets(&mut self) {
        if let Some(session) = &self.edit
            && self.list.position_of(session.id).is_none()
        {
            self.edit = None;
        }
        if let Some(confirmation) = &self.delete
            && !confirmation.is_loading()
            && self.list.position_of(confirmation.target).is_none()
        {
            self.delete = None;
        }
    }
}
