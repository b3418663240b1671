//! # Messaging
//!
//! Direct messages, unit-wide announcements and workflow notifications.
//!
//! Notifications are stored with the transition that caused them. Delivery
//! (SMS, e-mail, push) happens outside the core through [`DeliverySink`],
//! which the engine calls only after the batch has committed.

use crate::officers::Officer;
use crate::primitives::{MAX_TEXT_LENGTH, MAX_TITLE_LENGTH, bounded};
use crate::storage::{self, Record};
use crate::{CommunicationId, NgaoError, Timestamp, UnitId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::PoisonError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CommunicationKind {
    Message,
    Announcement,
    Notification,
}

impl CommunicationKind {
    /// Short code used in delivery logs.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Message => "MSG",
            Self::Announcement => "ANN",
            Self::Notification => "NOT",
        }
    }
}

impl fmt::Display for CommunicationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Communication {
    pub id: CommunicationId,
    pub kind: CommunicationKind,
    /// `None` for system notifications.
    pub sender: Option<UserId>,
    pub recipients: BTreeSet<UserId>,
    pub title: String,
    pub body: String,
    pub admin_unit: Option<UnitId>,
    pub read_by: BTreeSet<UserId>,
    pub created_at: Timestamp,
}

impl Communication {
    #[must_use]
    pub fn is_read_by(&self, user: UserId) -> bool {
        self.read_by.contains(&user)
    }
}

impl Record for Communication {
    const TABLE: &'static str = storage::COMMUNICATIONS;

    fn key(&self) -> u64 {
        self.id.0
    }
}

pub(crate) fn validate_text(title: &str, body: &str) -> Result<(), NgaoError> {
    bounded("title", title, MAX_TITLE_LENGTH)?;
    bounded("body", body, MAX_TEXT_LENGTH)
}

/// Outbound delivery of committed communications.
pub trait DeliverySink: Send + Sync {
    /// Called once per communication after its batch is durable.
    /// Delivery failures are the sink's concern; they never undo a commit.
    fn deliver(&self, communication: &Communication, recipients: &[Officer]);
}

/// Sink that drops every delivery.
#[derive(Debug, Clone, Copy, Default)]
pub struct Silent;

impl DeliverySink for Silent {
    fn deliver(&self, _communication: &Communication, _recipients: &[Officer]) {}
}

/// Sink that keeps every delivery in memory, for inspection.
#[derive(Debug, Default)]
pub struct Recorder {
    delivered: std::sync::Mutex<Vec<(CommunicationId, Vec<UserId>)>>,
}

impl Recorder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliveries so far as `(communication, recipients)` pairs.
    #[must_use]
    pub fn deliveries(&self) -> Vec<(CommunicationId, Vec<UserId>)> {
        self.delivered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl DeliverySink for Recorder {
    fn deliver(&self, communication: &Communication, recipients: &[Officer]) {
        self.delivered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((communication.id, recipients.iter().map(|o| o.id).collect()));
    }
}

impl<T: DeliverySink + ?Sized> DeliverySink for std::sync::Arc<T> {
    fn deliver(&self, communication: &Communication, recipients: &[Officer]) {
        (**self).deliver(communication, recipients);
    }
}
