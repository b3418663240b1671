//! Notification delivery.
//!
//! Delivery is logged through `tracing`; each recipient's phone number is
//! logged under the `ngao::sms` target in place of a real SMS gateway.

use ngao_core::{Communication, DeliverySink, Officer};

/// Sink that logs every committed communication.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DeliverySink for TracingSink {
    fn deliver(&self, communication: &Communication, recipients: &[Officer]) {
        tracing::info!(
            event = "communication_delivered",
            communication = %communication.id,
            kind = communication.kind.code(),
            recipients = recipients.len(),
            title = %communication.title,
            "Delivered communication"
        );
        for officer in recipients.iter().filter(|o| o.is_active) {
            tracing::debug!(
                target: "ngao::sms",
                to = %officer.phone,
                officer = %officer.id,
                "SMS sandbox: {}",
                communication.title
            );
        }
    }
}
