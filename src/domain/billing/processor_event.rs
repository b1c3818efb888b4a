//! Payment processor webhook event types.
//!
//! Defines the structures for parsing processor webhook payloads. Only the
//! fields our reconciliation logic reads are captured; everything else in the
//! processor's event schema is ignored.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Processor webhook event envelope.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProcessorEvent {
    /// Unique identifier for the event (evt_xxx format).
    pub id: String,

    /// Type of event (e.g., "invoice.payment_succeeded").
    #[serde(rename = "type")]
    pub event_type: String,

    /// Time at which the event was created (Unix timestamp).
    pub created: i64,

    /// Object containing event-specific data.
    pub data: ProcessorEventData,

    /// Whether this is a live mode event (vs test mode).
    pub livemode: bool,

    /// API version used to render this event.
    pub api_version: String,
}

/// Container for event-specific data.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProcessorEventData {
    /// The object that triggered the event (polymorphic based on event type).
    pub object: serde_json::Value,

    /// Previous values for updated attributes (only for update events).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_attributes: Option<serde_json::Value>,
}

impl ProcessorEvent {
    /// Returns true if this is a live mode event.
    pub fn is_live(&self) -> bool {
        self.livemode
    }

    /// Parse the event type into a known enum variant.
    pub fn parsed_type(&self) -> BillingEventType {
        BillingEventType::from_str(&self.event_type)
    }

    /// Attempts to deserialize the data object as the specified type.
    pub fn deserialize_object<T: serde::de::DeserializeOwned>(
        &self,
    ) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.data.object.clone())
    }
}

/// Processor event types the billing engine reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillingEventType {
    /// A recurring invoice was paid.
    InvoicePaymentSucceeded,
    /// A recurring invoice could not be collected.
    InvoicePaymentFailed,
    /// The processor-side subscription was terminated.
    SubscriptionDeleted,
    /// The processor-side subscription changed (period-end cancellation
    /// toggled, plan changes, ...).
    SubscriptionUpdated,
    /// Anything else; acknowledged and ignored.
    Unknown,
}

impl BillingEventType {
    /// Parse event type from string.
    pub fn from_str(s: &str) -> Self {
        match s {
            "invoice.payment_succeeded" => Self::InvoicePaymentSucceeded,
            "invoice.payment_failed" => Self::InvoicePaymentFailed,
            "customer.subscription.deleted" => Self::SubscriptionDeleted,
            "customer.subscription.updated" => Self::SubscriptionUpdated,
            _ => Self::Unknown,
        }
    }

    /// Convert to the processor event type string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvoicePaymentSucceeded => "invoice.payment_succeeded",
            Self::InvoicePaymentFailed => "invoice.payment_failed",
            Self::SubscriptionDeleted => "customer.subscription.deleted",
            Self::SubscriptionUpdated => "customer.subscription.updated",
            Self::Unknown => "unknown",
        }
    }
}

/// Invoice object carried by `invoice.payment_succeeded` and
/// `invoice.payment_failed` events.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InvoicePayload {
    /// Invoice id (in_xxx format).
    pub id: String,

    /// Processor customer the invoice belongs to.
    #[serde(default)]
    pub customer: Option<String>,

    /// Processor subscription that generated the invoice.
    #[serde(default)]
    pub subscription: Option<String>,

    /// Why the invoice was created ("subscription_cycle" for renewals,
    /// "subscription_create" for the initial charge).
    #[serde(default)]
    pub billing_reason: Option<String>,

    /// Amount collected, in cents.
    #[serde(default)]
    pub amount_paid: i64,

    /// Amount still owed, in cents.
    #[serde(default)]
    pub amount_due: i64,

    /// Metadata propagated from the subscription.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl InvoicePayload {
    /// True for invoices generated by a recurring billing cycle.
    pub fn is_renewal_cycle(&self) -> bool {
        self.billing_reason.as_deref() == Some("subscription_cycle")
    }

    /// The account id the processor claims this invoice belongs to, when the
    /// metadata carries one.
    pub fn claimed_account_id(&self) -> Option<&str> {
        self.metadata.get("account_id").map(String::as_str)
    }
}

/// Subscription object carried by `customer.subscription.*` events.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SubscriptionPayload {
    /// Subscription id (sub_xxx format).
    pub id: String,

    /// Processor customer owning the subscription.
    #[serde(default)]
    pub customer: Option<String>,

    /// Processor-side status string.
    #[serde(default)]
    pub status: Option<String>,

    /// Whether the subscription will end at the current period boundary.
    #[serde(default)]
    pub cancel_at_period_end: bool,

    /// Metadata set when the subscription was created.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Builder for creating test ProcessorEvent instances.
#[cfg(test)]
pub struct ProcessorEventBuilder {
    id: String,
    event_type: String,
    created: i64,
    object: serde_json::Value,
    previous_attributes: Option<serde_json::Value>,
    livemode: bool,
    api_version: String,
}

#[cfg(test)]
impl Default for ProcessorEventBuilder {
    fn default() -> Self {
        Self {
            id: "evt_test_123".to_string(),
            event_type: "invoice.payment_succeeded".to_string(),
            created: chrono::Utc::now().timestamp(),
            object: serde_json::json!({}),
            previous_attributes: None,
            livemode: false,
            api_version: "2023-10-16".to_string(),
        }
    }
}

#[cfg(test)]
impl ProcessorEventBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = event_type.into();
        self
    }

    pub fn created(mut self, created: i64) -> Self {
        self.created = created;
        self
    }

    pub fn object(mut self, object: serde_json::Value) -> Self {
        self.object = object;
        self
    }

    pub fn livemode(mut self, livemode: bool) -> Self {
        self.livemode = livemode;
        self
    }

    pub fn build(self) -> ProcessorEvent {
        ProcessorEvent {
            id: self.id,
            event_type: self.event_type,
            created: self.created,
            data: ProcessorEventData {
                object: self.object,
                previous_attributes: self.previous_attributes,
            },
            livemode: self.livemode,
            api_version: self.api_version,
        }
    }
}
