//! Notification adapters.
//!
//! Implementations of the `Notifier` port: a Resend email sender for
//! production and a tracing sink for development. Tests use the recording
//! notifier from the memory adapters.

mod email_notifier;
mod tracing_notifier;

pub use email_notifier::{EmailNotifier, EmailNotifierConfig};
pub use tracing_notifier::TracingNotifier;
