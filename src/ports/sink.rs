//! Notification sink port.

use std::future::Future;
use std::pin::Pin;

use crate::error::SinkError;

/// Boxed future type alias used by [`Sink`] to keep the trait dyn-compatible.
pub type DeliveryFuture<'a> = Pin<Box<dyn Future<Output = Result<(), SinkError>> + Send + 'a>>;

/// A destination for rendered notifications (a chat webhook, stdout, ...).
pub trait Sink: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &str;

    /// Delivers one rendered message.
    ///
    /// # Errors
    ///
    /// Returns an error if the message could not be handed over or the
    /// destination refused it.
    fn deliver<'a>(&'a self, text: &'a str) -> DeliveryFuture<'a>;
}
