//! Renderer port.

use crate::change::Change;

/// Turns a [`Change`] into the text a sink delivers.
pub trait Renderer: Send + Sync {
    /// Renders the change.
    fn render(&self, change: &Change) -> String;
}
