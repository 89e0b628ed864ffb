//! ID generator port for subscription identifiers.

/// Generates unique identifiers.
///
/// Each subscription gets a fresh id so that a terminating polling loop
/// only ever removes its own registry entry.
pub trait IdGenerator: Send + Sync {
    /// Generates a new unique identifier string.
    fn generate_id(&self) -> String;
}
