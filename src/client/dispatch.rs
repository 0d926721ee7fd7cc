//! Routing of inbound messages to handlers by operation code.
//!
//! The table is built before the client and never changes afterwards, so the
//! event loop reads it without locking.

use std::{collections::HashMap, error::Error, fmt, sync::Arc};

use super::ClientError;
use crate::proto::Message;

/// Error returned by a handler. Logged by the event loop and otherwise
/// ignored.
pub type HandlerError = Box<dyn Error + Send + Sync>;

/// Handler invoked for every inbound message with a matching operation code.
pub type DispatchHandler = Arc<dyn Fn(&Message) -> Result<(), HandlerError> + Send + Sync>;

/// Mapping from operation code to handler.
///
/// # Examples
///
/// ```
/// use opframe::{client::DispatchTable, proto::op};
///
/// let table = DispatchTable::new()
///     .route(op::HEARTBEAT_REPLY, |_msg| Ok(()))
///     .expect("first registration succeeds");
/// assert!(table.contains(op::HEARTBEAT_REPLY));
/// ```
#[derive(Clone, Default)]
pub struct DispatchTable {
    handlers: HashMap<u32, DispatchHandler>,
}

impl DispatchTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Register `handler` for `operation`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::DuplicateRoute`] if a handler for `operation`
    /// was already registered.
    pub fn route<F>(mut self, operation: u32, handler: F) -> Result<Self, ClientError>
    where
        F: Fn(&Message) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        if self.handlers.contains_key(&operation) {
            return Err(ClientError::DuplicateRoute(operation));
        }
        self.handlers.insert(operation, Arc::new(handler));
        Ok(self)
    }

    /// Handler registered for `operation`, if any.
    #[must_use]
    pub fn get(&self, operation: u32) -> Option<&DispatchHandler> { self.handlers.get(&operation) }

    /// Whether a handler is registered for `operation`.
    #[must_use]
    pub fn contains(&self, operation: u32) -> bool { self.handlers.contains_key(&operation) }

    /// Number of registered operations.
    #[must_use]
    pub fn len(&self) -> usize { self.handlers.len() }

    /// Whether no operation is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.handlers.is_empty() }
}

impl From<HashMap<u32, DispatchHandler>> for DispatchTable {
    fn from(handlers: HashMap<u32, DispatchHandler>) -> Self { Self { handlers } }
}

impl fmt::Debug for DispatchTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut operations: Vec<_> = self.handlers.keys().copied().collect();
        operations.sort_unstable();
        f.debug_struct("DispatchTable")
            .field("operations", &operations)
            .finish()
    }
}
