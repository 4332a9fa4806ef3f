//! A cloneable handle for observing and tearing down a chat widget.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio_util::sync::CancellationToken;

/// A cloneable handle for observing and tearing down a chat widget.
///
/// All fields are shared, so cloning is cheap.
#[derive(Clone, Default)]
pub struct ChatHandle {
    pub(crate) closed: CancellationToken,
    pub(crate) is_typing: Arc<AtomicBool>,
}

impl ChatHandle {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Tear the widget down. Any in-flight reply stops writing to the store
    /// and further input is ignored.
    pub fn close(&self) {
        self.closed.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    /// Whether a reply is pending; input should be disabled meanwhile.
    pub fn is_typing(&self) -> bool {
        self.is_typing.load(Ordering::Acquire)
    }

    pub(crate) fn set_typing(&self, typing: bool) -> bool {
        self.is_typing.swap(typing, Ordering::AcqRel) != typing
    }
}
