//! Errors reported by fallible container operations.

use std::alloc::Layout;

use thiserror::Error;

/// The error type for operations that may need to allocate.
///
/// A failed operation leaves the container exactly as it was before the call.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The allocator could not provide memory for a new node or value slot.
    #[error("memory allocation of {} bytes failed", .layout.size())]
    OutOfMemory { layout: Layout },
    /// An element or occurrence counter would exceed `usize::MAX`.
    #[error("capacity overflow")]
    CapacityOverflow,
}

pub type Result<T> = std::result::Result<T, Error>;

/// Diverges the way std collections do when an infallible API cannot allocate.
pub(crate) fn handle_error(err: Error) -> ! {
    match err {
        Error::OutOfMemory { layout } => std::alloc::handle_alloc_error(layout),
        Error::CapacityOverflow => panic!("capacity overflow"),
    }
}
