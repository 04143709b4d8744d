//! Background units of work feeding the studio: streamed model turns and
//! per-file pruning.

mod cancel;
mod coordinator;
mod prune;

pub use cancel::CancelHandle;
pub use coordinator::{StreamCoordinator, StreamError, StreamEvent, StreamHandle};
pub use prune::{PruneCoordinator, PruneError};
