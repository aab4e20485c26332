pub mod config;
pub mod error;
pub mod events;
pub mod persist;
pub mod store;

pub mod prelude {
    pub use crate::error::Result;
    pub use crate::events::{Removed, StoreEvents, Updated};
    pub use crate::persist::{FileSlot, InMemorySlot, StateSlot, WarningSink};
    pub use crate::store::{CheckpointEngine, RemoveTarget};
    pub use crate::store::{Checkpoint, CheckpointStore, FileEntry};
}
