//! Output artifacts and the background pool that writes them.

pub mod layout;
pub mod pool;

pub use layout::{OutputLayout, read_archive, read_index, write_archive, write_index};
pub use pool::{PersistencePool, WorkUnit};
