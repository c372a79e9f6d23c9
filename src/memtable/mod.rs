//! MemTable Module
//!
//! The in-memory record set.
//!
//! ## Responsibilities
//! - Fast reads and writes in memory
//! - Linearizable get/put/delete from many threads
//! - Consistent copies of the whole set for snapshots
//! - Atomic wholesale replacement when a snapshot is loaded
//!
//! ## Data Structure Choice
//! BTreeMap wrapped in a parking_lot RwLock:
//! - Many concurrent readers, one writer at a time
//! - Ordered keys, so snapshots come out sorted without an extra pass

mod table;

pub use table::MemTable;
