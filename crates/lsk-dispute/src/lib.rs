//! lsk-dispute
//!
//! Appeal records and the dispute gate. A dispute blocks the normal
//! close→relist cascade; its resolution is the only forced transition in
//! the order lifecycle and always leaves the resource delisted.

mod gate;
mod store;
mod types;

pub use gate::DisputeGate;
pub use store::{AppealHold, AppealStore, MemoryAppealStore};
pub use types::{Appeal, AppealCategory, AppealState, NewAppeal, Verdict};
