pub mod constants;
pub mod error;
pub mod member;
pub mod types;

pub use error::{Error, Result};
pub use member::{ArrivalEvent, Capability, MemberRecord, MemberUpdate, Permissions, TapOutcome};
pub use types::*;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
