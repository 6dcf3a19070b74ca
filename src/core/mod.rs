mod error;
mod types;

pub use error::{ParcelError, Result};
pub use types::{Claim, ClaimRecord, OwnerKind, ParcelKey};
