mod adaptors;
mod state_storage;

#[doc(hidden)]
pub use adaptors::*;
pub use state_storage::*;
