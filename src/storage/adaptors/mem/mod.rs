mod mem_state_storage;

pub use mem_state_storage::*;

#[cfg(test)]
mod mem_state_storage_test;
