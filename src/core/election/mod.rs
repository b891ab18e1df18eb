mod election_handler;
pub(crate) use election_handler::*;
