pub(crate) mod blockchain;
pub(crate) mod publisher;
