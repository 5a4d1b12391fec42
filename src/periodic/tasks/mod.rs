pub(crate) mod filter_poll;
