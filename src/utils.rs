//! Internal helpers

pub(crate) mod str;
pub(crate) mod sync;
