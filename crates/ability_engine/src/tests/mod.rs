//! Crate-level test support and scenarios spanning several modules

pub(crate) mod fixtures;
