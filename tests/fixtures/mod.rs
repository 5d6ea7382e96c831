// Shared across test binaries; not every helper is used by each one.
#![allow(dead_code)]

pub mod context;
pub mod tasks;
