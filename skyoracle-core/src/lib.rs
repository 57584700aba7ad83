#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]
#![forbid(unsafe_code)]

pub mod events;
pub mod feed;
pub mod ledger;
pub mod processors;
pub mod registry;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;
