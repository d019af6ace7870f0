#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod command;
pub mod error;
pub mod models;
pub mod payload;
pub mod topic;

pub use error::ProtocolError;
pub use models::*;
