// SPDX-License-Identifier: MIT OR Apache-2.0

//! Interfaces to the collaborators consulted while authorizing.
mod capability_store;
mod directory;

pub use capability_store::CapabilityStore;
pub use directory::Directory;
