// Copyright (c) 2025 - Cowboy AI, Inc.

//! Backend adapter implementations
//!
//! Each adapter translates one backend's native inventory into the common
//! [`Resource`](crate::domain::Resource) model and implements the
//! [`ResourceLister`](crate::domain::ResourceLister) and
//! [`ResourceGetter`](crate::domain::ResourceGetter) traits.

pub mod memory;

pub use memory::InMemoryInventory;

#[cfg(feature = "netbox")]
pub mod netbox;

#[cfg(feature = "netbox")]
pub use netbox::{NetBoxConfig, NetBoxInventory};
