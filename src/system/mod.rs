//! # System Boundary Layer
//!
//! This module holds the collaborators that sit between the dispatch core
//! and the hosting process.
//!
//! ## Modules
//!
//! - **`provider`**: the type-keyed instance provider. Factories are
//!   registered once at startup into a [`provider::ServiceCollection`];
//!   each dispatch then opens a short-lived [`provider::ServiceScope`]
//!   that owns the handler-group instance for exactly one invocation.
//! - **`hosting`**: the process lifecycle wrapper. It inspects the leading
//!   process argument and either hands the rest to the command resolver or
//!   starts the host's normal long-lived service.

pub mod hosting;
pub mod provider;
