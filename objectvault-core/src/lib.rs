// /////////////////////////////////////////////////////////////////////////////
// Object Vault
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Core crate for the object vault storage service: infrastructure
//! adapters for the domain's port traits, the application services built
//! on top of them, and the three daemon binaries under `src/bin`.

pub mod application;
pub mod infrastructure;
