// /////////////////////////////////////////////////////////////////////////////
// Object Vault
// SPDX-License-Identifier: BSD-3-Clause
// /////////////////////////////////////////////////////////////////////////////

//! Shared CLI scaffolding for the three daemons (`aggregatord`,
//! `loadbalancerd`, `hostcontrollerd`). The configuration surface itself
//! (database DSN, backend list, watermarks, ...) is environment-variable
//! driven per §6; these flags only cover process-level concerns that are
//! awkward to express as env vars.

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct CommonArgs {
    /// Path to an optional config file layered under environment variables.
    #[arg(long, value_name = "FILE")]
    pub config: Option<std::path::PathBuf>,

    /// Override RUST_LOG for this process only.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Recreate the metadata store schema at startup (mirrors the
    /// `RESET_SCHEMA` environment variable; the flag takes precedence).
    #[arg(long)]
    pub reset_schema: bool,
}

impl CommonArgs {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
