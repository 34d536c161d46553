//! CLI subcommands that do more than call the service once

pub mod init;
pub mod status;
