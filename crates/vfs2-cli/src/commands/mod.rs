//! Command handlers, one module per subcommand

pub mod compress;
pub mod extract;
pub mod fix;
pub mod hash;
pub mod list;
