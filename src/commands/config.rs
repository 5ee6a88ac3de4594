use anyhow::Result;

use crate::Context;
use crate::cli::StackArgs;
use crate::config;

/// Print the effective configuration as TOML
pub fn run(_ctx: &Context, args: &StackArgs) -> Result<()> {
    let effective = config::resolve(args)?;
    print!("{}", config::to_toml(&effective)?);
    Ok(())
}
