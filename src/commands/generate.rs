use anyhow::{Context as _, Result};
use publicip::{IpifyResolver, LookupOptions};
use stackgraph::{AddressResolver, Document, NetworkAddress, StackConfig, StaticResolver};
use std::net::IpAddr;
use std::time::Duration;

use crate::Context;
use crate::cli::GenerateArgs;
use crate::config;
use crate::ui;

pub fn run(ctx: &Context, args: GenerateArgs) -> Result<()> {
    let stack = config::resolve(&args.stack)?;
    let document = match args.address.as_deref() {
        Some(address) => {
            let address: NetworkAddress = address.parse()?;
            warn_if_not_public(ctx, address);
            build(&stack, &StaticResolver::new(address))?
        }
        None => {
            if !ctx.quiet {
                ui::info("Looking up your public address...");
            }
            let resolver = IpifyResolver::with_options(
                LookupOptions::default()
                    .endpoint(args.endpoint.as_str())
                    .timeout(Duration::from_secs(args.timeout)),
            );
            build(&stack, &resolver)?
        }
    };

    let json = if args.compact {
        document.to_json()?
    } else {
        document.to_json_pretty()?
    };
    println!("{json}");

    if !ctx.quiet {
        ui::success(&format!(
            "Generated {} resources for {} ({} mode)",
            document.resources.len(),
            stack.application_name,
            stack.bootstrap_mode
        ));
        if ctx.verbose > 0 {
            ui::dim("Regenerate before deploying if your address changes.");
        }
    }
    Ok(())
}

fn build(stack: &StackConfig, resolver: &dyn AddressResolver) -> Result<Document> {
    stackgraph::generate(stack, resolver).context("Template generation failed")
}

/// Ingress scoped to a non-routable address would lock the operator out
fn warn_if_not_public(ctx: &Context, address: NetworkAddress) {
    if ctx.quiet {
        return;
    }
    let not_public = match address.address() {
        IpAddr::V4(v4) => v4.is_private() || v4.is_loopback() || v4.is_link_local(),
        IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified(),
    };
    if not_public {
        ui::warn(&format!(
            "{address} is not a public address; ingress will only admit {}",
            address.cidr()
        ));
    }
}
