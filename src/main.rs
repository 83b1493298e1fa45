#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::style)]

use anyhow::{Context, bail};
use clap::Parser;
use serde::Serialize;
use sharelink::cli::{Args, Command};
use sharelink::config::CodecConfig;
use sharelink::model::{CanonicalOutbound, ProtocolKind};
use sharelink::{parse_link, parse_link_list, serialize_link, template, to_outbound};
use tracing::Level;

fn main() {
    let args = Args::parse();
    let is_verbose = args.verbose;
    tracing_subscriber::fmt()
        .with_max_level(if is_verbose {
            Level::TRACE
        } else {
            Level::INFO
        })
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(args) {
        tracing::error!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let config = CodecConfig::load(args.config.as_deref())?;
    if let Some(path) = &args.config {
        tracing::debug!("Loaded codec config from: {}", path);
    }

    match args.command {
        Command::Parse { link, engine } => {
            let outbound = parse_link(&link).context("Failed to parse share link")?;
            if engine {
                print_json(&to_outbound(&outbound, &config.outbound_tag))?;
            } else {
                print_json(&outbound)?;
            }
        }
        Command::Serialize { file } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read outbound from {file}"))?;
            let outbound: CanonicalOutbound =
                serde_json::from_str(&content).context("Failed to parse outbound JSON")?;
            let link = serialize_link(&outbound, &config.share_options())?;
            println!("{link}");
        }
        Command::Template { protocol } => {
            let kind = ProtocolKind::from_scheme(&protocol)?;
            print_json(&template(kind))?;
        }
        Command::Import { file, engine } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read link list from {file}"))?;

            let mut outbounds = Vec::new();
            for (index, result) in parse_link_list(&content).into_iter().enumerate() {
                match result {
                    Ok(outbound) => outbounds.push(outbound),
                    Err(e) if config.skip_invalid => {
                        tracing::warn!("Skipping link #{}: {}", index + 1, e);
                    }
                    Err(e) => bail!("Link #{} is invalid: {}", index + 1, e),
                }
            }
            tracing::info!("Imported {} outbounds", outbounds.len());

            if engine {
                let projected: Vec<_> = outbounds
                    .iter()
                    .enumerate()
                    .map(|(index, outbound)| {
                        to_outbound(outbound, &format!("{}-{}", config.outbound_tag, index + 1))
                    })
                    .collect();
                print_json(&projected)?;
            } else {
                print_json(&outbounds)?;
            }
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
