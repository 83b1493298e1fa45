use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(version, about = "Parse and build proxy share links", long_about = None)]
pub struct Args {
    #[arg(short, long, global = true, help = "Codec config TOML file")]
    pub config: Option<String>,

    #[arg(short, long, global = true, help = "Emit debug log")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Parse one share link and print it as JSON
    Parse {
        #[arg(help = "Share link, e.g. trojan://pass@host:443#name")]
        link: String,

        #[arg(short, long, help = "Print the engine outbound instead of the model")]
        engine: bool,
    },

    /// Build a share link from a model JSON file
    Serialize {
        #[arg(help = "Canonical outbound JSON file")]
        file: String,
    },

    /// Print the blank template for a protocol
    Template {
        #[arg(help = "One of vmess, vless, trojan, ss, hysteria2")]
        protocol: String,
    },

    /// Parse a link list, plain or base64-wrapped
    Import {
        #[arg(help = "Link list file")]
        file: String,

        #[arg(short, long, help = "Print engine outbounds instead of models")]
        engine: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_subcommand() {
        let args = Args::try_parse_from(["sharelink", "-v", "parse", "ss://x@h:1", "--engine"])
            .unwrap();
        assert!(args.verbose);
        assert!(args.config.is_none());
        match args.command {
            Command::Parse { link, engine } => {
                assert_eq!(link, "ss://x@h:1");
                assert!(engine);
            }
            _ => panic!("Expected parse subcommand"),
        }
    }

    #[test]
    fn test_global_config_after_subcommand() {
        let args =
            Args::try_parse_from(["sharelink", "import", "links.txt", "-c", "codec.toml"]).unwrap();
        assert_eq!(args.config.as_deref(), Some("codec.toml"));
        assert!(matches!(args.command, Command::Import { engine: false, .. }));
    }

    #[test]
    fn test_missing_subcommand_rejected() {
        assert!(Args::try_parse_from(["sharelink"]).is_err());
    }
}
