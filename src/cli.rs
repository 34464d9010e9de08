use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "quickpick")]
#[command(about = "Snap a product, get a quick verdict on whether to buy it")]
pub struct Cli {
    /// Config file (defaults to <config_dir>/quickpick/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP server
    Serve {
        /// Bind address, overriding the config file
        #[arg(long)]
        bind: Option<String>,
    },

    /// Analyze a product photo through a running server
    Analyze {
        /// Product image
        image: PathBuf,

        /// Second product image; switches to comparison mode
        #[arg(long)]
        compare: Option<PathBuf>,

        /// Server base URL (defaults to http://<server.bind>)
        #[arg(long)]
        server: Option<String>,

        /// User id sent in the identity header; scans are only saved when set
        #[arg(long)]
        user: Option<String>,
    },

    /// Browse or delete saved scans
    Scans {
        #[command(subcommand)]
        command: ScansCommand,
    },

    /// Split saved analysis text into sections
    Parse {
        /// Text file holding a model response ("-" for stdin)
        file: PathBuf,

        #[arg(long, value_enum, default_value_t = ParseMode::Any)]
        mode: ParseMode,
    },

    /// List upstream models that can generate content
    Models,

    /// Show where data and config files are stored
    Paths,
}

#[derive(Subcommand)]
pub enum ScansCommand {
    /// List saved scans, newest first
    List {
        #[arg(long)]
        user: String,
    },

    /// Show one scan with its sections
    Show {
        id: String,

        #[arg(long)]
        user: String,
    },

    /// Delete one of your scans
    Delete {
        id: String,

        #[arg(long)]
        user: String,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ParseMode {
    Single,
    Compare,
    Any,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analyze_with_compare() {
        let cli = Cli::try_parse_from([
            "quickpick", "analyze", "a.jpg", "--compare", "b.jpg", "--user", "u1",
        ])
        .unwrap();
        match cli.command {
            Command::Analyze { image, compare, user, server } => {
                assert_eq!(image, PathBuf::from("a.jpg"));
                assert_eq!(compare, Some(PathBuf::from("b.jpg")));
                assert_eq!(user.as_deref(), Some("u1"));
                assert!(server.is_none());
            }
            _ => panic!("expected analyze"),
        }
    }

    #[test]
    fn global_config_flag() {
        let cli = Cli::try_parse_from(["quickpick", "paths", "--config", "/tmp/q.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/q.toml")));
    }

    #[test]
    fn scans_delete_requires_user() {
        assert!(Cli::try_parse_from(["quickpick", "scans", "delete", "abc"]).is_err());
        assert!(Cli::try_parse_from(["quickpick", "scans", "delete", "abc", "--user", "u"]).is_ok());
    }

    #[test]
    fn parse_mode_default() {
        let cli = Cli::try_parse_from(["quickpick", "parse", "out.txt"]).unwrap();
        match cli.command {
            Command::Parse { mode, .. } => assert_eq!(mode, ParseMode::Any),
            _ => panic!("expected parse"),
        }
    }
}
