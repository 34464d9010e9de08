mod analysis;
mod cli;
mod client;
mod config;
mod error;
mod framing;
mod history;
mod image;
mod llm;
mod paths;
mod report;
mod server;
mod storage;

use std::io::Read;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command, ParseMode, ScansCommand};
use console::style;
use tracing_subscriber::EnvFilter;

use analysis::{Mode, Schema};

fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = config::load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Serve { bind } => {
            init_tracing("quickpick=info,tower_http=info");
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            server::serve(config).await
        }

        Command::Analyze {
            image,
            compare,
            server,
            user,
        } => {
            init_tracing("quickpick=warn");
            let target = client::RemoteTarget {
                server: server.unwrap_or_else(|| format!("http://{}", config.server.bind)),
                user_header: config.auth.user_header.clone(),
                user,
            };
            client::analyze_remote(&image, compare.as_deref(), &target).await
        }

        Command::Scans { command } => {
            let conn = storage::db::open_db(&config.storage.db_path())?;
            match command {
                ScansCommand::List { user } => {
                    print!("{}", report::render_scan_list(&history::list(&conn, &user)?));
                }
                ScansCommand::Show { id, user } => {
                    print!("{}", report::render_scan_detail(&history::show(&conn, &user, &id)?));
                }
                ScansCommand::Delete { id, user } => {
                    let scan = history::delete(&conn, &user, &id)?;
                    println!(
                        "Deleted {} ({})",
                        style(scan.display_name()).bold(),
                        style(&scan.id).dim()
                    );
                }
            }
            Ok(())
        }

        Command::Parse { file, mode } => {
            let text = if file.as_os_str() == "-" {
                let mut buf = String::new();
                std::io::stdin()
                    .read_to_string(&mut buf)
                    .context("Failed to read stdin")?;
                buf
            } else {
                std::fs::read_to_string(&file)
                    .with_context(|| format!("Failed to read {}", file.display()))?
            };
            let schema = match mode {
                ParseMode::Single => Mode::Single.schema(),
                ParseMode::Compare => Mode::Compare.schema(),
                ParseMode::Any => Schema::any(),
            };
            print!("{}", report::render_analysis(&text, &schema));
            Ok(())
        }

        Command::Models => {
            init_tracing("quickpick=warn");
            let key = llm::provider::require_api_key()?;
            let models = llm::gemini::list_models(&key, &config.model).await?;
            print!("{}", report::render_model_list(&models, &config.model.candidates));
            Ok(())
        }

        Command::Paths => {
            println!("Config: {}", paths::config_file().display());
            println!("Data:   {}", paths::data_dir().display());
            println!("DB:     {}", config.storage.db_path().display());
            Ok(())
        }
    }
}
