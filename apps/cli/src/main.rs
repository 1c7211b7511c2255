use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use chatrelay_core_sdk::{
    client::{Backend, ChatClient, ChatSession},
    config::ServerConfig,
    db,
    models::{ChatMessage, MODELS},
    server,
    settings::{ApiKeys, Settings, SettingsStore, Theme},
    telemetry,
};

/**
 * \brief CLI entry: run the chat server or talk to a model from the terminal.
 */
#[derive(Parser, Debug)]
#[command(name = "chatrelay", version, about = "Multi-provider LLM chat relay")]
struct Cli {
    /** \brief Local settings database (theme and API keys). */
    #[arg(long, global = true, default_value = db::DEFAULT_DB_FILE)]
    settings: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /**
     * \brief Start the HTTP chat API and serve the static UI.
     */
    Serve {
        /// Listen address, overrides CHATRELAY_ADDR
        #[arg(long)]
        addr: Option<String>,
        /// Static UI directory, overrides CHATRELAY_UI_DIR
        #[arg(long)]
        ui_dir: Option<PathBuf>,
    },

    /**
     * \brief Interactive chat; `/model <id>` switches model, `/new` starts over, `/quit` exits.
     */
    Chat {
        #[arg(long, default_value = "gemini")]
        model: String,
        /// Base URL of a running server; chats in-process when omitted
        #[arg(long)]
        server: Option<String>,
    },

    /**
     * \brief Send one prompt and print the reply.
     */
    Ask {
        #[arg(long, default_value = "gemini")]
        model: String,
        #[arg(long)]
        prompt: String,
        #[arg(long)]
        system: Option<String>,
        #[arg(long)]
        server: Option<String>,
    },

    /**
     * \brief Show or change local settings.
     */
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /**
     * \brief List the known model identifiers.
     */
    Models,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    Show,
    /// Store an API key (gemini, openai, anthropic, openrouter, grok, deepseek)
    SetKey { provider: String, key: String },
    /// dark or light
    Theme { theme: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { addr, ui_dir } => {
            let mut config = ServerConfig::from_env().context("load configuration failed")?;
            if let Some(addr) = addr {
                config.addr = addr;
            }
            if let Some(dir) = ui_dir {
                config.ui_dir = dir;
            }
            server::run(config).await?;
        }
        Commands::Chat { model, server } => {
            let settings = load_settings(&cli.settings)?;
            let backend = build_backend(server)?;
            run_repl(ChatSession::new(backend, model, settings.api_keys)).await?;
        }
        Commands::Ask {
            model,
            prompt,
            system,
            server,
        } => {
            let settings = load_settings(&cli.settings)?;
            let mut messages = Vec::new();
            if let Some(system) = system {
                messages.push(ChatMessage::system(system));
            }
            messages.push(ChatMessage::user(prompt));

            let reply = build_backend(server)?
                .complete(&messages, &model, &settings.api_keys)
                .await
                .context("chat request failed")?;
            println!("{}", reply);
        }
        Commands::Config { command } => {
            let store = SettingsStore::open(&cli.settings).context("open settings failed")?;
            let settings = match command {
                ConfigCommand::Show => store.load(),
                ConfigCommand::SetKey { provider, key } => store
                    .update_api_key(&provider, &key)
                    .context("save api key failed")?,
                ConfigCommand::Theme { theme } => {
                    let theme: Theme = theme.parse()?;
                    store.set_theme(theme).context("save theme failed")?
                }
            };
            print_settings(&settings);
        }
        Commands::Models => {
            for model in MODELS {
                let backing = model.vendor.map(|v| v.name()).unwrap_or("simulated only");
                println!("{:<12} {:<12} {}", model.id, model.name, backing);
            }
        }
    }

    Ok(())
}

fn load_settings(path: &Path) -> Result<Settings> {
    let store = SettingsStore::open(path).context("open settings failed")?;
    Ok(store.load())
}

fn build_backend(server: Option<String>) -> Result<Backend> {
    match server {
        Some(url) => Ok(Backend::Remote(ChatClient::new(url))),
        None => {
            let config = ServerConfig::from_env().context("load configuration failed")?;
            let defaults = config
                .provider_defaults()
                .context("build provider defaults failed")?;
            Ok(Backend::Local(Arc::new(defaults)))
        }
    }
}

async fn run_repl(mut session: ChatSession) -> Result<()> {
    println!("assistant> {}", session.messages()[0].content);
    let stdin = std::io::stdin();
    let mut line = String::new();
    loop {
        print!("you> ");
        std::io::stdout().flush().ok();
        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim_end_matches(['\r', '\n']);
        match input.trim() {
            "/quit" | "/exit" => break,
            "/new" => {
                session.reset();
                println!("assistant> {}", session.messages()[0].content);
                continue;
            }
            cmd if cmd == "/model" || cmd.starts_with("/model ") => {
                let id = cmd.trim_start_matches("/model").trim();
                if id.is_empty() {
                    println!("current model: {}", session.model());
                } else {
                    session.set_model(id);
                    println!("switched to {}", id);
                }
                continue;
            }
            _ => {}
        }
        if let Some(reply) = session.submit(input).await {
            println!("assistant> {}", reply.content);
        }
    }
    Ok(())
}

fn print_settings(settings: &Settings) {
    let theme = match settings.theme {
        Theme::Dark => "dark",
        Theme::Light => "light",
    };
    println!("theme: {}", theme);
    for name in ApiKeys::NAMES {
        let key = settings.api_keys.get(name).unwrap_or("");
        println!("{:<11} {}", format!("{}:", name), mask(key));
    }
}

fn mask(key: &str) -> String {
    let key = key.trim();
    if key.is_empty() {
        return "(not set)".to_string();
    }
    let tail: String = key
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("****{}", tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_ask() {
        let cli = Cli::try_parse_from([
            "chatrelay", "ask", "--model", "claude-3", "--prompt", "Hi", "--system", "Be terse",
        ])
        .expect("parse");
        match cli.command {
            Commands::Ask { model, prompt, system, server } => {
                assert_eq!(model, "claude-3");
                assert_eq!(prompt, "Hi");
                assert_eq!(system.as_deref(), Some("Be terse"));
                assert!(server.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert_eq!(cli.settings, PathBuf::from("chatrelay.db"));
    }

    #[test]
    fn test_cli_parses_config_set_key() {
        let cli = Cli::try_parse_from([
            "chatrelay", "--settings", "/tmp/s.db", "config", "set-key", "openai", "sk-1",
        ])
        .expect("parse");
        assert_eq!(cli.settings, PathBuf::from("/tmp/s.db"));
        assert!(matches!(
            cli.command,
            Commands::Config { command: ConfigCommand::SetKey { .. } }
        ));
    }

    #[test]
    fn test_mask_keeps_last_four_chars() {
        assert_eq!(mask(""), "(not set)");
        assert_eq!(mask("sk-abcdef1234"), "****1234");
        assert_eq!(mask("abc"), "****abc");
    }
}
