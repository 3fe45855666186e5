use anyhow::Result;
use clap::{Parser, Subcommand};
use faq_rag::commands::{ask, ingest, load_config, resolve_config_dir, serve, show_status};
use faq_rag::config::{run_interactive_config, show_config};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "faq-rag")]
#[command(about = "Arabic FAQ chatbot backed by retrieval-augmented generation")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml; relative data paths resolve against it
    #[arg(long, global = true, env = "FAQ_RAG_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure Ollama connection and server settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Build the vector database from the FAQ PDF, replacing any previous one
    Ingest {
        /// PDF to ingest instead of the configured one
        #[arg(long)]
        pdf: Option<PathBuf>,
    },
    /// Start the chat web server
    Serve,
    /// Answer one question and exit
    Ask {
        /// The question, in Arabic
        question: String,
    },
    /// Show configuration, model health and index status
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config_dir = resolve_config_dir(cli.config_dir)?;

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config(&config_dir)?;
            } else {
                run_interactive_config(&config_dir)?;
            }
        }
        Commands::Ingest { pdf } => {
            ingest(load_config(&config_dir)?, pdf).await?;
        }
        Commands::Serve => {
            serve(load_config(&config_dir)?).await?;
        }
        Commands::Ask { question } => {
            ask(load_config(&config_dir)?, &question).await?;
        }
        Commands::Status => {
            show_status(load_config(&config_dir)?).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn serve_command() {
        let cli = Cli::try_parse_from(["faq-rag", "serve"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            assert!(matches!(parsed.command, Commands::Serve));
        }
    }

    #[test]
    fn ingest_command_defaults_to_configured_pdf() {
        let parsed = Cli::try_parse_from(["faq-rag", "ingest"]).expect("should parse");

        if let Commands::Ingest { pdf } = parsed.command {
            assert_eq!(pdf, None);
        } else {
            panic!("expected ingest command");
        }
    }

    #[test]
    fn ingest_command_with_pdf() {
        let parsed = Cli::try_parse_from(["faq-rag", "ingest", "--pdf", "data/other.pdf"])
            .expect("should parse");

        if let Commands::Ingest { pdf } = parsed.command {
            assert_eq!(pdf, Some(PathBuf::from("data/other.pdf")));
        } else {
            panic!("expected ingest command");
        }
    }

    #[test]
    fn ask_command_takes_question() {
        let parsed =
            Cli::try_parse_from(["faq-rag", "ask", "ما هي ساعات العمل؟"]).expect("should parse");

        if let Commands::Ask { question } = parsed.command {
            assert_eq!(question, "ما هي ساعات العمل؟");
        } else {
            panic!("expected ask command");
        }
    }

    #[test]
    fn ask_requires_question() {
        let cli = Cli::try_parse_from(["faq-rag", "ask"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        }
    }

    #[test]
    fn global_config_dir_flag() {
        let parsed = Cli::try_parse_from(["faq-rag", "status", "--config-dir", "/tmp/faq"])
            .expect("should parse");

        assert_eq!(parsed.config_dir, Some(PathBuf::from("/tmp/faq")));
        assert!(matches!(parsed.command, Commands::Status));
    }

    #[test]
    fn config_show_flag() {
        let cli = Cli::try_parse_from(["faq-rag", "config", "--show"]);
        assert!(cli.is_ok());

        if let Ok(parsed) = cli {
            if let Commands::Config { show } = parsed.command {
                assert!(show);
            }
        }
    }

    #[test]
    fn invalid_command() {
        let cli = Cli::try_parse_from(["faq-rag", "invalid"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::InvalidSubcommand);
        }
    }

    #[test]
    fn help_message() {
        let cli = Cli::try_parse_from(["faq-rag", "--help"]);
        assert!(cli.is_err());

        if let Err(err) = cli {
            assert_eq!(err.kind(), ErrorKind::DisplayHelp);
        }
    }
}
