// SPDX-License-Identifier: PMPL-1.0-or-later

//! smart-factory: inspect and exercise an application's logging and
//! localization setup from the command line.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use smart_factory::config::Config;
use smart_factory::diagnostics;
use smart_factory::i18n::LanguageManager;
use smart_factory::profiler::{DebugProfiler, DEBUG_FILE};
use smart_factory::request::RequestContext;
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "smart-factory")]
#[command(version)]
#[command(about = "Error tracing, debug logging and localization services")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file (YAML or JSON)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override log.log_path
    #[arg(long, global = true, value_name = "DIR")]
    log_path: Option<String>,

    /// Override localization.localization_path
    #[arg(long, global = true, value_name = "DIR")]
    localization_path: Option<String>,

    /// Debug-level logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check log directory and translation files
    Check,

    /// Append a message to a debug log file
    Log {
        message: String,

        /// Log file inside the log directory
        #[arg(short, long, default_value = DEBUG_FILE)]
        file: String,

        /// Include the call stack
        #[arg(long)]
        call_stack: bool,
    },

    /// Delete the log files in the log directory
    ClearLogs,

    /// Translate a text id
    Text {
        id: String,

        /// Language code (default: first interface language)
        #[arg(short, long)]
        lang: Option<String>,

        /// Returned when no translation exists
        #[arg(short, long)]
        default: Option<String>,
    },

    /// List language names in a language
    Languages {
        #[arg(short, long)]
        lang: Option<String>,

        /// Codes listed first, comma-separated
        #[arg(long, value_delimiter = ',')]
        first: Vec<String>,
    },

    /// List country names in a language
    Countries {
        #[arg(short, long)]
        lang: Option<String>,

        /// Codes listed first, comma-separated
        #[arg(long, value_delimiter = ',')]
        first: Vec<String>,
    },

    /// Show which language a request would get
    Detect {
        /// Value of the `language` request parameter
        #[arg(long)]
        param: Option<String>,

        /// Content-Language header
        #[arg(long)]
        content_language: Option<String>,

        /// Accept-Language header
        #[arg(long)]
        accept_language: Option<String>,

        /// Value of the `<context>_language` cookie
        #[arg(long)]
        cookie: Option<String>,

        #[arg(long, default_value = "default")]
        context: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(log_path) = cli.log_path {
        config.log.log_path = log_path;
    }
    if let Some(localization_path) = cli.localization_path {
        config.localization.localization_path = localization_path;
    }

    match cli.command {
        Commands::Check => diagnostics::run_self_check(&config)?,

        Commands::Log {
            message,
            file,
            call_stack,
        } => {
            let profiler = open_profiler(&config)?;
            profiler.debug_message(&message, call_stack, &file)?;
            println!("Appended to {}", profiler.log_path().join(&file).display());
        }

        Commands::ClearLogs => {
            let profiler = open_profiler(&config)?;
            profiler.clear_log_files();
            println!("Cleared logs in {}", profiler.log_path().display());
        }

        Commands::Text { id, lang, default } => {
            let languages = open_languages(&config)?;
            println!(
                "{}",
                languages.text(&id, lang.as_deref(), default.as_deref())
            );
        }

        Commands::Languages { lang, first } => {
            let languages = open_languages(&config)?;
            let first: Vec<&str> = first.iter().map(String::as_str).collect();
            match languages.language_list(lang.as_deref(), &first) {
                Some(list) => print_list(&list),
                None => bail!("no language names for '{}'", resolved(&languages, lang)),
            }
        }

        Commands::Countries { lang, first } => {
            let languages = open_languages(&config)?;
            let first: Vec<&str> = first.iter().map(String::as_str).collect();
            match languages.country_list(lang.as_deref(), &first) {
                Some(list) => print_list(&list),
                None => bail!("no country names for '{}'", resolved(&languages, lang)),
            }
        }

        Commands::Detect {
            param,
            content_language,
            accept_language,
            cookie,
            context,
        } => {
            let mut languages = open_languages(&config)?;
            languages.set_context(context.as_str());

            let mut request = RequestContext::new();
            if let Some(value) = param {
                request = request.with_param("language", value);
            }
            if let Some(value) = content_language {
                request = request.with_header("Content-Language", value);
            }
            if let Some(value) = accept_language {
                request = request.with_header("Accept-Language", value);
            }
            if let Some(value) = cookie {
                request = request.with_cookie(format!("{}_language", context), value);
            }

            println!("{}", languages.detect_language(&request));
            for cookie in languages.take_cookies() {
                println!("Set-Cookie: {}", cookie.header_value());
            }
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn open_profiler(config: &Config) -> Result<DebugProfiler> {
    if config.log.log_path.is_empty() {
        bail!("no log directory configured (use --log-path or log.log_path)");
    }
    Ok(DebugProfiler::new(
        &config.log.log_path,
        config.log.write_source_file_and_line,
    )?)
}

fn open_languages(config: &Config) -> Result<LanguageManager> {
    if config.localization.localization_path.is_empty() {
        bail!("no localization directory configured (use --localization-path)");
    }
    let mut languages = LanguageManager::new(config.localization.clone());
    languages.load_dictionary()?;
    Ok(languages)
}

fn resolved(languages: &LanguageManager, lang: Option<String>) -> String {
    lang.unwrap_or_else(|| languages.current_language())
}

fn print_list(list: &indexmap::IndexMap<String, String>) {
    for (code, name) in list {
        println!("{:6} {}", code, name);
    }
}
