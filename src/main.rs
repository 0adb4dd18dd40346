use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use futures_util::StreamExt;
use kitchen_timer::cli::{Cli, Commands, ConfigAction};
use kitchen_timer::config::Config;
use kitchen_timer::output::{format_interpretation, render_event, render_json};
use kitchen_timer::{
    AggregatorConfig, CommandParser, LineEngine, ParseMode, RecognitionEngine, ScriptedEngine,
    SpeechAggregator, voice_events,
};
use owo_colors::OwoColorize;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Parse { ref text, json } => {
            let config = load_config(&cli)?;
            init_logging(&config, &cli);
            let parser = CommandParser::from_config(&config);
            let interpretation = parser.parse_alternatives(text.as_slice());
            if json {
                render_json(&interpretation)?;
            } else if !cli.quiet {
                println!("{}", format_interpretation(&interpretation));
            }
            if !interpretation.is_match() {
                std::process::exit(1);
            }
        }
        Commands::Replay { ref file, json } => {
            let config = load_config(&cli)?;
            init_logging(&config, &cli);
            let script = std::fs::read_to_string(file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let engine = ScriptedEngine::from_json(&script)?;
            run_session(engine, &config, &cli, json).await?;
        }
        Commands::Listen { json } => {
            let config = load_config(&cli)?;
            init_logging(&config, &cli);
            if !cli.quiet && !json {
                eprintln!(
                    "{}",
                    "Type a command per line (alternatives separated by '|'), Ctrl-D to finish"
                        .dimmed()
                );
            }
            let engine = LineEngine::new(BufReader::new(std::io::stdin()));
            run_session(engine, &config, &cli, json).await?;
        }
        Commands::Config { action } => {
            handle_config_command(action, cli.config.as_deref())?;
        }
        Commands::Completions { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "kitchen-timer",
                &mut std::io::stdout(),
            );
        }
    }

    Ok(())
}

/// Load configuration from file or use defaults.
///
/// Priority order:
/// 1. Custom config path from CLI (--config)
/// 2. Default config path (~/.config/kitchen-timer/config.toml)
/// 3. Built-in defaults
///
/// Environment variables and `--mode` are applied on top.
fn load_config(cli: &Cli) -> Result<Config> {
    let config = match cli.config.as_deref() {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Config::load_or_default(&Config::default_path())?,
    };

    let mut config = config.with_env_overrides();
    if let Some(mode) = cli.mode.as_deref() {
        config.parser.mode = mode.parse::<ParseMode>()?;
    }
    Ok(config)
}

/// Install the stderr log subscriber.
///
/// `RUST_LOG` wins; otherwise the configured level, raised by `-vv`/`-vvv`.
fn init_logging(config: &Config, cli: &Cli) {
    let level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 | 1 => config.logging.level.as_str(),
            2 => "debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Drive one aggregated speech session and print what was heard.
async fn run_session<E>(engine: E, config: &Config, cli: &Cli, json: bool) -> Result<()>
where
    E: RecognitionEngine + 'static,
{
    let aggregator = SpeechAggregator::with_config(engine, AggregatorConfig::from_config(config));
    let stop = aggregator.stop_handle();
    let parser = CommandParser::from_config(config);
    let verbose = cli.verbose > 0;

    let mut events = std::pin::pin!(voice_events(aggregator, parser));
    loop {
        tokio::select! {
            event = events.next() => {
                let Some(event) = event else { break };
                let event = event?;
                if json {
                    render_json(&event)?;
                } else if !cli.quiet {
                    render_event(&event, verbose);
                }
            }
            result = tokio::signal::ctrl_c(), if !stop.is_stop_requested() => {
                result?;
                debug!("interrupted; stopping session");
                stop.request_stop();
            }
        }
    }
    Ok(())
}

/// Handle configuration commands.
fn handle_config_command(action: ConfigAction, custom_path: Option<&Path>) -> Result<()> {
    let config_path = custom_path
        .map(PathBuf::from)
        .unwrap_or_else(Config::default_path);

    match action {
        ConfigAction::Get { key } => {
            let config = Config::load_or_default(&config_path)?.with_env_overrides();
            match config.get_value_by_path(&key) {
                Ok(value) => println!("{}", value),
                Err(e) => {
                    eprintln!("{}", format!("Error: {}", e).red());
                    std::process::exit(1);
                }
            }
        }
        ConfigAction::Set { key, value } => {
            Config::set_value_by_path(&config_path, &key, &value)?;
            println!("{} {} = {}", "Set".green(), key, value);
        }
        ConfigAction::List { key } => {
            let config = Config::load_or_default(&config_path)?.with_env_overrides();
            let rendered = match key.as_deref() {
                Some(section) => config.display_section(section),
                None => config.to_display_toml(),
            };
            match rendered {
                Ok(toml) => print!("{}", toml),
                Err(e) => {
                    eprintln!("{}", format!("Error: {}", e).red());
                    std::process::exit(1);
                }
            }
        }
        ConfigAction::Dump => {
            print!("{}", Config::dump_template());
        }
    }
    Ok(())
}
