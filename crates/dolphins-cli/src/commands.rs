use std::path::Path;

use anyhow::Context;
use colored::Colorize;
use dolphins_ledger::JournalConfig;
use dolphins_registry::{Invocation, Operation, RegistryConfig};
use dolphins_server::{AppState, DolphinsServer, ServerConfig};
use dolphins_types::{Diver, HistoryRecord};
use tracing::{debug, info};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let output = match cli.command {
        Command::Invoke(args) => {
            let registry = RegistryConfig {
                level_match: args.level_match.into(),
                allow_overwrite: !args.no_overwrite,
            };
            let state = open_state(&cli.journal, registry)?;
            cmd_invoke(&state, &args.function, args.args, &cli.format)?
        }
        Command::Show(args) => {
            let state = open_state(&cli.journal, RegistryConfig::default())?;
            cmd_show(&state, &args.id, &cli.format)?
        }
        Command::History(args) => {
            let state = open_state(&cli.journal, RegistryConfig::default())?;
            cmd_history(&state, &args.id, &cli.format)?
        }
        Command::List => {
            let state = open_state(&cli.journal, RegistryConfig::default())?;
            cmd_list(&state, &cli.format)?
        }
        Command::Serve(args) => return cmd_serve(args, &cli.journal),
    };
    println!("{output}");
    Ok(())
}

fn open_state(journal: &Path, registry: RegistryConfig) -> anyhow::Result<AppState> {
    let config = ServerConfig {
        journal_path: Some(journal.to_path_buf()),
        journal: JournalConfig::default(),
        registry,
        ..ServerConfig::default()
    };
    let state = AppState::from_config(&config)
        .with_context(|| format!("failed to open ledger journal {}", journal.display()))?;
    debug!(journal = %journal.display(), "ledger opened");
    Ok(state)
}

fn cmd_invoke(
    state: &AppState,
    function: &str,
    args: Vec<String>,
    format: &OutputFormat,
) -> anyhow::Result<String> {
    let payload = state.execute(&Invocation::new(function, args))?;
    Ok(match format {
        OutputFormat::Json => payload,
        OutputFormat::Text => format!("{} {}\n{}", "✓".green().bold(), function.cyan(), payload),
    })
}

fn cmd_show(state: &AppState, id: &str, format: &OutputFormat) -> anyhow::Result<String> {
    let payload = state.execute(&Invocation::new(Operation::GetLevel.name(), [id]))?;
    match format {
        OutputFormat::Json => Ok(payload),
        OutputFormat::Text => {
            let diver = Diver::decode(payload.as_bytes())?;
            Ok(render_diver(&diver))
        }
    }
}

fn render_diver(diver: &Diver) -> String {
    let mut out = format!("Diver {} ({})\n", diver.id.yellow().bold(), diver.name);
    out.push_str(&format!("  Born: {}  Gender: {}  Type: {}\n", diver.birth_date, diver.gender, diver.diver_type));
    if diver.levels.is_empty() {
        out.push_str("  No levels.");
        return out;
    }
    for (index, level) in diver.levels.iter().enumerate() {
        let status = if level.is_in_course() {
            level.status.yellow()
        } else {
            level.status.green()
        };
        out.push_str(&format!(
            "  {}. {} [{}] {} / {}\n",
            index + 1,
            level.level_name.cyan(),
            status,
            level.organization,
            level.institution_id
        ));
        if !level.courses.is_empty() {
            out.push_str(&format!("     courses: {}\n", level.courses.join(", ")));
        }
    }
    out.trim_end().to_string()
}

fn cmd_history(state: &AppState, id: &str, format: &OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(state.execute(&Invocation::new(Operation::GetHistoryForKey.name(), [id]))?),
        OutputFormat::Text => {
            let records = state.manager().history_records(state.ledger(), id)?;
            Ok(render_history(id, &records))
        }
    }
}

fn render_history(id: &str, records: &[HistoryRecord]) -> String {
    if records.is_empty() {
        return format!("No history for {}.", id.yellow());
    }
    let mut lines = vec![format!("History for {} ({} versions)", id.yellow().bold(), records.len())];
    for record in records {
        let marker = if record.is_delete() { "deleted".red() } else { "write".green() };
        lines.push(format!("  {}  {}  {}", record.tx_id.dimmed(), record.timestamp, marker));
    }
    lines.join("\n")
}

fn cmd_list(state: &AppState, format: &OutputFormat) -> anyhow::Result<String> {
    let keys = state.ledger().keys()?;
    Ok(match format {
        OutputFormat::Json => serde_json::to_string(&keys)?,
        OutputFormat::Text if keys.is_empty() => "No divers.".to_string(),
        OutputFormat::Text => keys.join("\n"),
    })
}

fn cmd_serve(args: ServeArgs, journal: &Path) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::from_toml_file(path)?,
        None => ServerConfig::default(),
    };
    if config.journal_path.is_none() {
        config.journal_path = Some(journal.to_path_buf());
    }
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }

    info!(
        bind = %config.bind_addr,
        config = ?args.config,
        journal = ?config.journal_path,
        "starting dolphins server"
    );
    let server = DolphinsServer::new(config)?;
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(server.serve())?;
    Ok(())
}
