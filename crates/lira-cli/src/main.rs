//! `lira` command line front end

use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use lira_core::{
    ChangeOrchestrator, DryRunWriter, FileWriter, FsFileWriter, LiraConfig, Proposal, CONFIG_FILE,
};
use lira_patch::{GeminiClient, PatchGenerator};
use lira_progression::badge::{all_badges, badge_name};
use lira_progression::{progress_percent, FileStore, ProgressionStore, BADGES};
use lira_routing::{InMemoryCatalog, IntentRouter, ModuleRegistry};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

fn cli() -> Command {
    Command::new("lira")
        .version(lira_core::VERSION)
        .about("Lira developer assistant: route, propose and apply reviewed changes")
        .arg_required_else_help(true)
        .arg(
            Arg::new("root")
                .long("root")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Project directory holding project_map.json"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Configuration file (default: <root>/lira.toml)"),
        )
        .subcommand(
            Command::new("route")
                .about("Show which file a request would change")
                .arg(Arg::new("request").required(true).help("Natural-language request"))
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
        .subcommand(
            Command::new("propose")
                .about("Generate a change, review it and optionally apply it")
                .arg(Arg::new("goal").required(true).help("What the change should achieve"))
                .arg(
                    Arg::new("file")
                        .long("file")
                        .conflicts_with("module")
                        .help("Target this file instead of routing"),
                )
                .arg(
                    Arg::new("module")
                        .long("module")
                        .help("Target this module's main file"),
                )
                .arg(
                    Arg::new("learning")
                        .long("learning")
                        .action(ArgAction::SetTrue)
                        .help("Ask for a detailed explanation"),
                )
                .arg(
                    Arg::new("yes")
                        .long("yes")
                        .short('y')
                        .action(ArgAction::SetTrue)
                        .help("Apply without asking"),
                )
                .arg(
                    Arg::new("dry-run")
                        .long("dry-run")
                        .action(ArgAction::SetTrue)
                        .help("Go through the workflow without writing files"),
                ),
        )
        .subcommand(
            Command::new("progress")
                .about("Show XP, level and badges")
                .arg(
                    Arg::new("reset")
                        .long("reset")
                        .action(ArgAction::SetTrue)
                        .help("Delete all progression"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
        .subcommand(Command::new("modules").about("List project modules"))
        .subcommand(
            Command::new("backups")
                .about("List a file's backups or restore one")
                .arg(Arg::new("path").required(true).help("Project-relative file path"))
                .arg(
                    Arg::new("restore")
                        .long("restore")
                        .value_parser(value_parser!(usize))
                        .help("Restore the backup at this index (0 = newest)"),
                ),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let matches = cli().get_matches();
    let config = load_config(&matches)?;

    match matches.subcommand() {
        Some(("route", args)) => route(&config, args),
        Some(("propose", args)) => propose(&config, args).await,
        Some(("progress", args)) => progress(&config, args),
        Some(("modules", _)) => modules(&config),
        Some(("backups", args)) => backups(&config, args),
        _ => Ok(()),
    }
}

fn load_config(matches: &ArgMatches) -> Result<LiraConfig> {
    let root = matches.get_one::<PathBuf>("root").cloned();
    let path = matches.get_one::<PathBuf>("config").cloned().unwrap_or_else(|| {
        root.clone()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_FILE)
    });

    let mut config = LiraConfig::load(&path)
        .with_context(|| format!("loading {}", path.display()))?
        .with_env();
    if let Some(root) = root {
        config = config.with_project_root(root);
    }
    tracing::debug!(
        path = %path.display(),
        root = %config.project_root.display(),
        remote = config.enabled_remote().is_some(),
        "Configuration loaded"
    );
    Ok(config)
}

fn load_catalog(config: &LiraConfig) -> Result<InMemoryCatalog> {
    InMemoryCatalog::load_project(&config.project_root)
        .with_context(|| format!("loading project at {}", config.project_root.display()))
}

fn progression_store(config: &LiraConfig) -> ProgressionStore {
    ProgressionStore::new(Arc::new(FileStore::new(config.state_path())))
}

fn route(config: &LiraConfig, args: &ArgMatches) -> Result<()> {
    let request = args.get_one::<String>("request").map_or("", String::as_str);
    let catalog = load_catalog(config)?;
    let result = IntentRouter::new().route_in(request, &catalog);

    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("Target:     {}", result.target_path);
    println!("Intent:     {:?}", result.intent);
    println!("Confidence: {:.2}", result.confidence);
    println!("Reasoning:  {}", result.reasoning);
    if !result.is_routable() {
        println!("Warning:    target is not in the project map");
    }
    Ok(())
}

async fn propose(config: &LiraConfig, args: &ArgMatches) -> Result<()> {
    let goal = args.get_one::<String>("goal").map_or("", String::as_str);
    let dry_run = args.get_flag("dry-run");
    let learning_mode = args.get_flag("learning") || config.learning_mode;

    let writer: Arc<dyn FileWriter> = if dry_run {
        Arc::new(DryRunWriter)
    } else {
        Arc::new(FsFileWriter::new(&config.project_root, config.backup_path()))
    };

    let mut generator = PatchGenerator::new(config.patch_config());
    if let Some(remote) = config.enabled_remote() {
        generator = generator.with_remote(Arc::new(GeminiClient::new(remote.clone())?));
    }

    let orchestrator = ChangeOrchestrator::new(
        Arc::new(load_catalog(config)?),
        writer,
        Arc::new(progression_store(config)),
        Arc::new(generator),
    )
    .with_xp_per_change(config.xp_per_change);

    if let Some(path) = args.get_one::<String>("file") {
        orchestrator.select_file(path)?;
    } else if let Some(id) = args.get_one::<String>("module") {
        let registry = ModuleRegistry::load(&config.modules_path())?;
        let Some(module) = registry.get(id) else {
            bail!("unknown module: {id}");
        };
        orchestrator.select_module(module)?;
    }

    let proposal = orchestrator.generate(goal, learning_mode).await?;
    print_proposal(&proposal);

    if proposal.is_noop() {
        println!("Nothing to apply.");
        orchestrator.reject()?;
        return Ok(());
    }

    if !args.get_flag("yes") && !confirm("Apply this change?")? {
        orchestrator.reject()?;
        println!("Discarded.");
        return Ok(());
    }

    orchestrator.approve()?;
    let applied = orchestrator.apply()?;

    println!();
    if dry_run {
        println!("[dry-run] {} was not written.", applied.file_path);
    } else {
        println!("Applied to {}.", applied.file_path);
    }
    if let Some(backup) = &applied.backup {
        println!("Backup: {backup}");
    }
    println!(
        "XP: {} (level {}, {}% to next)",
        applied.state.xp,
        applied.state.level,
        progress_percent(applied.state.xp)
    );
    for id in &applied.new_badges {
        println!("Badge unlocked: {}", badge_name(id));
    }
    Ok(())
}

fn print_proposal(proposal: &Proposal) {
    println!("File:    {} ({})", proposal.file_path, proposal.module);
    if let Some(routing) = &proposal.routing {
        println!("Routed:  {} ({:.2})", routing.reasoning, routing.confidence);
    }
    println!("Source:  {}", proposal.source);
    println!("Changed: {} line(s)", proposal.changed_lines());
    if let Some(explanation) = &proposal.explanation {
        println!();
        println!("{explanation}");
    }
    for warning in &proposal.warnings {
        println!("Warning: {warning}");
    }
    println!();
    println!("--- proposed content ---");
    println!("{}", proposal.updated_content);
    println!("------------------------");
}

fn confirm(question: &str) -> Result<bool> {
    print!("{question} [y/N] ");
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes" | "s" | "sim"))
}

fn progress(config: &LiraConfig, args: &ArgMatches) -> Result<()> {
    let store = progression_store(config);
    if args.get_flag("reset") {
        store.reset()?;
        println!("Progression reset.");
        return Ok(());
    }

    let state = store.load()?;
    if args.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&state)?);
        return Ok(());
    }

    println!("Level {} ({} XP, next at {})", state.level, state.xp, state.next_level_xp);
    println!("Progress: {}%", progress_percent(state.xp));
    for (name, value) in &state.stats {
        println!("  {name}: {value}");
    }
    println!("Badges ({}/{}):", state.badges.len(), BADGES.len());
    for (badge, unlocked) in all_badges(&state) {
        let mark = if unlocked { 'x' } else { ' ' };
        println!("  [{mark}] {:<18} {}", badge.name, badge.description);
    }
    if let Some(latest) = state.latest() {
        println!("Last event: {} at {}", latest.kind, latest.timestamp);
    }
    Ok(())
}

fn modules(config: &LiraConfig) -> Result<()> {
    let registry = ModuleRegistry::load(&config.modules_path())?;
    if registry.modules().is_empty() {
        println!("No modules defined in {}.", config.modules_path().display());
        return Ok(());
    }
    for module in registry.modules() {
        println!("{:<16} {:<24} {}", module.id, module.name, module.main_file());
    }
    Ok(())
}

fn backups(config: &LiraConfig, args: &ArgMatches) -> Result<()> {
    let path = args.get_one::<String>("path").map_or("", String::as_str);
    let writer = FsFileWriter::new(&config.project_root, config.backup_path());
    let backups = writer.list_backups(path)?;

    let Some(index) = args.get_one::<usize>("restore").copied() else {
        if backups.is_empty() {
            println!("No backups for {path}.");
        }
        for (i, backup) in backups.iter().enumerate() {
            println!("[{i}] {} {}", backup.created_at, backup);
        }
        return Ok(());
    };

    let Some(backup) = backups.get(index) else {
        bail!("no backup at index {index} ({} available)", backups.len());
    };
    let content = writer.restore(path, backup)?;
    println!("Restored {path} from {backup} ({} bytes).", content.len());
    Ok(())
}
