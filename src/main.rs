#![allow(missing_docs)]

use anyhow::{Context, Result};
use clap::Parser;
use mcpsync::{
    app_config::{AppConfig, SourceMode},
    bootstrap,
    cli::{self, Cli, PreviewArgs, ServerAddArgs, SyncArgs},
    config::{writer::render_registry_document, Config, ServerDefinition, Transport},
    import,
    merge::{prompt_resolve_conflict, ConflictChoice, ConflictResolutions, MergeResult},
    registry::Registry,
    status::SyncStatus,
    sync_operations::{SyncEngine, SyncResult},
    targets::{TargetDescriptor, TargetKind},
    validation,
};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> Result<()> {
    let cli = Cli::parse();

    initialize_tracing(cli.debug, cli.trace);

    dispatch_command(cli.command)
}

/// Initialize tracing with the specified debug/trace flags
fn initialize_tracing(debug: bool, trace: bool) {
    let log_level = if trace {
        Level::TRACE
    } else if debug {
        Level::DEBUG
    } else {
        Level::WARN
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::builder().with_default_directive(log_level.into()).from_env_lossy())
        .init();

    if debug && mcpsync::profiling::profiling_enabled() {
        info!("Profiling mode enabled ({} is set)", mcpsync::profiling::PROFILE_ENV);
    }
}

/// Resolved config directory plus the parsed `config.toml`.
struct AppContext {
    config: Config,
    app_config: AppConfig,
}

impl AppContext {
    fn load() -> Result<Self> {
        let config = Config::new().context("Failed to determine mcpsync config directory")?;
        let app_config = AppConfig::load_from(&config.app_config_path)
            .context("Failed to load app configuration")?;
        debug!(
            "Loaded app configuration from {} (source mode: {})",
            config.app_config_path.display(),
            app_config.source_mode
        );
        Ok(Self { config, app_config })
    }

    fn registry(&self) -> Result<Registry> {
        Registry::load(&self.config, &self.app_config).context("Failed to load the server list")
    }

    fn save_app_config(&self) -> Result<()> {
        self.app_config.save_to(&self.config.app_config_path)
    }
}

/// Dispatch to the appropriate command handler
fn dispatch_command(command: cli::Commands) -> Result<()> {
    match command {
        cli::Commands::Init { force } => run_init(force),
        cli::Commands::Targets(subcommand) => match subcommand {
            cli::TargetsCommands::List { json } => run_targets_list(json),
            cli::TargetsCommands::Enable { tool } => run_targets_toggle(&tool, true),
            cli::TargetsCommands::Disable { tool } => run_targets_toggle(&tool, false),
        },
        cli::Commands::Source(subcommand) => match subcommand {
            cli::SourceCommands::Show => run_source_show(),
            cli::SourceCommands::SetMode { mode, reference_path } => {
                run_source_set_mode(mode, reference_path)
            },
        },
        cli::Commands::Server(subcommand) => match subcommand {
            cli::ServerCommands::List { json } => run_server_list(json),
            cli::ServerCommands::Add(args) => run_server_add(args),
            cli::ServerCommands::Remove { name } => run_server_remove(&name),
            cli::ServerCommands::Import { file, replace } => run_server_import(&file, replace),
        },
        cli::Commands::Status { json } => run_status(json),
        cli::Commands::Preview(args) => run_preview(&args),
        cli::Commands::Sync(args) => run_sync(&args),
        cli::Commands::Validate { strict } => run_validate(strict),
    }
}

fn run_init(force: bool) -> Result<()> {
    let config = Config::new().context("Failed to determine mcpsync config directory")?;
    let config_dir = config.config_dir();

    println!("Bootstrapping mcpsync configuration at: {}", config_dir.display());

    match bootstrap::bootstrap_config(config_dir, force) {
        Ok(()) => {
            println!("mcpsync configuration bootstrapped successfully!");
            println!();
            println!("Next steps:");
            println!("  1. Add servers with 'mcpsync server add' or 'mcpsync server import'");
            println!("  2. Run 'mcpsync status' to see where each tool stands");
            println!("  3. Run 'mcpsync sync --all' to apply your server list");
            Ok(())
        },
        Err(e) => {
            error!("Failed to bootstrap configuration: {e:#}");
            std::process::exit(1);
        },
    }
}

fn run_targets_list(json: bool) -> Result<()> {
    let ctx = AppContext::load()?;
    let registry = Registry::in_memory(Vec::new());
    let engine = SyncEngine::from_app_config(&registry, &ctx.app_config);
    let targets = engine.list_targets();

    if json {
        println!("{}", serde_json::to_string_pretty(&targets)?);
        return Ok(());
    }

    for target in &targets {
        println!(
            "{:<15} {:<15} {:<9} {:<13} {}",
            target.tool_id,
            target.display_name,
            if target.enabled { "enabled" } else { "disabled" },
            if target.installed { "installed" } else { "not installed" },
            target.config_path.display()
        );
    }
    Ok(())
}

fn run_targets_toggle(tool: &str, enabled: bool) -> Result<()> {
    let kind: TargetKind = tool.parse()?;
    let mut ctx = AppContext::load()?;

    let registry = Registry::in_memory(Vec::new());
    let currently_enabled: Vec<String> = SyncEngine::from_app_config(&registry, &ctx.app_config)
        .list_targets()
        .into_iter()
        .filter(|t| t.enabled)
        .map(|t| t.tool_id)
        .collect();

    ctx.app_config.set_target_enabled(kind.id(), enabled, &currently_enabled);
    ctx.save_app_config()?;

    println!("{} {}", if enabled { "Enabled" } else { "Disabled" }, kind.display_name());
    Ok(())
}

fn run_source_show() -> Result<()> {
    let ctx = AppContext::load()?;
    let registry = ctx.registry()?;

    println!("Source mode: {}", registry.mode());
    if let Some(path) = registry.path() {
        println!("Source file: {}", path.display());
    }
    println!(
        "Servers:     {}{}",
        registry.servers().len(),
        if registry.is_read_only() { " (read-only)" } else { "" }
    );
    Ok(())
}

fn run_source_set_mode(mode: SourceMode, reference_path: Option<String>) -> Result<()> {
    let mut ctx = AppContext::load()?;
    ctx.app_config.source_mode = mode;
    if reference_path.is_some() {
        ctx.app_config.reference_path = reference_path;
    }
    ctx.save_app_config()?;

    println!("Source mode set to {mode}");
    Ok(())
}

fn run_server_list(json: bool) -> Result<()> {
    let ctx = AppContext::load()?;
    let registry = ctx.registry()?;

    if json {
        print!("{}", render_registry_document(registry.servers()));
        return Ok(());
    }

    if registry.servers().is_empty() {
        println!("No servers defined");
        return Ok(());
    }
    for server in registry.servers() {
        println!("{:<20} {}", server.name, server.summary());
    }
    Ok(())
}

fn server_from_args(args: ServerAddArgs) -> Result<ServerDefinition> {
    let ServerAddArgs { name, command, args, env, url, header, disabled } = args;

    let transport = match (command, url) {
        (Some(command), None) => {
            Transport::Stdio { command, args, env: env.into_iter().collect() }
        },
        (None, Some(url)) => Transport::Remote { url, headers: header.into_iter().collect() },
        _ => anyhow::bail!("exactly one of --command or --url is required"),
    };

    Ok(ServerDefinition { name, transport, disabled, extra: serde_json::Map::new() })
}

fn run_server_add(args: ServerAddArgs) -> Result<()> {
    let ctx = AppContext::load()?;
    let mut registry = ctx.registry()?;
    let server = server_from_args(args)?;
    let name = server.name.clone();

    registry.add_server(server).with_context(|| format!("Failed to add server `{name}`"))?;
    println!("Added server {name}");
    Ok(())
}

fn run_server_remove(name: &str) -> Result<()> {
    let ctx = AppContext::load()?;
    let mut registry = ctx.registry()?;

    registry.remove_server(name).with_context(|| format!("Failed to remove server `{name}`"))?;
    println!("Removed server {name}");
    Ok(())
}

fn run_server_import(file: &std::path::Path, replace: bool) -> Result<()> {
    let ctx = AppContext::load()?;
    let mut registry = ctx.registry()?;

    let imported = import::parse_config_file(file)?;
    println!(
        "Found {} servers in {} ({} layout)",
        imported.servers.len(),
        file.display(),
        imported.detected_format.name()
    );

    let summary = registry.import_servers(imported.servers, replace)?;
    for name in &summary.added {
        println!("  + {name}");
    }
    for name in &summary.skipped {
        println!("  = {name} (already defined, skipped)");
    }
    println!("Imported {} servers", summary.added.len());
    Ok(())
}

#[derive(Serialize)]
struct StatusRow {
    #[serde(flatten)]
    target: TargetDescriptor,
    status: SyncStatus,
}

fn run_status(json: bool) -> Result<()> {
    let ctx = AppContext::load()?;
    let registry = ctx.registry()?;
    let engine = SyncEngine::from_app_config(&registry, &ctx.app_config);

    let rows: Vec<StatusRow> =
        engine.statuses().into_iter().map(|(target, status)| StatusRow { target, status }).collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!("Source: {} servers ({})", registry.servers().len(), registry.mode());
    for row in &rows {
        println!(
            "{:<15} {:<9} {}",
            row.target.tool_id,
            if row.target.enabled { "enabled" } else { "disabled" },
            row.status
        );
    }
    Ok(())
}

/// Print every conflict of `merge` with the side that will win.
fn print_conflicts(tool_name: &str, merge: &MergeResult, resolutions: &ConflictResolutions) {
    for conflict in &merge.conflicts {
        let choice = resolutions.choice_for(merge, &conflict.name);
        println!("  ! conflict in {tool_name}: {}", conflict.name);
        println!("      source: {}", conflict.source.summary());
        println!("      target: {}", conflict.target.summary());
        println!(
            "      resolution: {}",
            match choice {
                ConflictChoice::Source => "use source definition",
                ConflictChoice::Target => "keep target definition",
            }
        );
    }
}

fn print_merge(tool_name: &str, merge: &MergeResult, resolutions: &ConflictResolutions) {
    for server in &merge.added {
        println!("  + {} ({})", server.name, server.summary());
    }
    for server in &merge.kept {
        println!("  = {}", server.name);
    }
    print_conflicts(tool_name, merge, resolutions);
}

fn run_preview(args: &PreviewArgs) -> Result<()> {
    let ctx = AppContext::load()?;
    let registry = ctx.registry()?;
    let engine = SyncEngine::from_app_config(&registry, &ctx.app_config);

    let preview = engine.preview(&args.tool)?;
    let resolutions = ConflictResolutions::uniform(&preview.merge_result, args.prefer);

    if args.content {
        let content = engine.preview_content(&args.tool, Some(&resolutions))?;
        if args.json {
            println!("{}", serde_json::to_string_pretty(&content)?);
        } else {
            println!("--- {} (current)", content.config_path.display());
            print!("{}", content.current_content);
            println!("+++ {} (after sync)", content.config_path.display());
            print!("{}", content.preview_content);
        }
        return Ok(());
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&preview)?);
        return Ok(());
    }

    println!("{} ({})", preview.tool_name, preview.tool_id);
    print_merge(&preview.tool_name, &preview.merge_result, &resolutions);
    if !preview.has_changes {
        println!("  nothing to change");
    }
    Ok(())
}

fn run_sync(args: &SyncArgs) -> Result<()> {
    let ctx = AppContext::load()?;
    let registry = ctx.registry()?;
    let engine = SyncEngine::from_app_config(&registry, &ctx.app_config)
        .with_backup(ctx.app_config.backup || args.backup);

    let results = match &args.tool {
        Some(tool) if !args.all => sync_one(&engine, tool, args)?,
        _ => sync_all(&engine, args.dry_run)?,
    };

    report_results(&results)
}

fn sync_one(engine: &SyncEngine<'_>, tool: &str, args: &SyncArgs) -> Result<Vec<SyncResult>> {
    let preview = engine.preview(tool)?;
    let merge = &preview.merge_result;

    let resolutions = if args.interactive {
        let mut choices = HashMap::new();
        for conflict in &merge.conflicts {
            choices.insert(conflict.name.clone(), prompt_resolve_conflict(&preview.tool_name, conflict)?);
        }
        ConflictResolutions::from_choices(merge, &choices)
    } else {
        ConflictResolutions::uniform(merge, args.prefer)
    };

    println!("{} ({})", preview.tool_name, preview.tool_id);
    print_merge(&preview.tool_name, merge, &resolutions);

    if args.dry_run {
        let content = engine.preview_content(tool, Some(&resolutions))?;
        println!("Dry run: would write {}", content.config_path.display());
        print!("{}", content.preview_content);
        return Ok(Vec::new());
    }

    Ok(vec![engine.apply_one(tool, Some(&resolutions))])
}

fn sync_all(engine: &SyncEngine<'_>, dry_run: bool) -> Result<Vec<SyncResult>> {
    for preview in engine.preview_all() {
        match preview {
            Ok(preview) => {
                let resolutions =
                    ConflictResolutions::uniform(&preview.merge_result, ConflictChoice::Source);
                println!("{} ({})", preview.tool_name, preview.tool_id);
                print_merge(&preview.tool_name, &preview.merge_result, &resolutions);
            },
            Err(e) => println!("  ! {e}"),
        }
    }

    if dry_run {
        println!("Dry run: nothing written");
        return Ok(Vec::new());
    }

    Ok(engine.apply_all())
}

fn report_results(results: &[SyncResult]) -> Result<()> {
    let mut failed = 0usize;
    for result in results {
        if result.success {
            println!("✓ {}: {}", result.tool_id, result.message);
        } else {
            failed = failed.saturating_add(1);
            println!("✗ {}: {}", result.tool_id, result.message);
        }
    }

    if failed > 0 {
        error!("{failed} of {} targets failed to sync", results.len());
        std::process::exit(1);
    }
    Ok(())
}

fn run_validate(strict: bool) -> Result<()> {
    let ctx = AppContext::load()?;
    let registry = ctx.registry()?;

    let result = validation::validate_servers(registry.servers())
        .context("Failed to compile validation rules")?;

    if result.issues.is_empty() {
        println!("Server list validation passed ({} servers)", registry.servers().len());
        return Ok(());
    }

    println!("Server list validation issues ({}):", result.issues.len());
    for issue in &result.issues {
        println!("  - {issue}");
    }

    if result.is_failure(strict) {
        anyhow::bail!(
            "Validation failed{}",
            if strict { " (--strict treats warnings as errors)" } else { "" }
        );
    }
    Ok(())
}
