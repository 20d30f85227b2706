use anyhow::Context;
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use monofix_cli::config::ConfigMerger;
use monofix_cli::explain;
use monofix_core::adapters::{NpmRegistry, TokioProcessPort};
use monofix_core::exec::{run_exec, run_script};
use monofix_core::pipeline::{FixReport, open_workspace, run_check, run_fix};
use monofix_core::ports::ProcessPort;
use monofix_core::settings::{FixSettings, UpgradeSettings};
use monofix_core::upgrade::run_upgrade;
use monofix_core::{RuleOptions, ToolError, WorkspaceSet};
use monofix_types::{RuleId, RunSummary};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "monofix",
    version,
    about = "Checks and repairs consistency across JavaScript monorepo workspaces."
)]
struct Cli {
    /// Directory to start the workspace search from.
    #[arg(long, global = true, default_value = ".")]
    cwd: Utf8PathBuf,

    /// Skip a rule (repeatable); extends `ignoredRules` from the root manifest.
    #[arg(long = "ignore", global = true, value_name = "RULE")]
    ignore: Vec<RuleId>,

    /// Branch used in repository URLs; overrides `defaultBranch`.
    #[arg(long, global = true)]
    default_branch: Option<String>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Report every consistency violation.
    Check(CheckArgs),
    /// Repair what can be repaired and install if needed.
    Fix(FixArgs),
    /// Run a command in every package directory.
    Exec(ExecArgs),
    /// Run a script of one package.
    Run(RunArgs),
    /// Move every consumer of a package (or scope) to a new version.
    Upgrade(UpgradeArgs),
    /// Explain what a rule checks and how to fix it by hand.
    Explain(ExplainArgs),
    /// List all rules.
    ListRules(ListRulesArgs),
}

#[derive(Debug, Parser)]
struct CheckArgs {
    /// Output format (text, json).
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Debug, Parser)]
struct FixArgs {
    /// Print the changes as a diff instead of writing them.
    #[arg(long, default_value_t = false)]
    dry_run: bool,

    /// Do not run the package manager's install afterwards.
    #[arg(long, default_value_t = false)]
    no_install: bool,
}

#[derive(Debug, Parser)]
struct ExecArgs {
    /// Command and arguments.
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

#[derive(Debug, Parser)]
struct RunArgs {
    /// Package name or directory, or a unique part of one.
    package: String,

    /// Script name and its arguments.
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    script: Vec<String>,
}

#[derive(Debug, Parser)]
struct UpgradeArgs {
    /// Package name, or `@scope` for every package in a scope.
    name: String,

    /// Dist-tag or explicit version range (default: latest).
    tag: Option<String>,

    /// Do not run the package manager's install afterwards.
    #[arg(long, default_value_t = false)]
    no_install: bool,
}

#[derive(Debug, Parser)]
struct ExplainArgs {
    /// Rule key or name (e.g. "external-mismatch", "EXTERNAL_MISMATCH").
    rule: String,
}

#[derive(Debug, Parser)]
struct ListRulesArgs {
    /// Output format (text, json).
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn main() -> ExitCode {
    match real_main() {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{:?}", e);
            let code = e.downcast_ref::<ToolError>().map_or(1, ToolError::exit_code);
            ExitCode::from(code)
        }
    }
}

fn real_main() -> anyhow::Result<u8> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match &cli.cmd {
        Command::Explain(args) => return cmd_explain(args).map(|()| 0),
        Command::ListRules(args) => return cmd_list_rules(args).map(|()| 0),
        _ => {}
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("start async runtime")?;
    runtime.block_on(dispatch(cli))
}

async fn dispatch(cli: Cli) -> anyhow::Result<u8> {
    let (workspace, project) = open_workspace(&cli.cwd).await?;
    let merged = ConfigMerger::new(project).merge(&cli.ignore, cli.default_branch.as_deref());
    for name in &merged.unknown_rules {
        warn!(rule = %name, "ignoredRules names an unknown rule; skipping it");
    }
    let process: Arc<dyn ProcessPort> = Arc::new(TokioProcessPort);

    match cli.cmd {
        Command::Check(args) => cmd_check(&workspace, &merged.rules, args.format),
        Command::Fix(args) => cmd_fix(workspace, merged.rules, args, process).await,
        Command::Exec(args) => {
            let code = run_exec(&workspace, &args.command, process).await?;
            Ok(clamp_exit(code))
        }
        Command::Run(args) => {
            let code = run_script(&workspace, &args.package, &args.script, process).await?;
            Ok(clamp_exit(code))
        }
        Command::Upgrade(args) => cmd_upgrade(workspace, args, process).await,
        Command::Explain(_) | Command::ListRules(_) => Ok(0),
    }
}

/// Process exit statuses are a byte; anything out of range still means failure.
fn clamp_exit(code: i32) -> u8 {
    u8::try_from(code).unwrap_or(1)
}

fn cmd_check(workspace: &WorkspaceSet, rules: &RuleOptions, format: OutputFormat) -> anyhow::Result<u8> {
    let summary = run_check(workspace, rules);
    match format {
        OutputFormat::Text => {
            print_findings(&summary);
            print_failures(&summary);
            if summary.findings.is_empty() && !summary.has_failures() {
                println!("workspace is valid");
            } else {
                let fixable = summary.findings.iter().filter(|f| f.fixable).count();
                println!(
                    "{} problem(s) found, {} fixable with `monofix fix`",
                    summary.findings.len(),
                    fixable
                );
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&summary).context("serialize summary")?);
        }
    }
    Ok(summary_exit(&summary))
}

async fn cmd_fix(
    workspace: WorkspaceSet,
    rules: RuleOptions,
    args: FixArgs,
    process: Arc<dyn ProcessPort>,
) -> anyhow::Result<u8> {
    let settings = FixSettings {
        rules,
        dry_run: args.dry_run,
        install: !args.no_install,
    };
    debug!(?settings, "fix settings");
    let FixReport {
        summary,
        written,
        diff,
        installed,
    } = run_fix(workspace, &settings, process).await?;

    if settings.dry_run {
        print!("{diff}");
    }
    print_findings(&summary);
    print_failures(&summary);
    if !settings.dry_run {
        info!(files = written.len(), installed, "fix finished");
    }
    if summary.fixed > 0 {
        let verb = if settings.dry_run { "would fix" } else { "fixed" };
        println!("{verb} {} problem(s)", summary.fixed);
    } else if !summary.has_errored {
        println!("workspace is valid");
    }
    // Leftover problems are reported, not failed on; install errors already returned.
    Ok(0)
}

async fn cmd_upgrade(
    workspace: WorkspaceSet,
    args: UpgradeArgs,
    process: Arc<dyn ProcessPort>,
) -> anyhow::Result<u8> {
    let mut settings = UpgradeSettings::new(args.name, args.tag);
    settings.install = !args.no_install;
    let registry = Arc::new(NpmRegistry::new(Arc::clone(&process)));

    let report = run_upgrade(workspace, &settings, registry, process).await?;
    for update in &report.updates {
        println!(
            "{}: {} {} -> {} ({})",
            update.package, update.dependency, update.from, update.to, update.kind
        );
    }
    if report.updates.is_empty() {
        warn!(name = %settings.name, "nothing to upgrade");
    }
    Ok(0)
}

fn print_findings(summary: &RunSummary) {
    for finding in &summary.findings {
        println!("error [{}] {}", finding.rule, finding.message);
    }
}

fn print_failures(summary: &RunSummary) {
    for failure in &summary.failures {
        println!("failed [{}] {}: {}", failure.rule, failure.package, failure.message);
    }
}

fn summary_exit(summary: &RunSummary) -> u8 {
    if summary.has_errored || summary.has_failures() { 1 } else { 0 }
}

fn cmd_explain(args: &ExplainArgs) -> anyhow::Result<()> {
    use explain::{fix_kind, list_rule_keys, lookup_rule};

    let Some(rule) = lookup_rule(&args.rule) else {
        let available = list_rule_keys().join(", ");
        anyhow::bail!(
            "Unknown rule: '{}'\n\nAvailable rules: {}",
            args.rule,
            available
        );
    };

    println!("================================================================================");
    println!("RULE: {}", rule.title);
    println!("================================================================================");
    println!();
    println!("Key:     {}", rule.key);
    println!("Name:    {}", rule.rule);
    println!("Repair:  {}", fix_kind(rule));
    println!();

    println!("DESCRIPTION");
    println!("--------------------------------------------------------------------------------");
    println!("{}", rule.description);
    println!();

    println!("REMEDIATION GUIDANCE");
    println!("--------------------------------------------------------------------------------");
    println!("{}", rule.remediation);
    println!();

    Ok(())
}

fn cmd_list_rules(args: &ListRulesArgs) -> anyhow::Result<()> {
    use explain::{RULE_REGISTRY, fix_kind};

    match args.format {
        OutputFormat::Text => {
            println!("Available rules:\n");
            println!("  {:<46} {:<12} TITLE", "KEY", "REPAIR");
            println!("  {:<46} {:<12} -----", "---", "------");
            for rule in RULE_REGISTRY {
                println!("  {:<46} {:<12} {}", rule.key, fix_kind(rule), rule.title);
            }
            println!();
            println!("Use 'monofix explain <key>' for details.");
        }
        OutputFormat::Json => {
            let rules: Vec<_> = RULE_REGISTRY
                .iter()
                .map(|r| {
                    serde_json::json!({
                        "key": r.key,
                        "rule": r.rule.as_str(),
                        "title": r.title,
                        "fixable": r.fixable,
                        "installs": r.installs,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rules)?);
        }
    }
    Ok(())
}
