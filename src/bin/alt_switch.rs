use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use alt_switch::actor::presenter;
use alt_switch::actor::reactor::{Event, InlineReactor};
use alt_switch::common::config::{Config, config_file};
use alt_switch::common::log;
use alt_switch::sys::sim::Scenario;
use anyhow::{Context, bail};
use clap::{ArgAction, Parser, Subcommand};
use serde_json::json;
use tracing::{info, warn};

const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(version, about = "Window discovery and switching core")]
struct Cli {
    /// Config file. Defaults are used if it does not exist.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log more. Repeat for trace output.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and validate a config file.
    CheckConfig {
        /// Overrides --config.
        path: Option<PathBuf>,
    },
    /// Run a scenario file against the simulated platform and print the
    /// switcher state after every step.
    Simulate {
        scenario: PathBuf,
        /// Print apps and windows as a tree instead of JSON.
        #[arg(long)]
        tree: bool,
    },
}

fn main() -> anyhow::Result<()> {
    sigpipe::reset();
    let cli = Cli::parse();
    log::init_logging(cli.verbose);
    let config_path = cli.config.unwrap_or_else(config_file);

    match cli.command {
        Commands::CheckConfig { path } => check_config(path.unwrap_or(config_path)),
        Commands::Simulate { scenario, tree } => {
            let config = Config::read(&config_path)?;
            simulate(config, scenario, tree)
        }
    }
}

fn check_config(path: PathBuf) -> anyhow::Result<()> {
    if !path.exists() {
        bail!("config file {} does not exist", path.display());
    }
    let config = Config::read(&path)?;
    let issues = config.validate();
    for issue in &issues {
        eprintln!("{}: {issue}", path.display());
    }
    if !issues.is_empty() {
        bail!("{} problem(s) in {}", issues.len(), path.display());
    }
    println!("{}: ok", path.display());
    Ok(())
}

fn simulate(config: Config, path: PathBuf, tree: bool) -> anyhow::Result<()> {
    for issue in config.validate() {
        warn!(%issue, "config problem");
    }
    let scenario = Scenario::load(&path)?;
    let system = scenario.system().with_context(|| format!("setting up {}", path.display()))?;
    let mut reactor = InlineReactor::new(config, Arc::new(system.clone()));
    if !reactor.settle(SETTLE_TIMEOUT) {
        bail!("initial discovery did not settle");
    }
    report(&mut reactor, 0, "initial discovery", tree)?;

    for (i, step) in scenario.steps.iter().enumerate() {
        if let Some(command) = system.apply(step) {
            reactor.send(Event::Command(command));
        }
        if !reactor.settle(SETTLE_TIMEOUT) {
            bail!("step {} ({step:?}) did not settle", i + 1);
        }
        report(&mut reactor, i + 1, &format!("{step:?}"), tree)?;
    }
    info!(steps = scenario.steps.len(), "scenario finished");
    Ok(())
}

fn report(
    reactor: &mut InlineReactor,
    index: usize,
    action: &str,
    tree: bool,
) -> anyhow::Result<()> {
    let presented = reactor.take_presented();
    if tree {
        println!("{}", render_tree(reactor, &format!("#{index} {action}"))?);
        return Ok(());
    }
    let presented: Vec<&str> = presented
        .iter()
        .map(|e| match e {
            presenter::Event::Show(_) => "show",
            presenter::Event::Refresh(_) => "refresh",
            presenter::Event::Hide => "hide",
        })
        .collect();
    let line = json!({
        "step": index,
        "action": action,
        "summon_state": reactor.summon_state(),
        "presented": presented,
        "snapshot": reactor.snapshot(),
    });
    println!("{}", serde_json::to_string(&line)?);
    Ok(())
}

fn render_tree(reactor: &InlineReactor, title: &str) -> anyhow::Result<String> {
    let snapshot = reactor.snapshot();
    let selected = snapshot.focused_window().map(|w| w.id);
    let windows = reactor.windows();
    let apps = reactor
        .applications()
        .into_iter()
        .map(|app| {
            let name = app.name.clone().unwrap_or_else(|| app.pid.to_string());
            let label = match &app.dock_label {
                Some(label) => format!("{name} [{label}]"),
                None => name,
            };
            let lines = windows
                .iter()
                .filter(|w| w.pid == app.pid)
                .map(|w| {
                    let shown = snapshot.windows.iter().any(|s| s.id == w.id);
                    let marker = match (Some(w.id) == selected, shown) {
                        (true, _) => "> ",
                        (false, true) => "* ",
                        (false, false) => "  ",
                    };
                    format!("{marker}{} {:?}", w.id, w.title.as_deref().unwrap_or(""))
                })
                .collect::<Vec<_>>();
            if lines.is_empty() {
                ascii_tree::Tree::Leaf(vec![label])
            } else {
                ascii_tree::Tree::Node(label, vec![ascii_tree::Tree::Leaf(lines)])
            }
        })
        .collect();
    let mut out = String::new();
    ascii_tree::write_tree(&mut out, &ascii_tree::Tree::Node(title.to_string(), apps))?;
    Ok(out)
}
