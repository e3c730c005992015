//! crewmux CLI entry point.

use clap::Parser;
use crewmux::Error;
use crewmux::cli::Cli;
use crewmux::config::OutputFormat;
use crewmux::orchestrator::{LaunchOptions, Orchestrator, Output, install_interrupt_flag};
use crewmux::tmux::{Confirm, FixedAnswer, StdinConfirm, Verification, check_tmux_binary};
use std::process;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    let cli = Cli::parse();
    let format = if cli.human_readable {
        OutputFormat::Human
    } else {
        OutputFormat::Json
    };

    init_tracing(cli.verbose, format);

    if let Err(e) = run(cli, format) {
        match format {
            OutputFormat::Human => eprintln!("Error: {}", e),
            OutputFormat::Json => {
                eprintln!("{}", serde_json::json!({ "error": e.to_string() }))
            }
        }
        process::exit(1);
    }
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing(verbose: bool, format: OutputFormat) {
    let default_filter = if verbose { "crewmux=debug" } else { "crewmux=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());
    let registry = tracing_subscriber::registry().with(filter);
    if format == OutputFormat::Human {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    }
}

fn run(cli: Cli, format: OutputFormat) -> Result<(), Error> {
    let options = LaunchOptions {
        project_dir: cli.project_dir,
        workspace_dir: cli.workspace,
        agent_dir: cli.agent_dir,
        session: cli.session,
    };

    if !options.project_dir.is_dir() {
        return Err(Error::InvalidInput(format!(
            "Project directory not found: {}",
            options.project_dir.display()
        )));
    }
    if let Some(ref workspace) = options.workspace_dir {
        if !workspace.is_dir() {
            return Err(Error::InvalidInput(format!(
                "Workspace directory not found: {}",
                workspace.display()
            )));
        }
    }

    let mut orchestrator = Orchestrator::new(&options)?;
    let plan = orchestrator.plan()?;

    if cli.dry_run {
        output(&plan, format);
        return Ok(());
    }

    check_tmux_binary()?;

    let confirm: Box<dyn Confirm> = if cli.yes {
        Box::new(FixedAnswer(true))
    } else {
        Box::new(StdinConfirm)
    };
    let report = orchestrator.launch(&plan, confirm.as_ref())?;
    output(&report, format);

    if report.verification == Verification::Fresh && report.dispatched.is_empty() {
        return Err(Error::Multiplexer(format!(
            "No agent could be started in session '{}'",
            report.session
        )));
    }

    if cli.no_attach {
        return Ok(());
    }

    let delay = orchestrator.config().attach_delay();
    eprintln!(
        "Attaching to session in {}s... (Press Ctrl+C to cancel)",
        delay.as_secs_f32()
    );
    let cancel = install_interrupt_flag()?;
    if !orchestrator.attach_after_delay(&cancel)? {
        eprintln!(
            "Not attaching. Attach later with: tmux attach-session -t ={}",
            report.session
        );
    }
    Ok(())
}

fn output<T: Output>(result: &T, format: OutputFormat) {
    match format {
        OutputFormat::Human => println!("{}", result.to_human()),
        OutputFormat::Json => println!("{}", result.to_json()),
    }
}
