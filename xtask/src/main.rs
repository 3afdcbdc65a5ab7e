use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use fs_err as fs;
use tokenfix_core::config::load_or_default;
use tokenfix_core::{EngineSettings, Orchestrator, ProcessOptions, build_orchestrator};
use tokenfix_render::{render_cycle_md, render_process_md, render_status_md};
use tokenfix_types::issue::IssueCounts;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "xtask", about = "Workspace helper tasks")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print schema identifiers used by tokenfix.
    PrintSchemas,
    /// Report structural and collaborator issues. Fails if any issue is an error.
    Validate {
        #[arg(long, default_value = ".")]
        root: Utf8PathBuf,

        /// Print issues as JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Preview the fixes one pass would make, or run the full cycle with --write.
    FixCycle {
        #[arg(long, default_value = ".")]
        root: Utf8PathBuf,

        /// Apply fixes to the in-memory store and run until convergence.
        #[arg(long)]
        write: bool,

        /// Overrides `[cycle] max_iterations`.
        #[arg(long)]
        max_iterations: Option<u32>,

        /// Also write the markdown report here.
        #[arg(long)]
        out: Option<Utf8PathBuf>,
    },
    /// Print registered collaborators and their routing keys.
    Status {
        #[arg(long, default_value = ".")]
        root: Utf8PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::PrintSchemas => {
            println!("{}", tokenfix_types::schema::TOKENFIX_CYCLE_V1);
            println!("{}", tokenfix_types::schema::TOKENFIX_PROCESS_V1);
            println!("{}", tokenfix_types::schema::TOKENFIX_STATUS_V1);
        }
        Command::Validate { root, json } => {
            let (mut orch, _) = engine(&root, None)?;
            let (detected, failures) = orch.detect_all();
            for f in &failures {
                eprintln!("{} failed: {}", f.agent, f.message);
            }

            let issues: Vec<_> = detected.into_iter().flat_map(|(_, i)| i).collect();
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&issues).context("serialize issues")?
                );
            } else {
                for issue in &issues {
                    println!(
                        "{:<7} {} {}: {}",
                        issue.severity.as_str(),
                        issue.code,
                        issue.locator,
                        issue.message
                    );
                }
            }

            let counts = IssueCounts::from_issues(&issues);
            info!(
                errors = counts.error,
                warnings = counts.warning,
                info = counts.info,
                "validation finished"
            );
            if counts.error > 0 {
                anyhow::bail!("{} error issue(s)", counts.error);
            }
        }
        Command::FixCycle {
            root,
            write,
            max_iterations,
            out,
        } => {
            let (mut orch, settings) = engine(&root, max_iterations)?;
            let md = if write {
                let report = orch.run_fix_cycle(settings.cycle_options());
                render_cycle_md(&report)
            } else {
                preview(&mut orch, &settings)
            };
            print!("{md}");
            if let Some(path) = out {
                fs::write(&path, &md).with_context(|| format!("write {path}"))?;
            }
        }
        Command::Status { root } => {
            let (orch, _) = engine(&root, None)?;
            print!("{}", render_status_md(&orch.system_status()));
        }
    }
    Ok(())
}

fn engine(
    root: &Utf8Path,
    max_iterations: Option<u32>,
) -> anyhow::Result<(Orchestrator, EngineSettings)> {
    let config = load_or_default(root)?;
    let mut settings = EngineSettings::from_config(root, &config);
    if let Some(n) = max_iterations {
        settings.max_iterations = n;
    }
    debug!(?settings, "engine settings");
    let orch = build_orchestrator(&settings)?;
    Ok((orch, settings))
}

/// One validate/suggest pass processed as a dry run.
fn preview(orch: &mut Orchestrator, settings: &EngineSettings) -> String {
    let (detected, _) = orch.detect_all();
    let (fixes, _) = orch.suggest_all(&detected);
    let report = orch.process_fixes(
        fixes,
        ProcessOptions {
            auto_fix_only: settings.auto_fix_only,
            dry_run: true,
        },
    );
    render_process_md(&report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fix_cycle_defaults_to_preview() {
        let cli = Cli::try_parse_from(["xtask", "fix-cycle"]).unwrap();
        match cli.cmd {
            Command::FixCycle {
                root,
                write,
                max_iterations,
                out,
            } => {
                assert_eq!(root, ".");
                assert!(!write);
                assert_eq!(max_iterations, None);
                assert_eq!(out, None);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn fix_cycle_accepts_write_and_bound() {
        let cli = Cli::try_parse_from([
            "xtask",
            "fix-cycle",
            "--root",
            "site",
            "--write",
            "--max-iterations",
            "5",
        ])
        .unwrap();
        assert!(matches!(
            cli.cmd,
            Command::FixCycle {
                write: true,
                max_iterations: Some(5),
                ..
            }
        ));
    }
}
