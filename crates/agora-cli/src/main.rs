//! Agora CLI - run multi-agent discussions from the terminal
//!
//! Loads a discussion file, wires it into a discussion context and prints the
//! conversation as the scheduler hands out turns. Replies are composed offline.

use agora_common::DiscussionStatus;
use agora_core::{ControlEvent, DiscussionContext, PersonaCatalog};
use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod display;
mod sender;

use config::DiscussionFile;
use sender::ScriptedSender;

/// Command-line arguments for the Agora CLI
#[derive(Parser)]
#[command(name = "agora", about = "Agora - multi-agent panel discussions")]
pub struct Args {
    /// Enable debug logging
    #[clap(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the built-in personas
    Personas,
    /// Validate a discussion file without running it
    Check {
        /// Path to the discussion TOML file
        file: PathBuf,
    },
    /// Run a discussion until its round limit, the time limit or Ctrl-C
    Run {
        /// Path to the discussion TOML file
        file: PathBuf,

        /// Stop after this many seconds
        #[clap(long)]
        duration_secs: Option<u64>,

        /// Override the pacing interval from the file (ms)
        #[clap(long)]
        interval_ms: Option<u64>,
    },
}

fn init_tracing(level: &str) {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| level.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load(path: &Path) -> Result<(DiscussionFile, PersonaCatalog)> {
    let file = DiscussionFile::load(path)?;
    let catalog = file.catalog()?;
    file.validate(&catalog)?;
    Ok((file, catalog))
}

async fn run_discussion(
    file: DiscussionFile,
    catalog: PersonaCatalog,
    duration: Option<Duration>,
) -> Result<()> {
    let config = file.discussion_config();
    let members = file.members();

    let sender = Arc::new(ScriptedSender::new(
        catalog.clone(),
        file.topic.clone(),
        config.discussion_id.clone(),
        config.settings.clone(),
    ));
    let context = DiscussionContext::new(config, sender)?;
    let control = context.control();
    let mut events = control.subscribe();

    let agent_ids: Vec<String> = members.iter().map(|m| m.agent_id.clone()).collect();
    display::print_header(&file.topic, &catalog, &agent_ids);

    control.set_members(members);
    control.set_discussion_status(DiscussionStatus::Active);
    if !control.is_running() {
        warn!("No member has auto-reply enabled; nothing will be said");
    }

    let time_limit = async {
        match duration {
            Some(duration) => tokio::time::sleep(duration).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(time_limit);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut shown = 0u64;
    let mut finishing = false;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(ControlEvent::MessageSent(message)) => {
                    shown += 1;
                    display::print_message(&catalog, shown, &message);
                }
                Ok(ControlEvent::SendFailed { agent_id, error }) => {
                    display::print_failure(&agent_id, &error);
                }
                Ok(ControlEvent::RoundLimitReached { rounds }) => {
                    info!("Round limit of {} reached", rounds);
                    finishing = true;
                }
                Ok(ControlEvent::StateChanged(state)) => debug!("Discussion is {:?}", state),
                Err(RecvError::Lagged(skipped)) => warn!("Missed {} discussion event(s)", skipped),
                Err(RecvError::Closed) => break,
            },
            _ = &mut time_limit => {
                info!("Time limit reached");
                break;
            }
            _ = &mut ctrl_c => {
                info!("Interrupted");
                break;
            }
        }

        // Wait for replies that were already requested before stopping
        if finishing && control.pending_sends() == 0 {
            break;
        }
    }

    let messages = control.message_counter();
    let rounds = control.scheduler().rounds_completed();
    context.shutdown();

    display::print_summary(messages, rounds);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    dotenvy::dotenv().ok();

    match args.command {
        Command::Personas => {
            display::print_personas(&PersonaCatalog::builtin());
            Ok(())
        }
        Command::Check { file } => {
            let (discussion, catalog) = load(&file)?;
            println!(
                "{} {} is valid: {} member(s), {} auto-reply, interval {} ms, {} persona(s) available",
                "✓".bright_green().bold(),
                file.display(),
                discussion.members.len(),
                discussion.members.iter().filter(|m| m.auto_reply).count(),
                discussion.settings.interval,
                catalog.list().len()
            );
            Ok(())
        }
        Command::Run {
            file,
            duration_secs,
            interval_ms,
        } => {
            let (mut discussion, catalog) = load(&file)?;
            let level = if args.debug {
                "debug".to_string()
            } else {
                discussion.base.log_level.clone()
            };
            init_tracing(&level);

            if let Some(interval) = interval_ms {
                discussion.settings.interval = interval;
                discussion.validate(&catalog)?;
            }

            info!("Starting discussion from {}", file.display());
            run_discussion(discussion, catalog, duration_secs.map(Duration::from_secs)).await
        }
    }
}
