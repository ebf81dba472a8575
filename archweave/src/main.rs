//! archweave - conversational architecture design workbench
//!
//! Command-line front end over the archweave core:
//! - Manage projects
//! - Iterate on a design in the architecture log
//! - Ask follow-up questions in issue threads grounded in that design
//!
//! Uses XDG Base Directory specification for file locations:
//! - Database: $XDG_DATA_HOME/archweave/state.db (~/.local/share/archweave/state.db)
//! - Config: $XDG_CONFIG_HOME/archweave/config.toml (~/.config/archweave/config.toml)
//! - Logs: $XDG_STATE_HOME/archweave/archweave.log

use anyhow::{Context, Result};
use archweave_core::content::ViewMode;
use archweave_core::{Config, Error, Message, Role, SendOutcome, Workspace};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "archweave")]
#[command(about = "Design software architecture through conversation")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create, list, and delete projects
    Project {
        #[command(subcommand)]
        command: ProjectCommand,
    },

    /// Work on a project's architecture log
    Arch {
        #[command(subcommand)]
        command: ArchCommand,
    },

    /// Ask follow-up questions in issue threads
    Issue {
        #[command(subcommand)]
        command: IssueCommand,
    },

    /// Expand a rough idea into a detailed design prompt
    Enhance {
        /// Prompt text
        #[arg(required = true, num_args = 1..)]
        prompt: Vec<String>,
    },

    /// Show configuration and per-project statistics
    Status,
}

#[derive(Subcommand)]
enum ProjectCommand {
    /// Create a project
    New {
        /// Project name
        name: String,
    },

    /// List projects in creation order
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete a project with all of its conversations
    Delete {
        /// Project id or name
        project: String,
    },
}

#[derive(Subcommand)]
enum ArchCommand {
    /// Send a prompt on the architecture log
    Send {
        /// Project id or name
        project: String,

        /// Prompt text
        #[arg(required = true, num_args = 1..)]
        prompt: Vec<String>,
    },

    /// Print the architecture log
    Show {
        /// Project id or name
        project: String,

        /// Part of assistant replies to show (full, description, diagrams)
        #[arg(long, default_value = "full")]
        view: ViewMode,

        /// Only show the latest assistant reply
        #[arg(long)]
        last: bool,

        /// Only show messages from one role (user, assistant)
        #[arg(long)]
        role: Option<Role>,
    },

    /// Empty the architecture log
    Clear {
        /// Project id or name
        project: String,
    },
}

#[derive(Subcommand)]
enum IssueCommand {
    /// List a project's issue threads, newest first
    Threads {
        /// Project id or name
        project: String,
    },

    /// Start a new issue thread
    New {
        /// Project id or name
        project: String,
    },

    /// Send a prompt on an issue thread
    Send {
        /// Project id or name
        project: String,

        /// Thread id or list position
        thread: String,

        /// Prompt text
        #[arg(required = true, num_args = 1..)]
        prompt: Vec<String>,
    },

    /// Print an issue thread
    Show {
        /// Project id or name
        project: String,

        /// Thread id or list position
        thread: String,

        /// Only show messages from one role (user, assistant)
        #[arg(long)]
        role: Option<Role>,
    },

    /// Rename an issue thread (a blank title restores the default)
    Rename {
        /// Project id or name
        project: String,

        /// Thread id or list position
        thread: String,

        /// New title
        title: String,
    },

    /// Delete an issue thread
    Delete {
        /// Project id or name
        project: String,

        /// Thread id or list position
        thread: String,
    },

    /// Delete every thread, leaving one empty thread
    Reset {
        /// Project id or name
        project: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let config = Config::load().context("failed to load configuration")?;

    // Initialize logging (to file, so stdout carries only command output)
    let _log_guard =
        archweave_core::logging::init(&config.logging).context("failed to initialize logging")?;

    tracing::info!("archweave starting");

    let ws = Workspace::open(&config).context("failed to open workspace")?;

    match args.command {
        Command::Project { command } => cmd_project(&ws, command),
        Command::Arch { command } => cmd_arch(&ws, command).await,
        Command::Issue { command } => cmd_issue(&ws, command).await,
        Command::Enhance { prompt } => cmd_enhance(&ws, &prompt.join(" ")).await,
        Command::Status => cmd_status(&ws, &config),
    }
}

fn cmd_project(ws: &Workspace, command: ProjectCommand) -> Result<()> {
    match command {
        ProjectCommand::New { name } => match ws.projects().create(&name) {
            Ok(project) => println!("Created project {} ({})", project.name, project.id),
            Err(Error::Validation(reason)) => {
                tracing::debug!(%reason, "Project creation skipped");
                println!("Nothing to create: project name is empty.");
            }
            Err(e) => return Err(e.into()),
        },
        ProjectCommand::List { json } => {
            let projects = ws.projects().list();
            if json {
                let rows: Vec<_> = projects
                    .iter()
                    .map(|p| {
                        serde_json::json!({
                            "id": p.id,
                            "name": p.name,
                            "createdAt": p.created_at.to_rfc3339(),
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else if projects.is_empty() {
                println!("No projects.");
            } else {
                for p in &projects {
                    println!(
                        "{}  {}  {}",
                        p.id,
                        p.created_at.format("%Y-%m-%d %H:%M"),
                        p.name
                    );
                }
            }
        }
        ProjectCommand::Delete { project } => {
            let project = ws.find_project(&project)?;
            ws.projects().delete(&project.id);
            println!("Deleted project {}", project.name);
        }
    }
    Ok(())
}

async fn cmd_arch(ws: &Workspace, command: ArchCommand) -> Result<()> {
    match command {
        ArchCommand::Send { project, prompt } => {
            let project = ws.find_project(&project)?;
            let outcome = ws
                .composer()
                .send_architecture(&project.id, &prompt.join(" "))
                .await?;
            print_outcome(&outcome);
        }
        ArchCommand::Show {
            project,
            view,
            last,
            role,
        } => {
            let project = ws.find_project(&project)?;
            let log = with_role(ws.conversations().architecture_messages(&project.id), role);
            if last {
                match log.iter().rev().find(|m| m.role == Role::Assistant) {
                    Some(message) => println!("{}", view.apply(&message.content)),
                    None => println!("No architecture replies yet."),
                }
            } else if log.is_empty() {
                println!("No architecture messages yet.");
            } else {
                print_messages(&log, view);
            }
        }
        ArchCommand::Clear { project } => {
            let project = ws.find_project(&project)?;
            ws.conversations().clear_architecture(&project.id);
            println!("Cleared architecture log for {}", project.name);
        }
    }
    Ok(())
}

async fn cmd_issue(ws: &Workspace, command: IssueCommand) -> Result<()> {
    match command {
        IssueCommand::Threads { project } => {
            let project = ws.find_project(&project)?;
            print_threads(ws, &project.id);
        }
        IssueCommand::New { project } => {
            let project = ws.find_project(&project)?;
            let thread = ws.conversations().create_thread(&project.id);
            println!("Created thread {} ({})", thread.title, thread.id);
        }
        IssueCommand::Send {
            project,
            thread,
            prompt,
        } => {
            let project = ws.find_project(&project)?;
            let thread = ws.find_thread(&project.id, &thread)?;
            let outcome = ws
                .composer()
                .send_issue(&project.id, &thread.id, &prompt.join(" "))
                .await?;
            print_outcome(&outcome);
        }
        IssueCommand::Show {
            project,
            thread,
            role,
        } => {
            let project = ws.find_project(&project)?;
            let thread = ws.find_thread(&project.id, &thread)?;
            let messages = with_role(thread.messages, role);
            println!("# {}", thread.title);
            println!();
            if messages.is_empty() {
                println!("No messages yet.");
            } else {
                print_messages(&messages, ViewMode::Full);
            }
        }
        IssueCommand::Rename {
            project,
            thread,
            title,
        } => {
            let project = ws.find_project(&project)?;
            let thread = ws.find_thread(&project.id, &thread)?;
            if let Some(renamed) = ws
                .conversations()
                .rename_thread(&project.id, &thread.id, &title)
            {
                println!("Renamed thread to {}", renamed.title);
            }
        }
        IssueCommand::Delete { project, thread } => {
            let project = ws.find_project(&project)?;
            let thread = ws.find_thread(&project.id, &thread)?;
            ws.conversations().delete_thread(&project.id, &thread.id);
            println!("Deleted thread {}", thread.title);
            print_threads(ws, &project.id);
        }
        IssueCommand::Reset { project } => {
            let project = ws.find_project(&project)?;
            ws.conversations().delete_all_threads(&project.id);
            println!("Reset threads for {}", project.name);
            print_threads(ws, &project.id);
        }
    }
    Ok(())
}

async fn cmd_enhance(ws: &Workspace, prompt: &str) -> Result<()> {
    match ws.composer().enhance_prompt(prompt).await {
        Some(enhanced) => println!("{}", enhanced),
        None => println!("Nothing to enhance."),
    }
    Ok(())
}

fn cmd_status(ws: &Workspace, config: &Config) -> Result<()> {
    println!("archweave Status");
    println!("================");
    println!();
    println!("Config:          {}", Config::config_path().display());
    println!("Database:        {}", config.database_path().display());
    println!("Log file:        {}", Config::log_path().display());
    println!("Service:         {}", config.generation.base_url);
    println!(
        "Auth token:      {}",
        if config.generation.resolved_token().is_some() {
            "configured"
        } else {
            "none"
        }
    );
    println!("Reply ordering:  {:?}", ws.composer().ordering());
    println!("Empty stores:    {:?}", ws.persistence().empty_policy());
    let stored = ws.persistence().stored_keys();
    println!(
        "Stored docs:     {}",
        if stored.is_empty() {
            "none".to_string()
        } else {
            stored.join(", ")
        }
    );
    println!();

    let projects = ws.projects().list();
    println!("Projects:        {}", projects.len());
    for p in &projects {
        let stats = ws.conversations().stats(&p.id);
        println!(
            "  {:<24} arch: {:>3}  issues: {:>3} in {} thread(s)  context: {}",
            p.name,
            stats.architecture_count,
            stats.issue_message_count,
            stats.thread_count,
            if ws.context().has_context(&p.id) {
                "yes"
            } else {
                "no"
            }
        );
    }
    Ok(())
}

fn print_outcome(outcome: &SendOutcome) {
    match outcome {
        SendOutcome::Skipped => println!("Nothing to send."),
        SendOutcome::Applied { message } => println!("{}", message.content),
        SendOutcome::FallbackApplied { message } => {
            eprintln!("Generation service unavailable; showing fallback response.");
            println!("{}", message.content);
        }
        SendOutcome::Dropped => eprintln!("Target was deleted before the reply arrived."),
        SendOutcome::Superseded => eprintln!("Reply superseded by a newer send."),
    }
}

fn with_role(messages: Vec<Message>, role: Option<Role>) -> Vec<Message> {
    match role {
        Some(role) => messages.into_iter().filter(|m| m.role == role).collect(),
        None => messages,
    }
}

fn print_messages(messages: &[Message], view: ViewMode) {
    for message in messages {
        let content = match message.role {
            Role::User => message.content.clone(),
            Role::Assistant => view.apply(&message.content),
        };
        println!(
            "[{}] {} {}",
            message.timestamp.format("%Y-%m-%d %H:%M:%S"),
            message.role,
            content
        );
        println!();
    }
}

fn print_threads(ws: &Workspace, project_id: &str) {
    for (i, thread) in ws.conversations().issue_threads(project_id).iter().enumerate() {
        println!(
            "{:>2}  {}  {:<40}  {} message(s)",
            i,
            thread.id,
            thread.title,
            thread.messages.len()
        );
    }
}
