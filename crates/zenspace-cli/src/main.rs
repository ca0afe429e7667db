//! ZenSpace command-line client.
//!
//! Usage:
//!   zenspace login --email ann@example.com --password ...
//!   zenspace workspaces
//!   zenspace use "Marketing"
//!   zenspace projects
//!   zenspace new-task --project p1 "Draft hero copy"
//!   zenspace move t1 done
//!   zenspace stats
//!
//!   # Scripted session against seeded in-memory data, no server needed
//!   zenspace demo
//!
//! The API base URL comes from `~/.config/zenspace/client.ron` or
//! `ZENSPACE_API_URL`. Logs go to stderr; set `RUST_LOG=debug` for detail.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use zenspace_client::{ClientConfig, InMemoryRemote, Persistence, Store, StoreError};
use zenspace_types::dates::parse_date;
use zenspace_types::{NewProject, NewTask, Priority, TaskId, TaskStatus, TaskType, Theme, User};

#[derive(Parser, Debug)]
#[command(name = "zenspace")]
#[command(about = "Team workspaces, projects and tasks from the terminal")]
struct Args {
    /// Override the API base URL for this run
    #[arg(long, global = true)]
    api: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and remember the session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account (and its first workspace), then sign in
    Signup {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Forget the session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// List workspaces; the active one is starred
    Workspaces,
    /// Switch workspace by id or name
    Use { workspace: String },
    /// List projects of the active workspace
    Projects,
    /// List tasks, optionally for one project
    Tasks {
        #[arg(long)]
        project: Option<String>,
    },
    /// Create a project in the active workspace, led by you
    NewProject {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, value_parser = parse_priority)]
        priority: Option<Priority>,
    },
    /// Create a task
    NewTask {
        #[arg(long)]
        project: String,
        title: String,
        /// Assignee user id (default: you)
        #[arg(long)]
        assignee: Option<String>,
        #[arg(long = "type", value_parser = parse_task_type)]
        task_type: Option<TaskType>,
        #[arg(long, value_parser = parse_priority)]
        priority: Option<Priority>,
        /// Due date, YYYY-MM-DD
        #[arg(long)]
        due: Option<String>,
    },
    /// Move a task to another column (todo, in-progress, done)
    Move {
        task: String,
        #[arg(value_parser = parse_status)]
        status: TaskStatus,
    },
    /// Completion and overdue counts for the active workspace
    Stats,
    /// Show or set the theme (dark, light, toggle)
    Theme { value: Option<String> },
    /// Run a scripted session against seeded in-memory data
    Demo,
}

fn parse_priority(s: &str) -> Result<Priority, String> {
    s.trim().parse().map_err(|_| format!("unknown priority '{s}' (low, medium, high)"))
}

fn parse_task_type(s: &str) -> Result<TaskType, String> {
    s.trim().parse().map_err(|_| format!("unknown type '{s}' (task, bug, feature, improvement)"))
}

fn parse_status(s: &str) -> Result<TaskStatus, String> {
    TaskStatus::from_str(&s.replace('-', " "))
        .ok_or_else(|| format!("unknown status '{s}' (todo, in-progress, done)"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    if let Command::Demo = args.command {
        return run_demo().await;
    }
    let mut config = ClientConfig::load().context("loading client config")?;
    if let Some(api) = args.api {
        config = config.with_base_url(api.trim_end_matches('/'));
    }
    info!("API at {}", config.base_url);
    let store = zenspace_client::open_http(config).context("building HTTP client")?;

    run(&store, args.command).await
}

async fn run(store: &Store, command: Command) -> Result<()> {
    match command {
        Command::Login { email, password } => {
            let user = store.login(&email, &password).await?;
            println!("Signed in as {user}");
        }
        Command::Signup {
            name,
            email,
            password,
        } => {
            let user = store.signup(&name, &email, &password).await?;
            println!("Welcome, {user}");
        }
        Command::Logout => {
            store.logout();
            println!("Signed out");
        }
        Command::Whoami => match bootstrap(store).await {
            Some(user) => println!("{user} ({})", user.id),
            None => println!("Not signed in"),
        },
        Command::Workspaces => {
            signed_in(store).await?;
            print_workspaces(store);
        }
        Command::Use { workspace } => {
            signed_in(store).await?;
            if !store.join_workspace(&workspace).await? {
                bail!("no workspace matches '{workspace}'");
            }
            print_workspaces(store);
        }
        Command::Projects => {
            signed_in(store).await?;
            print_projects(store);
        }
        Command::Tasks { project } => {
            signed_in(store).await?;
            let tasks = match project {
                Some(id) => store.tasks_for(&id.into()),
                None => store.tasks(),
            };
            for task in tasks {
                let due = task.due_date.map(|d| format!(" due {d}")).unwrap_or_default();
                println!(
                    "{:<12} [{:<11}] {:<8} {}{}",
                    task.id.as_str(),
                    task.status.as_str(),
                    task.priority.as_str(),
                    task.title,
                    due
                );
            }
        }
        Command::NewProject {
            name,
            description,
            priority,
        } => {
            let user = signed_in(store).await?;
            let workspace = store.active_workspace().ok_or(StoreError::NoActiveWorkspace)?;
            let mut input =
                NewProject::new(name, user.id, workspace.id).with_description(description);
            if let Some(priority) = priority {
                input = input.with_priority(priority);
            }
            match store.create_project(input).await? {
                Some(project) => println!("Created project {} ({})", project.name, project.id),
                None => println!("A project is already being created; try again shortly"),
            }
        }
        Command::NewTask {
            project,
            title,
            assignee,
            task_type,
            priority,
            due,
        } => {
            let user = signed_in(store).await?;
            let assignee = assignee.map(Into::into).unwrap_or(user.id);
            let mut input = NewTask::new(project.into(), title, assignee);
            if let Some(t) = task_type {
                input = input.with_type(t);
            }
            if let Some(p) = priority {
                input = input.with_priority(p);
            }
            if let Some(raw) = due {
                let date = parse_date(&raw).with_context(|| format!("bad due date '{raw}'"))?;
                input = input.with_due_date(date);
            }
            let task = store.create_task(input).await?;
            println!("Created task {} ({})", task.title, task.id);
        }
        Command::Move { task, status } => {
            signed_in(store).await?;
            let id = TaskId::from(task);
            match store.move_task(&id, status).await? {
                Some(task) => println!("{} -> {}", task.title, task.status),
                None => println!("{id} is already {status}"),
            }
        }
        Command::Stats => {
            signed_in(store).await?;
            print_stats(store)?;
        }
        Command::Theme { value } => {
            let theme = match value.as_deref() {
                None => store.theme(),
                Some("toggle") => store.toggle_theme(),
                Some(raw) => {
                    let theme =
                        Theme::parse(raw).with_context(|| format!("unknown theme '{raw}'"))?;
                    store.set_theme(theme);
                    theme
                }
            };
            println!("Theme: {}", theme.as_str());
        }
        Command::Demo => run_demo().await?,
    }
    Ok(())
}

/// Resolve the persisted session. A session that no longer resolves is
/// reported and treated as signed out.
async fn bootstrap(store: &Store) -> Option<User> {
    if let Err(e) = store.bootstrap().await {
        warn!("Could not restore session: {}", e);
    }
    store.current_user()
}

async fn signed_in(store: &Store) -> Result<User> {
    match bootstrap(store).await {
        Some(user) => Ok(user),
        None => Err(StoreError::NotAuthenticated).context("run `zenspace login` first"),
    }
}

fn print_workspaces(store: &Store) {
    let active = store.active_workspace().map(|w| w.id);
    for workspace in store.workspaces() {
        let mark = if Some(&workspace.id) == active.as_ref() { '*' } else { ' ' };
        println!("{mark} {:<16} {}", workspace.id.as_str(), workspace.name);
    }
}

fn print_projects(store: &Store) {
    for project in store.projects() {
        let completion = store.project_stats(&project.id).map(|s| s.completion).unwrap_or(0);
        println!(
            "{:<12} {:<28} {:<10} {:<6} {:>3}%",
            project.id.as_str(),
            project.name,
            project.status.as_str(),
            project.priority.as_str(),
            completion
        );
    }
}

fn print_stats(store: &Store) -> Result<()> {
    let overview = store.workspace_overview()?;
    for stats in &overview.projects {
        println!(
            "{:<28} todo {:>3}  doing {:>3}  done {:>3}  {:>3}%  overdue {}",
            stats.name,
            stats.counts.todo,
            stats.counts.in_progress,
            stats.counts.done,
            stats.completion,
            stats.overdue
        );
    }
    println!(
        "{:<28} {} tasks, {}% complete, {} overdue",
        "total",
        overview.counts.total(),
        overview.completion,
        overview.overdue
    );
    Ok(())
}

/// Sign in to the seeded demo account, drag a task to Done, print stats.
async fn run_demo() -> Result<()> {
    let remote = Arc::new(InMemoryRemote::seeded());
    let store = Store::new(remote.clone(), Persistence::memory(), ClientConfig::default());

    store.bootstrap().await?;
    let user = store.login("demo@example.com", "Demo@123").await?;
    println!("Signed in as {user}");
    print_workspaces(&store);
    print_projects(&store);

    let target = store
        .tasks()
        .into_iter()
        .find(|t| !t.status.is_done())
        .context("demo data has no open task")?;
    if let Some(moved) = store.move_task(&target.id, TaskStatus::Done).await? {
        println!("Moved '{}' to {}", moved.title, moved.status);
    }
    print_stats(&store)?;
    println!("{} remote calls", remote.calls().len());
    Ok(())
}
