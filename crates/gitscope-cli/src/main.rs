use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use gitscope_core::{
    ALL_BRANCHES, Dispatcher, GitRunner, Request, Response, SettingsStore, ViewSettings,
};

#[derive(Debug, Parser)]
#[command(name = "gitscope")]
#[command(about = "GitScope protocol server and query CLI", long_about = None)]
struct Cli {
    /// Path to the view settings file; defaults to the per-user config dir.
    #[arg(long, global = true)]
    settings: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Speak the JSON request/response protocol over stdin/stdout.
    Serve,
    Commits(CommitsCmd),
    Branches(BranchesCmd),
    Details(DetailsCmd),
    Repos,
}

#[derive(Debug, Args)]
struct CommitsCmd {
    #[arg(long)]
    repo: Option<PathBuf>,
    #[arg(long)]
    branch: Option<String>,
    #[arg(long)]
    max: Option<usize>,
    #[arg(long)]
    remotes: bool,
    #[arg(long)]
    pretty: bool,
}

#[derive(Debug, Args)]
struct BranchesCmd {
    #[arg(long)]
    repo: Option<PathBuf>,
    #[arg(long)]
    remotes: bool,
}

#[derive(Debug, Args)]
struct DetailsCmd {
    #[arg(long)]
    repo: Option<PathBuf>,
    #[arg(long)]
    hash: String,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = load_settings(cli.settings.clone())?;

    match cli.command {
        Commands::Serve => serve(settings),
        Commands::Commits(cmd) => commits(settings, cmd),
        Commands::Branches(cmd) => branches(settings, cmd),
        Commands::Details(cmd) => details(settings, cmd),
        Commands::Repos => repos(settings),
    }
}

fn load_settings(path: Option<PathBuf>) -> Result<ViewSettings> {
    let store = match path {
        Some(path) => SettingsStore::at(path),
        None => SettingsStore::default_store().context("resolving settings location")?,
    };
    store
        .load()
        .with_context(|| format!("loading settings from {}", store.path().display()))
}

fn serve(settings: ViewSettings) -> Result<()> {
    let (dispatcher, pushed) = Dispatcher::new(GitRunner::default(), settings);
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout().lock();

    for line in stdin.lock().lines() {
        let line = line.context("reading request line")?;
        if line.trim().is_empty() {
            continue;
        }
        let request: Request = match serde_json::from_str(&line) {
            Ok(request) => request,
            Err(e) => {
                eprintln!("malformed request: {e}");
                continue;
            }
        };
        match dispatcher.handle(&request) {
            Ok(response) => write_message(&mut stdout, &response)?,
            // Requests whose response shape has no failure channel surface
            // out of band; the client sees no reply for this correlation.
            Err(e) => eprintln!("{}: {e}", request.command()),
        }
        for message in pushed.try_iter() {
            write_message(&mut stdout, &message)?;
        }
        stdout.flush().context("flushing responses")?;
    }
    Ok(())
}

fn write_message(out: &mut impl Write, message: &Response) -> Result<()> {
    let json = serde_json::to_string(message).context("serializing response")?;
    writeln!(out, "{json}").context("writing response")?;
    Ok(())
}

fn commits(settings: ViewSettings, cmd: CommitsCmd) -> Result<()> {
    let max_commits = cmd.max.unwrap_or(settings.initial_load_commits);
    let (dispatcher, _pushed) = Dispatcher::new(GitRunner::default(), settings);
    let response = dispatcher.handle(&Request::LoadCommits {
        repo: repo_arg(cmd.repo)?,
        branch_name: cmd.branch.unwrap_or_else(|| ALL_BRANCHES.to_string()),
        max_commits,
        show_remote_branches: cmd.remotes,
        hard: true,
    })?;

    let Response::LoadCommits {
        commits,
        more_commits_available,
        ..
    } = &response
    else {
        return Err(anyhow!("unexpected response: {}", response.command()));
    };

    if cmd.pretty {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }
    for node in commits {
        let marker = if node.current { "*" } else { " " };
        let refs = if node.refs.is_empty() {
            String::new()
        } else {
            let names: Vec<&str> = node.refs.iter().map(|r| r.name.as_str()).collect();
            format!(" ({})", names.join(", "))
        };
        println!(
            "{marker} {} {}{refs}",
            &node.commit.hash[..node.commit.hash.len().min(8)],
            node.commit.message
        );
    }
    if *more_commits_available {
        println!("... more commits available");
    }
    Ok(())
}

fn branches(settings: ViewSettings, cmd: BranchesCmd) -> Result<()> {
    let (dispatcher, _pushed) = Dispatcher::new(GitRunner::default(), settings);
    let response = dispatcher.handle(&Request::LoadBranches {
        repo: repo_arg(cmd.repo)?,
        show_remote_branches: cmd.remotes,
        hard: true,
    })?;
    let Response::LoadBranches { branches, head, .. } = response else {
        return Err(anyhow!("unexpected response: {}", response.command()));
    };
    for branch in &branches {
        let marker = if head.as_deref() == Some(branch.as_str()) {
            "*"
        } else {
            " "
        };
        println!("{marker} {branch}");
    }
    Ok(())
}

fn details(settings: ViewSettings, cmd: DetailsCmd) -> Result<()> {
    let (dispatcher, _pushed) = Dispatcher::new(GitRunner::default(), settings);
    let response = dispatcher.handle(&Request::CommitDetails {
        repo: repo_arg(cmd.repo)?,
        commit_hash: cmd.hash,
    })?;
    let Response::CommitDetails { commit_details } = response else {
        return Err(anyhow!("unexpected response: {}", response.command()));
    };
    match commit_details {
        Some(details) => println!("{}", serde_json::to_string_pretty(&details)?),
        None => println!("commit not found"),
    }
    Ok(())
}

fn repos(settings: ViewSettings) -> Result<()> {
    let (dispatcher, _pushed) = Dispatcher::new(GitRunner::default(), settings);
    let Response::LoadRepos { repos } = dispatcher.handle(&Request::LoadRepos)? else {
        return Err(anyhow!("unexpected response to loadRepos"));
    };
    for repo in repos {
        println!("{repo}");
    }
    Ok(())
}

fn repo_arg(repo: Option<PathBuf>) -> Result<String> {
    let path = match repo {
        Some(path) => path,
        None => std::env::current_dir().context("resolving current directory")?,
    };
    Ok(path.to_string_lossy().to_string())
}
