use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use leaderboard_client::board::{LeaderboardBoard, LoadState};
use leaderboard_client::models::{PlatformEntry, SubmitProfileRequest, KNOWN_DEPARTMENTS};
use leaderboard_client::{config, report};
use leaderboard_client::{ApiClient, FileStore, FilterCriteria, SessionStore, YearFilter};

#[derive(Parser)]
#[command(name = "leaderboard")]
#[command(about = "Terminal client for the college DSA leaderboard", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and remember the session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Forget the stored session
    Logout,
    /// Show whether a session is stored
    Status,
    /// Print the ranked leaderboard
    Leaderboard {
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show the detail panel for one row of the leaderboard
    Show {
        #[arg(long)]
        rank: usize,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Submit a student profile to join the leaderboard
    Submit(SubmitArgs),
    /// Write a markdown leaderboard report
    Report {
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long, default_value = "leaderboard.md")]
        out: PathBuf,
    },
    /// Export the ranked leaderboard as CSV
    Export {
        #[command(flatten)]
        filters: FilterArgs,
        #[arg(long, default_value = "leaderboard.csv")]
        csv: PathBuf,
    },
}

#[derive(Args)]
struct FilterArgs {
    /// Match against name, roll number or department (case-insensitive)
    #[arg(long, default_value = "")]
    search: String,
    /// `all` or a year number
    #[arg(long, default_value = "all")]
    year: YearFilter,
}

impl FilterArgs {
    fn criteria(&self) -> FilterCriteria {
        FilterCriteria::new(self.search.clone(), self.year)
    }
}

#[derive(Args)]
struct SubmitArgs {
    #[arg(long)]
    full_name: String,
    #[arg(long)]
    roll_number: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    password: String,
    /// Department name, e.g. "CSE-AIML"
    #[arg(long)]
    department: String,
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=4))]
    year: Option<u8>,
    #[arg(long, default_value = "")]
    profile_pic: String,
    #[arg(long)]
    leetcode: Option<String>,
    #[arg(long)]
    gfg: Option<String>,
    #[arg(long)]
    codechef: Option<String>,
}

impl SubmitArgs {
    fn into_request(self) -> SubmitProfileRequest {
        let platforms = [
            ("LeetCode", self.leetcode),
            ("GeeksforGeeks", self.gfg),
            ("CodeChef", self.codechef),
        ]
        .into_iter()
        .filter_map(|(name, url)| {
            url.filter(|u| !u.trim().is_empty())
                .map(|profile_url| PlatformEntry {
                    name: name.to_string(),
                    profile_url,
                })
        })
        .collect();

        SubmitProfileRequest {
            full_name: self.full_name,
            roll_number: self.roll_number,
            email: self.email,
            password: self.password,
            department: self.department,
            year: self.year,
            profile_pic: self.profile_pic,
            platforms,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let session_path = config::session_path()?;
    let session = Arc::new(SessionStore::new(FileStore::new(&session_path)));
    let client_config = config::ClientConfig::from_build()?;
    let client = ApiClient::new(&client_config, Arc::clone(&session))?;

    match cli.command {
        Commands::Login { email, password } => {
            let response = client
                .sign_in(&email, &password)
                .await
                .context("Login failed")?;
            println!(
                "{}",
                response.message.as_deref().unwrap_or("Logged in successfully")
            );
        }
        Commands::Logout => {
            session.logout();
            println!("Logged out successfully");
        }
        Commands::Status => match session.identity() {
            Some(identity) if session.is_authenticated() => println!("Logged in as {identity}."),
            _ if session.is_authenticated() => println!("Logged in."),
            _ => println!("Not logged in."),
        },
        Commands::Leaderboard { filters, limit } => {
            let board = load_board(&client, filters.criteria()).await?;
            print!("{}", report::render_table(&board.rows(), limit));
        }
        Commands::Show { rank, filters } => {
            let mut board = load_board(&client, filters.criteria()).await?;
            let student = board
                .select_rank(rank)
                .with_context(|| format!("no student at rank {rank} for these filters"))?;
            print!("{}", report::render_detail(student));
        }
        Commands::Submit(args) => {
            if let Some(hint) = department_hint(&args.department) {
                eprintln!("{hint}");
            }
            let ack = client
                .submit_profile(&args.into_request())
                .await
                .context("Profile submission failed")?;
            if let Some(message) = ack.message {
                tracing::info!("server acknowledged submission: {message}");
            }
            println!("Profile submitted successfully!");
        }
        Commands::Report { filters, out } => {
            let board = load_board(&client, filters.criteria()).await?;
            let rows = board.rows();
            let content = report::build_report(
                board.criteria(),
                chrono::Utc::now(),
                board.students().len(),
                &rows,
            );
            std::fs::write(&out, content)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
        Commands::Export { filters, csv } => {
            let board = load_board(&client, filters.criteria()).await?;
            let rows = board.rows();
            report::export_csv(&csv, &rows)?;
            println!("Exported {} students to {}.", rows.len(), csv.display());
        }
    }

    Ok(())
}

fn department_hint(department: &str) -> Option<String> {
    if KNOWN_DEPARTMENTS.contains(&department) {
        return None;
    }
    Some(format!(
        "Note: \"{department}\" is not one of the listed departments: {}",
        KNOWN_DEPARTMENTS.join(", ")
    ))
}

/// Fetches the student list into a fresh board; a failed fetch is reported, not hidden.
async fn load_board(client: &ApiClient, criteria: FilterCriteria) -> anyhow::Result<LeaderboardBoard> {
    let mut board = LeaderboardBoard::new(criteria);
    let ticket = board.begin_fetch();
    let result = client.list_students().await;
    board.finish_fetch(ticket, result);

    if let LoadState::Failed(message) = board.state() {
        anyhow::bail!("Could not load the leaderboard: {message}");
    }
    Ok(board)
}
