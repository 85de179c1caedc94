use crate::domain::models::{Category, IssueStatus, Priority, ResolutionStatus, Urgency};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "civic", version, about = "CivicConnect citizen issue-reporting CLI")]
pub struct Cli {
    #[arg(long, global = true, help = "Output machine-readable JSON")]
    pub json: bool,
    #[arg(
        long,
        global = true,
        help = "CivicConnect API base URL (overrides the configured server)"
    )]
    pub server: Option<String>,
    #[arg(long, global = true, help = "Message language (en, es, hi)")]
    pub lang: Option<String>,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Report a civic issue through the guided submission flow
    Report(ReportArgs),
    Issues {
        #[command(subcommand)]
        command: IssueCommands,
    },
    Orgs {
        #[command(subcommand)]
        command: OrgCommands,
    },
    Comments {
        #[command(subcommand)]
        command: CommentCommands,
    },
    Resolutions {
        #[command(subcommand)]
        command: ResolutionCommands,
    },
    Account {
        #[command(subcommand)]
        command: AccountCommands,
    },
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },
    Lang {
        #[command(subcommand)]
        command: LangCommands,
    },
}

#[derive(Args, Debug)]
pub struct ReportArgs {
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long, value_enum)]
    pub category: Option<Category>,
    #[arg(long, value_enum, default_value_t = Priority::Medium)]
    pub priority: Priority,
    #[arg(long, value_enum, default_value_t = Urgency::Normal)]
    pub urgency: Urgency,
    #[arg(long, help = "Street address of the issue")]
    pub address: Option<String>,
    #[arg(long, requires = "lon", help = "Latitude for reverse geocoding")]
    pub lat: Option<f64>,
    #[arg(long, requires = "lat", help = "Longitude for reverse geocoding")]
    pub lon: Option<f64>,
    #[arg(long = "image", value_name = "PATH", help = "Attach an image (repeatable, max 5)")]
    pub images: Vec<PathBuf>,
    #[arg(long)]
    pub contact_name: Option<String>,
    #[arg(long)]
    pub contact_email: Option<String>,
    #[arg(long)]
    pub contact_phone: Option<String>,
    #[arg(long, default_value_t = false, help = "Report without contact details")]
    pub anonymous: bool,
    #[arg(long)]
    pub estimated_cost: Option<f64>,
    #[arg(long)]
    pub affected_people: Option<u64>,
    #[arg(long, default_value_t = false)]
    pub safety_concern: bool,
    #[arg(long, default_value_t = false)]
    pub environmental_impact: bool,
    #[arg(
        long,
        default_value_t = false,
        help = "Confirm submitting without an account"
    )]
    pub as_guest: bool,
}

#[derive(Subcommand, Debug)]
pub enum IssueCommands {
    List {
        #[arg(long, default_value_t = 1)]
        page: u64,
        #[arg(long, default_value_t = 10)]
        limit: u64,
        #[arg(long, value_enum)]
        category: Option<Category>,
        #[arg(long, value_enum)]
        status: Option<IssueStatus>,
        #[arg(long, value_enum)]
        priority: Option<Priority>,
        #[arg(long)]
        search: Option<String>,
    },
    Show {
        id: String,
    },
    Upvote {
        id: String,
    },
    Downvote {
        id: String,
    },
    Mine,
}

#[derive(Subcommand, Debug)]
pub enum OrgCommands {
    List {
        #[arg(long, default_value_t = 1)]
        page: u64,
        #[arg(long, default_value_t = 10)]
        limit: u64,
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        category: Option<String>,
    },
    Show {
        id: String,
    },
    Create {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        category: Option<String>,
    },
    AddMember {
        org: String,
        #[arg(help = "Email address or user id")]
        member: String,
        #[arg(long, default_value = "member")]
        role: String,
    },
    RemoveMember {
        org: String,
        user: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum CommentCommands {
    List {
        issue: String,
    },
    Add {
        issue: String,
        text: String,
    },
    Edit {
        id: String,
        text: String,
    },
    Delete {
        id: String,
    },
    Like {
        id: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum ResolutionCommands {
    List {
        issue: String,
    },
    Add {
        issue: String,
        description: String,
    },
    Like {
        id: String,
    },
    SetStatus {
        id: String,
        #[arg(value_enum)]
        status: ResolutionStatus,
    },
}

#[derive(Subcommand, Debug)]
pub enum AccountCommands {
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    Logout,
    Whoami,
}

#[derive(Subcommand, Debug)]
pub enum AdminCommands {
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    Logout,
    Status,
    Stats,
    SetStatus {
        id: String,
        #[arg(value_enum)]
        status: IssueStatus,
    },
    DeleteIssue {
        id: String,
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
    DeleteOrg {
        id: String,
        #[arg(long, default_value_t = false)]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum LangCommands {
    List,
    Show,
    Set { code: String },
}
