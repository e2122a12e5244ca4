use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "pdfsplit",
    version,
    about = "Split journal PDFs into one file per article using page text"
)]
pub struct Cli {
    #[arg(long, short = 'd', global = true, default_value_t = false)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Extract(ExtractArgs),
    ExtractIndex(ExtractIndexArgs),
    Delete(DeleteArgs),
    DeletePages(DeletePagesArgs),
    Undo(UndoArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ToolArgs {
    #[arg(long, default_value_t = 60)]
    pub tool_timeout_secs: u64,
}

#[derive(Args, Debug, Clone)]
pub struct BackupArgs {
    #[arg(long, default_value = "./backup")]
    pub backup_path: PathBuf,

    #[arg(long, env = "BACKUP_CAPACITY", default_value_t = 20)]
    pub backup_capacity: usize,
}

#[derive(Args, Debug, Clone)]
pub struct ExtractArgs {
    #[arg(long, short = 'f')]
    pub file: PathBuf,

    #[arg(long, short = 'o', default_value = "./extracted")]
    pub output_path: PathBuf,

    #[arg(long, short = 'c', default_value = "./configs")]
    pub config_path: PathBuf,

    #[arg(long)]
    pub ends_with: Option<String>,

    #[arg(long, default_value_t = 0.6)]
    pub threshold: f64,

    #[arg(long, value_enum, default_value_t = MatchPolicyArg::Prefix)]
    pub match_policy: MatchPolicyArg,

    #[arg(long, value_enum, default_value_t = BoundaryModeArg::BestEffort)]
    pub boundary_mode: BoundaryModeArg,

    #[arg(long, requires = "article_title")]
    pub from: Option<usize>,

    #[arg(long, requires = "article_title")]
    pub to: Option<usize>,

    #[arg(long)]
    pub article_title: Option<String>,

    #[command(flatten)]
    pub tools: ToolArgs,
}

#[derive(Args, Debug, Clone)]
pub struct ExtractIndexArgs {
    #[arg(long, short = 'f')]
    pub file: PathBuf,

    #[arg(long, short = 'o', default_value = "./")]
    pub output_path: PathBuf,

    #[command(flatten)]
    pub tools: ToolArgs,
}

#[derive(Args, Debug, Clone)]
pub struct DeleteArgs {
    #[arg(long, short = 'f')]
    pub file: PathBuf,

    #[command(flatten)]
    pub backup: BackupArgs,
}

#[derive(Args, Debug, Clone)]
pub struct DeletePagesArgs {
    #[arg(long, short = 'f')]
    pub file: PathBuf,

    #[arg(long, conflicts_with_all = ["from", "to", "starts_with"])]
    pub at: Option<usize>,

    #[arg(long, conflicts_with = "starts_with")]
    pub from: Option<usize>,

    #[arg(long)]
    pub to: Option<usize>,

    #[arg(long)]
    pub starts_with: Option<String>,

    #[arg(long, default_value_t = false)]
    pub no_backup: bool,

    #[command(flatten)]
    pub backup: BackupArgs,

    #[command(flatten)]
    pub tools: ToolArgs,
}

#[derive(Args, Debug, Clone)]
pub struct UndoArgs {
    #[arg(long, short = 'f')]
    pub file: PathBuf,

    #[arg(long, default_value = "./backup")]
    pub backup_path: PathBuf,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum MatchPolicyArg {
    Prefix,
    Substring,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum BoundaryModeArg {
    Strict,
    BestEffort,
}
