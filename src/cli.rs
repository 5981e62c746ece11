use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use tracing::Level;

use crate::commands::{
    AccountsCommand, AuditCommand, CompareCommand, CompletionsCommand, CostsCommand,
};

#[derive(Debug, Clone, Parser)]
#[command(name = "costwatch", version, about = "AWS cost and waste reporting for accounts and organizations", long_about = None)]
pub struct Cli {
    #[arg(
        short = 'p',
        long,
        global = true,
        help = "AWS profile name (default: ambient credential chain)"
    )]
    pub profile: Option<String>,

    #[arg(short = 'v', long, global = true, action = ArgAction::Count, help = "Increase verbosity (-v info, -vv debug, -vvv trace)")]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    #[command(about = "List linked accounts with their 30-day spend")]
    Accounts(AccountsCommand),
    #[command(about = "Account by service cost matrix for the last 30 days")]
    Costs(CostsCommand),
    #[command(about = "Compare costs between two date ranges")]
    Compare(CompareCommand),
    #[command(about = "Organization-wide waste audit (EBS, snapshots, logs, NAT)")]
    Audit(AuditCommand),
    #[command(about = "Generate shell completion scripts for costwatch")]
    Completions(CompletionsCommand),
}

impl Cli {
    /// Tracing level selected by the repeated `-v` flag. RUST_LOG, when
    /// set, wins over this at subscriber setup.
    pub fn log_level(&self) -> Level {
        match self.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }

    pub async fn execute(self) -> Result<()> {
        let profile = self.profile;

        match self.command {
            Commands::Accounts(cmd) => cmd.execute(profile.as_deref()).await,
            Commands::Costs(cmd) => cmd.execute(profile.as_deref()).await,
            Commands::Compare(cmd) => cmd.execute(profile.as_deref()).await,
            Commands::Audit(cmd) => cmd.execute(profile.as_deref()).await,
            Commands::Completions(cmd) => {
                cmd.execute();
                Ok(())
            }
        }
    }
}
