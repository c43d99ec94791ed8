use crate::commands::Commands;

use clap::Parser;

#[derive(Parser)]
#[command(name = "ie")]
#[command(about = "Export and import project and group trees as archives")]
#[command(version)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Operate on the group tree instead of the project tree
    #[arg(long, global = true)]
    pub group: bool,

    /// YAML relation tree merged over the default tree
    #[arg(long, global = true, value_name = "FILE")]
    pub tree_extension: Option<std::path::PathBuf>,

    /// Pretty-print the JSON report
    #[arg(long, global = true)]
    pub pretty: bool,
}
