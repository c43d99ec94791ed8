use crate::overrides::parse_override;
use crate::user_commands::UserCommands;

use std::path::PathBuf;

use clap::Subcommand;
use serde_json::Value;

#[derive(Subcommand)]
pub enum Commands {
    /// Export a root record and its relation tree into a tar.gz archive
    Export {
        /// Id of the project or group to export
        #[arg(long)]
        root_id: i64,

        /// Directory that receives the archive
        #[arg(long, default_value = ".")]
        output: PathBuf,
    },

    /// Import an archive into an existing project or group
    Import {
        /// Path to the tar.gz archive
        archive: PathBuf,

        /// Id of the destination project or group
        #[arg(long)]
        target_id: i64,

        /// Username of the importing user
        #[arg(long)]
        user: String,

        /// Destination namespace (defaults to the target's namespace_id)
        #[arg(long)]
        namespace_id: Option<i64>,

        /// Visibility ceiling of the destination namespace
        #[arg(long)]
        namespace_visibility: Option<i64>,

        /// Name used when annotating notes whose author is unknown
        #[arg(long)]
        source_name: Option<String>,

        /// Root attribute override as KEY=VALUE (VALUE parsed as JSON when possible)
        #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_override)]
        overrides: Vec<(String, Value)>,
    },

    /// Destination user operations
    User {
        #[command(subcommand)]
        action: UserCommands,
    },
}
