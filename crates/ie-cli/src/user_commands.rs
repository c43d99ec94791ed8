use clap::Subcommand;

#[derive(Subcommand)]
pub enum UserCommands {
    /// Register a destination user
    Add {
        #[arg(long)]
        username: String,

        #[arg(long)]
        email: String,

        /// Display name (defaults to the username)
        #[arg(long)]
        name: Option<String>,
    },

    /// Look up a destination user by username
    Get { username: String },
}
