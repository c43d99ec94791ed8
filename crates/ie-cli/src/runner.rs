use crate::cli::Cli;
use crate::commands::Commands;
use crate::error::{CliError, Result};
use crate::overrides::into_params;
use crate::user_commands::UserCommands;

use ie_config::Config;
use ie_core::tree::{DEFAULT_GROUP_TREE, DEFAULT_PROJECT_TREE};
use ie_core::{ImportExportError, ImportOptions, JobContext, ObjectStore, RelationConfig, TargetRoot};
use ie_db::{
    ImportFailureRepository, ProgressEntryRepository, SqliteObjectStore, UserRepository, open_pool,
};
use ie_engine::{ExportService, ImportService, JobReport, MethodRegistry};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{info, warn};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

/// Subdirectory of the config dir that receives import extractions.
const WORK_DIR_NAME: &str = "work";

/// What a command produced, printed as JSON by the binary.
pub struct Outcome {
    pub success: bool,
    pub output: Value,
}

impl Outcome {
    fn report(report: JobReport) -> Result<Self> {
        Ok(Self {
            success: report.success,
            output: serde_json::to_value(report)?,
        })
    }
}

/// Base tree for the chosen root, with the optional extension merged in.
pub fn load_relations(group: bool, extension: Option<&Path>) -> Result<RelationConfig> {
    let base = if group {
        DEFAULT_GROUP_TREE
    } else {
        DEFAULT_PROJECT_TREE
    };

    let relations = match extension {
        Some(path) => {
            let source = std::fs::read_to_string(path).map_err(|e| CliError::TreeFile {
                path: path.to_path_buf(),
                source: e,
            })?;
            RelationConfig::merge(base, &source)?
        }
        None => RelationConfig::load(base)?,
    };
    Ok(relations)
}

pub async fn execute(cli: Cli, config: &Config, cancel: CancellationToken) -> Result<Outcome> {
    let db_path = config.database_path()?;
    let pool = open_pool(&db_path).await?;
    let users = Arc::new(UserRepository::new(pool.clone()));

    match cli.command {
        Commands::Export { root_id, output } => {
            let relations = Arc::new(load_relations(cli.group, cli.tree_extension.as_deref())?);
            let store = Arc::new(SqliteObjectStore::new(pool));
            let service = ExportService::new(
                store,
                relations,
                config.export.clone(),
                MethodRegistry::with_defaults(),
            );

            std::fs::create_dir_all(&output).map_err(|e| CliError::Io {
                path: output.clone(),
                source: e,
            })?;
            Outcome::report(service.export(root_id, &output).await)
        }

        Commands::Import {
            archive,
            target_id,
            user,
            namespace_id,
            namespace_visibility,
            source_name,
            overrides,
        } => {
            let relations = Arc::new(load_relations(cli.group, cli.tree_extension.as_deref())?);
            let store = Arc::new(SqliteObjectStore::new(pool.clone()));

            let ghost = users.ensure_ghost().await?;
            info!("Ghost user is {}", ghost.id);

            let importing_user = users
                .find_by_username(&user)
                .await?
                .ok_or_else(|| CliError::argument(format!("Unknown user '{}'", user)))?;

            let class = relations.target_class(relations.root_name());
            let target = store
                .find_record(&class, target_id)
                .await
                .map_err(ImportExportError::from)?
                .ok_or_else(|| {
                    CliError::argument(format!("{} {} does not exist", class, target_id))
                })?;

            let ctx = JobContext::new(
                importing_user,
                TargetRoot {
                    id: target_id,
                    class,
                    namespace_id: namespace_id.or_else(|| target.attribute_i64("namespace_id")),
                    namespace_visibility,
                },
            )
            .with_options(ImportOptions {
                override_params: into_params(overrides),
                source_name,
            });
            info!(
                "Import {} of {} by {}",
                ctx.correlation_id,
                archive.display(),
                ctx.importing_user.username
            );

            let service = ImportService::new(
                store,
                users,
                Arc::new(ProgressEntryRepository::new(pool.clone())),
                Arc::new(ImportFailureRepository::new(pool)),
                relations,
                config.archive.clone(),
                config.retry.clone(),
            )
            .with_work_dir(work_dir()?)
            .with_cancellation(cancel);

            Outcome::report(service.import(&archive, &ctx).await)
        }

        Commands::User { action } => match action {
            UserCommands::Add {
                username,
                email,
                name,
            } => {
                if users.find_by_username(&username).await?.is_some() {
                    return Err(CliError::argument(format!(
                        "User '{}' already exists",
                        username
                    )));
                }
                let name = name.unwrap_or_else(|| username.clone());
                let created = users.create(&username, &email, &name).await?;
                Ok(Outcome {
                    success: true,
                    output: serde_json::to_value(&created)?,
                })
            }
            UserCommands::Get { username } => match users.find_by_username(&username).await? {
                Some(found) => Ok(Outcome {
                    success: true,
                    output: serde_json::to_value(&found)?,
                }),
                None => {
                    warn!("User '{}' not found", username);
                    Ok(Outcome {
                        success: false,
                        output: Value::Null,
                    })
                }
            },
        },
    }
}

fn work_dir() -> Result<PathBuf> {
    let dir = Config::config_dir()?.join(WORK_DIR_NAME);
    std::fs::create_dir_all(&dir).map_err(|e| CliError::Io {
        path: dir.clone(),
        source: e,
    })?;
    Ok(dir)
}
