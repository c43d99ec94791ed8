use crate::document::{DocumentWriter, JsonWriter, NdjsonWriter};
use crate::job_report::JobReport;
use crate::method_registry::MethodRegistry;
use crate::serializer::TreeSerializer;

use ie_archive::ArchiveSaver;
use ie_config::ExportConfig;
use ie_core::{ImportExportError, ObjectStore, RecordId, RelationConfig, Result};

use std::path::Path;
use std::sync::Arc;

use log::{error, info, warn};
use serde_json::Value;
use uuid::Uuid;

const NAME_ATTRIBUTE: &str = "path";

/// Serializes one root into a versioned `.tar.gz` archive.
pub struct ExportService {
    store: Arc<dyn ObjectStore>,
    config: Arc<RelationConfig>,
    export: ExportConfig,
    methods: MethodRegistry,
}

impl ExportService {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        config: Arc<RelationConfig>,
        export: ExportConfig,
        methods: MethodRegistry,
    ) -> Self {
        Self {
            store,
            config,
            export,
            methods,
        }
    }

    pub async fn export(&self, root_id: RecordId, destination: &Path) -> JobReport {
        let staging = destination.join(format!(".export-{}", Uuid::new_v4()));

        let report = match self.run(root_id, &staging, destination).await {
            Ok(report) => report,
            Err(e) => {
                error!("Export of {} {} failed: {}", self.config.root_name(), root_id, e);
                JobReport::failed(&e)
            }
        };

        if staging.exists()
            && let Err(e) = std::fs::remove_dir_all(&staging)
        {
            warn!("Failed to remove export staging directory: {}", e);
        }
        report
    }

    async fn run(&self, root_id: RecordId, staging: &Path, destination: &Path) -> Result<JobReport> {
        let root_name = self.config.root_name().to_string();
        let class = self.config.target_class(&root_name);
        let root = self
            .store
            .find_record(&class, root_id)
            .await?
            .ok_or_else(|| ImportExportError::persistence(format!("{} {} not found", class, root_id)))?;

        std::fs::create_dir_all(staging)?;
        let mut writer: Box<dyn DocumentWriter> = if self.export.ndjson {
            Box::new(NdjsonWriter::new(staging.to_path_buf(), &root_name))
        } else {
            Box::new(JsonWriter::new(staging.to_path_buf(), &root_name))
        };

        let serializer = TreeSerializer::new(
            Arc::clone(&self.store),
            Arc::clone(&self.config),
            self.methods.clone(),
            self.export.batch_size,
        )?;
        let counts = serializer.serialize(&root, writer.as_mut()).await?;

        let name = match self.store.get_attribute(&root, NAME_ATTRIBUTE).await? {
            Some(Value::String(name)) => name,
            _ => format!("{}-{}", root_name, root_id),
        };
        let archive = ArchiveSaver::new(staging).save(&name, destination)?;

        info!(
            "Exported {} {} with {} relations",
            root_name,
            root_id,
            counts.len()
        );
        Ok(JobReport {
            success: true,
            errors: Vec::new(),
            counts,
            archive: Some(archive),
        })
    }
}
