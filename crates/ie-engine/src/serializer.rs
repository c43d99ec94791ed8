use crate::document::DocumentWriter;
use crate::method_registry::MethodRegistry;

use ie_core::{
    Association, AttributesPermitter, Cardinality, ImportExportError, ObjectStore, Record,
    RecordId, RelationConfig, RelationCounts, RelationNode, Result, StoreError,
};

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use log::{debug, info, warn};
use serde_json::{Map, Value};

/// Per-relation counts for one export. `created` counts emitted entries.
pub type ExportCounts = BTreeMap<String, RelationCounts>;

/// Walks the relation tree over the object store and emits a document.
pub struct TreeSerializer {
    store: Arc<dyn ObjectStore>,
    config: Arc<RelationConfig>,
    permitter: Arc<AttributesPermitter>,
    methods: MethodRegistry,
    batch_size: usize,
}

impl TreeSerializer {
    /// Fails with a config error when the tree declares a method the
    /// registry cannot evaluate.
    pub fn new(
        store: Arc<dyn ObjectStore>,
        config: Arc<RelationConfig>,
        methods: MethodRegistry,
        batch_size: usize,
    ) -> Result<Self> {
        methods.validate(&config)?;
        if batch_size == 0 {
            return Err(ImportExportError::config("export batch size must be positive"));
        }
        let permitter = Arc::new(AttributesPermitter::new(&config));

        Ok(Self {
            store,
            config,
            permitter,
            methods,
            batch_size,
        })
    }

    pub async fn serialize(
        &self,
        root: &Record,
        writer: &mut dyn DocumentWriter,
    ) -> Result<ExportCounts> {
        let tree = self.config.root();
        let mut counts = ExportCounts::new();

        writer.write_root(self.attributes_for(tree, root))?;

        for node in &tree.include {
            match node.cardinality {
                Cardinality::One => {
                    let value = match self.encodable_single(root, node, &mut counts).await? {
                        Some(record) => self.serialize_record(node, record, &mut counts).await?,
                        None => Value::Null,
                    };
                    writer.write_one(&node.name, value)?;
                }
                Cardinality::Many => {
                    writer.start_many(&node.name)?;
                    self.stream_many(root, node, writer, &mut counts).await?;
                }
            }
            debug!("Serialized relation '{}'", node.name);
        }

        writer.finish()?;
        info!(
            "Serialized {} relations for {} {}",
            tree.include.len(),
            root.class,
            root.id.unwrap_or_default()
        );
        Ok(counts)
    }

    /// Top-level has-many: page through and write entries one by one.
    async fn stream_many(
        &self,
        root: &Record,
        node: &RelationNode,
        writer: &mut dyn DocumentWriter,
        counts: &mut ExportCounts,
    ) -> Result<()> {
        let preloads = node.preloaded_children();
        let mut after: Option<RecordId> = None;

        loop {
            let page = self
                .store
                .get_association_page(root, &node.name, after, self.batch_size)
                .await?;
            let fetched = page.len();

            let mut records = Vec::with_capacity(fetched);
            for item in page {
                match item {
                    Ok(record) => {
                        after = record.id.or(after);
                        records.push(record);
                    }
                    Err(StoreError::Encoding { id, message, .. }) => {
                        warn!(
                            "Skipping {} record {} that cannot be encoded: {}",
                            node.name, id, message
                        );
                        counts.entry(node.name.clone()).or_default().skipped += 1;
                        after = Some(id);
                    }
                    Err(other) => return Err(other.into()),
                }
            }

            if !preloads.is_empty() {
                self.store.preload(&records, &preloads).await?;
            }
            for record in records {
                let value = self.serialize_record(node, record, counts).await?;
                writer.append_many(&node.name, &value)?;
            }

            if fetched < self.batch_size {
                return Ok(());
            }
        }
    }

    /// Nested has-many, collected in memory.
    async fn collect_many(
        &self,
        parent: &Record,
        node: &RelationNode,
        counts: &mut ExportCounts,
    ) -> Result<Vec<Value>> {
        let mut values = Vec::new();
        let mut after: Option<RecordId> = None;

        loop {
            let page = self
                .store
                .get_association_page(parent, &node.name, after, self.batch_size)
                .await?;
            let fetched = page.len();

            for item in page {
                match item {
                    Ok(record) => {
                        after = record.id.or(after);
                        values.push(self.serialize_record(node, record, counts).await?);
                    }
                    Err(StoreError::Encoding { id, message, .. }) => {
                        warn!(
                            "Skipping {} record {} that cannot be encoded: {}",
                            node.name, id, message
                        );
                        counts.entry(node.name.clone()).or_default().skipped += 1;
                        after = Some(id);
                    }
                    Err(other) => return Err(other.into()),
                }
            }

            if fetched < self.batch_size {
                return Ok(values);
            }
        }
    }

    async fn single(&self, record: &Record, name: &str) -> Result<Option<Record>> {
        Ok(match self.store.get_association(record, name).await? {
            Association::One(found) => found,
            Association::Many(records) => records.into_iter().next(),
        })
    }

    /// Permitted attributes, computed methods, then children in tree order.
    fn serialize_record<'a>(
        &'a self,
        node: &'a RelationNode,
        record: Record,
        counts: &'a mut ExportCounts,
    ) -> BoxFuture<'a, Result<Value>> {
        Box::pin(async move {
            let mut object = self.attributes_for(node, &record);

            for child in &node.include {
                let value = match child.cardinality {
                    Cardinality::One => match self.encodable_single(&record, child, counts).await? {
                        Some(found) => self.serialize_record(child, found, counts).await?,
                        None => Value::Null,
                    },
                    Cardinality::Many => {
                        Value::Array(self.collect_many(&record, child, counts).await?)
                    }
                };
                object.insert(child.name.clone(), value);
            }

            counts.entry(node.name.clone()).or_default().created += 1;
            Ok(Value::Object(object))
        })
    }

    /// A has-one record that cannot be encoded is skipped and exported as null.
    async fn encodable_single(
        &self,
        owner: &Record,
        node: &RelationNode,
        counts: &mut ExportCounts,
    ) -> Result<Option<Record>> {
        match self.single(owner, &node.name).await {
            Ok(found) => Ok(found),
            Err(ImportExportError::Encoding { message, .. }) => {
                warn!("Skipping {} that cannot be encoded: {}", node.name, message);
                counts.entry(node.name.clone()).or_default().skipped += 1;
                Ok(None)
            }
            Err(other) => Err(other),
        }
    }

    fn attributes_for(&self, node: &RelationNode, record: &Record) -> Map<String, Value> {
        let mut attributes = self.permitter.permit(&node.name, &record.attributes);
        for method in &node.methods {
            if let Some(f) = self.methods.get(&node.name, method) {
                attributes.insert(method.clone(), f(record));
            }
        }
        attributes
    }
}
