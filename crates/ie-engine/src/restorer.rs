use crate::document::{DocumentReader, RelationEntries};
use crate::member_mapper::MemberMapper;
use crate::progress_tracker::ProgressTracker;
use crate::relation_factory::{RelationFactory, is_source_only};
use crate::retry::with_retry;

use ie_config::RetryConfig;
use ie_core::permitter::is_structured;
use ie_core::{
    AttributesPermitter, ImportExportError, JobContext, MemberMap, ObjectStore,
    PermittedAttributes, Record, RecordId, RelationConfig, RelationCounts, RelationNode, Result,
    UserDirectory,
};

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use futures::future::BoxFuture;
use log::{debug, info, warn};
use serde_json::{Map, Value};

const SOURCE_ROOT: &str = "root_attributes";
const SOURCE_MEMBERS: &str = "members";
const SOURCE_RELATION: &str = "relation_object";
const SOURCE_DEFERRED_LINK: &str = "deferred_link";
const SOURCE_PERSIST_RETRY: &str = "persist";

const USER_CLASS: &str = "User";
/// Maintainer, granted to the importing user on the destination root
const IMPORTER_ACCESS_LEVEL: i64 = 40;
const IMPORTER_ENTRY: &str = "importer";

const VISIBILITY_LEVEL: &str = "visibility_level";
const CLASSIFICATION_LABEL: &str = "external_authorization_classification_label";

/// Result of one restore run.
#[derive(Debug, Clone, Default)]
pub struct RestoreOutcome {
    pub success: bool,
    pub counts: BTreeMap<String, RelationCounts>,
    /// Path-redacted messages, one per failed unit
    pub errors: Vec<String>,
}

#[derive(Default)]
struct RestoreState {
    failed: bool,
    counts: BTreeMap<String, RelationCounts>,
    errors: Vec<String>,
}

impl RestoreState {
    fn created(&mut self, relation: &str) {
        self.counts.entry(relation.to_string()).or_default().created += 1;
    }

    fn skipped(&mut self, relation: &str) {
        self.counts.entry(relation.to_string()).or_default().skipped += 1;
    }

    fn fail(&mut self, relation: &str, error: &ImportExportError) {
        self.failed = true;
        self.counts.entry(relation.to_string()).or_default().failed += 1;
        self.errors.push(error.user_message());
    }

    fn into_outcome(self) -> RestoreOutcome {
        RestoreOutcome {
            success: !self.failed,
            counts: self.counts,
            errors: self.errors,
        }
    }
}

/// A failed unit of work plus the retries spent on it.
struct EntryError {
    error: ImportExportError,
    retry_count: u32,
}

impl From<ImportExportError> for EntryError {
    fn from(error: ImportExportError) -> Self {
        Self {
            error,
            retry_count: 0,
        }
    }
}

impl From<ie_core::StoreError> for EntryError {
    #[track_caller]
    fn from(error: ie_core::StoreError) -> Self {
        ImportExportError::from(error).into()
    }
}

/// Rebuilds a record graph from a document, parents before children.
pub struct TreeRestorer {
    store: Arc<dyn ObjectStore>,
    users: Arc<dyn UserDirectory>,
    config: Arc<RelationConfig>,
    permitter: Arc<AttributesPermitter>,
    factory: RelationFactory,
    tracker: ProgressTracker,
    retry: RetryConfig,
}

impl TreeRestorer {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        users: Arc<dyn UserDirectory>,
        config: Arc<RelationConfig>,
        tracker: ProgressTracker,
        retry: RetryConfig,
    ) -> Self {
        let permitter = Arc::new(AttributesPermitter::new(&config));
        let factory = RelationFactory::new(Arc::clone(&config), Arc::clone(&permitter));

        Self {
            store,
            users,
            config,
            permitter,
            factory,
            tracker,
            retry,
        }
    }

    /// Errors returned here are fatal for the job. Per-entry failures are
    /// logged, counted and reported through `RestoreOutcome::success`.
    pub async fn restore(&self, reader: &DocumentReader, ctx: &JobContext) -> Result<RestoreOutcome> {
        let tree = self.config.root();
        self.check_top_level(reader)?;

        let mut root = self
            .store
            .find_record(&ctx.target.class, ctx.target.id)
            .await?
            .ok_or_else(|| {
                ImportExportError::persistence(format!(
                    "target {} {} does not exist",
                    ctx.target.class, ctx.target.id
                ))
            })?;

        let mut state = RestoreState::default();
        self.restore_root_attributes(reader, &mut root, ctx, &mut state)
            .await?;
        let members = self.restore_members(reader, &root, ctx, &mut state).await?;

        for node in &tree.include {
            if self.config.members_relation() == Some(node.name.as_str()) || self.is_user_relation(node) {
                continue;
            }
            self.restore_relation(reader, node, &root, &members, ctx, &mut state)
                .await?;
        }

        let outcome = state.into_outcome();
        info!(
            "Restore of {} {} finished: success={} relations={}",
            ctx.target.class,
            ctx.target.id,
            outcome.success,
            outcome.counts.len()
        );
        Ok(outcome)
    }

    /// Every relation-looking key of the root must have a permission rule.
    fn check_top_level(&self, reader: &DocumentReader) -> Result<()> {
        let tree = self.config.root();

        let inline = reader
            .root()
            .iter()
            .filter(|(key, value)| self.is_relation_value(tree, key, value))
            .map(|(key, _)| key.clone());
        for key in inline.chain(reader.batched_relations()?) {
            if !self.permitter.permitted_attributes_defined(&key) {
                return Err(ImportExportError::unknown_relation(key));
            }
            if tree.child(self.config.canonical_name(&key)).is_none() {
                warn!("Ignoring '{}': not a top-level relation of '{}'", key, tree.name);
            }
        }
        Ok(())
    }

    /// Warn about relations nested where the tree does not place them.
    fn check_entry(&self, node: &RelationNode, raw: &Map<String, Value>) {
        let mut stack = vec![(node, raw)];

        while let Some((node, raw)) = stack.pop() {
            for (key, value) in raw {
                if !self.is_relation_value(node, key, value) {
                    continue;
                }
                let Some(child) = node.child(self.config.canonical_name(key)) else {
                    warn!("Ignoring '{}' under '{}': not part of the tree", key, node.name);
                    continue;
                };
                match value {
                    Value::Object(object) => stack.push((child, object)),
                    Value::Array(items) => {
                        stack.extend(items.iter().filter_map(Value::as_object).map(|o| (child, o)))
                    }
                    _ => {}
                }
            }
        }
    }

    /// Structured values under child or known relation names are relations.
    /// Any other key is an attribute, whatever its shape.
    fn is_relation_value(&self, node: &RelationNode, key: &str, value: &Value) -> bool {
        if !is_structured(value) {
            return false;
        }
        if node.child(self.config.canonical_name(key)).is_some() {
            return true;
        }
        let explicit = self
            .permitter
            .permitted_attributes_for(&node.name)
            .is_some_and(|p| p.names_explicitly(key));
        !explicit && self.config.is_known(key)
    }

    async fn restore_root_attributes(
        &self,
        reader: &DocumentReader,
        root: &mut Record,
        ctx: &JobContext,
        state: &mut RestoreState,
    ) -> Result<()> {
        let tree = self.config.root();
        let key = format!("{}_attributes", tree.name);
        if self.tracker.processed(&key).await? {
            state.skipped(&tree.name);
            return Ok(());
        }

        let permitted = self.permitter.permitted_attributes_for(&tree.name);
        let scalars: Map<String, Value> = reader
            .root()
            .iter()
            .filter(|(key, value)| !self.is_relation_value(tree, key, value))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        let mut attributes = self.permitter.permit(&tree.name, &scalars);
        attributes.retain(|key, _| !is_source_only(key) && !key.ends_with("_id"));
        if let Some(permitted) = permitted {
            apply_overrides(&mut attributes, &ctx.options.override_params, permitted);
        }
        clamp_visibility(&mut attributes, ctx.target.namespace_visibility);

        root.attributes.extend(attributes);
        match self.update_with_retry(root, &tree.name, None).await {
            Ok(()) => {
                self.tracker.save(&key).await?;
                state.created(&tree.name);
            }
            Err(e) => {
                self.tracker
                    .log_failure(SOURCE_ROOT, Some(&tree.name), None, &e.error, e.retry_count, None)
                    .await;
                state.fail(&tree.name, &e.error);
            }
        }
        Ok(())
    }

    async fn restore_members(
        &self,
        reader: &DocumentReader,
        root: &Record,
        ctx: &JobContext,
        state: &mut RestoreState,
    ) -> Result<MemberMap> {
        let ghost = self.users.ghost_user().await?.map(|user| user.id);
        let Some(relation) = self.config.members_relation() else {
            return Ok(MemberMap::new(ctx.importing_user.id, ghost));
        };

        let mut exported = Vec::new();
        if let Some(entries) = self.entries(reader, relation)? {
            for entry in entries {
                exported.push(entry?);
            }
        }
        if let Some(node) = self.config.root().child(relation) {
            for entry in exported.iter().filter_map(Value::as_object) {
                self.check_entry(node, entry);
            }
        }

        let members =
            MemberMapper::build(&exported, &ctx.importing_user, &ctx.target, self.users.as_ref())
                .await?;

        for membership in members.memberships() {
            let mut attributes = Map::new();
            attributes.insert("user_id".to_string(), Value::from(membership.user_id));
            attributes.insert("access_level".to_string(), Value::from(membership.access_level));
            let key = ProgressTracker::entry_key(relation, membership.index);
            self.persist_member(&key, relation, membership.index, attributes, root, state)
                .await?;
        }

        for invitation in members.pending_invitations() {
            let mut attributes = Map::new();
            attributes.insert("user_id".to_string(), Value::Null);
            attributes.insert(
                "invite_email".to_string(),
                Value::String(invitation.invite_email.clone()),
            );
            attributes.insert("access_level".to_string(), Value::from(invitation.access_level));
            let key = ProgressTracker::entry_key(relation, invitation.index);
            self.persist_member(&key, relation, invitation.index, attributes, root, state)
                .await?;
        }

        let importer = ctx.importing_user.id;
        if !members.memberships().iter().any(|m| m.user_id == importer) {
            let mut attributes = Map::new();
            attributes.insert("user_id".to_string(), Value::from(importer));
            attributes.insert("access_level".to_string(), Value::from(IMPORTER_ACCESS_LEVEL));
            let key = format!("{}/{}", relation, IMPORTER_ENTRY);
            self.persist_member(&key, relation, exported.len(), attributes, root, state)
                .await?;
        }

        Ok(members)
    }

    async fn persist_member(
        &self,
        key: &str,
        relation: &str,
        index: usize,
        attributes: Map<String, Value>,
        root: &Record,
        state: &mut RestoreState,
    ) -> Result<()> {
        if self.tracker.processed(key).await? {
            state.skipped(relation);
            return Ok(());
        }

        let root_id = root.id.unwrap_or_default();
        let class = self.config.target_class(relation);
        let result = async {
            let record = self
                .store
                .new_instance(&class, attributes)
                .await?
                .with_parent(root_id, relation, root_id);
            self.persist_with_retry(&record, relation, Some(index)).await
        }
        .await;

        match result {
            Ok(_) => {
                self.tracker.save(key).await?;
                state.created(relation);
            }
            Err(e) => {
                self.tracker
                    .log_failure(SOURCE_MEMBERS, Some(relation), Some(index), &e.error, e.retry_count, None)
                    .await;
                state.fail(relation, &e.error);
            }
        }
        Ok(())
    }

    /// One top-level relation, each entry guarded by its own checkpoint.
    async fn restore_relation(
        &self,
        reader: &DocumentReader,
        node: &RelationNode,
        root: &Record,
        members: &MemberMap,
        ctx: &JobContext,
        state: &mut RestoreState,
    ) -> Result<()> {
        let Some(entries) = self.entries(reader, &node.name)? else {
            debug!("Relation '{}' not present in document", node.name);
            return Ok(());
        };

        for (index, entry) in entries.enumerate() {
            let key = ProgressTracker::entry_key(&node.name, index);
            if self.tracker.processed(&key).await? {
                state.skipped(&node.name);
                continue;
            }

            let raw = match entry {
                Ok(Value::Object(raw)) => raw,
                Ok(_) => {
                    let error = ImportExportError::invalid_format(format!(
                        "{} entry {} is not an object",
                        node.name, index
                    ));
                    self.tracker
                        .log_failure(SOURCE_RELATION, Some(&node.name), Some(index), &error, 0, None)
                        .await;
                    state.fail(&node.name, &error);
                    continue;
                }
                Err(error) => {
                    self.tracker
                        .log_failure(SOURCE_RELATION, Some(&node.name), Some(index), &error, 0, None)
                        .await;
                    state.fail(&node.name, &error);
                    continue;
                }
            };

            self.check_entry(node, &raw);

            match self
                .persist_tree(node, &raw, root, Some(index), members, ctx, state)
                .await
            {
                Ok(_) => self.tracker.save(&key).await?,
                Err(e) => {
                    self.tracker
                        .log_failure(SOURCE_RELATION, Some(&node.name), Some(index), &e.error, e.retry_count, Some(&raw))
                        .await;
                    state.fail(&node.name, &e.error);
                }
            }
        }
        Ok(())
    }

    /// Persist one record, then its subtree, then its deferred links.
    #[allow(clippy::too_many_arguments)]
    fn persist_tree<'a>(
        &'a self,
        node: &'a RelationNode,
        raw: &'a Map<String, Value>,
        parent: &'a Record,
        index: Option<usize>,
        members: &'a MemberMap,
        ctx: &'a JobContext,
        state: &'a mut RestoreState,
    ) -> BoxFuture<'a, std::result::Result<Record, EntryError>> {
        Box::pin(async move {
            let root_id = ctx.target.id;
            let Some(parent_id) = parent.id else {
                return Err(ImportExportError::persistence(format!(
                    "parent of {} is not persisted",
                    node.name
                ))
                .into());
            };

            let relation = self.factory.create(&node.name, raw, members, ctx)?;
            let mut attributes = relation.attributes;

            for child in &node.include {
                let Some(keys) = self.config.existing_object_keys(&child.name) else {
                    continue;
                };
                let Some(Value::Object(child_raw)) = self.child_value(raw, &child.name) else {
                    continue;
                };
                let id = self
                    .find_or_create(child, child_raw, keys, members, ctx, state)
                    .await?;
                attributes.insert(format!("{}_id", child.name), Value::from(id));
            }

            let mut record = self
                .store
                .new_instance(&relation.target_class, attributes)
                .await?
                .with_parent(parent_id, node.name.as_str(), root_id);
            record.id = Some(self.persist_with_retry(&record, &node.name, index).await?);
            state.created(&node.name);

            let mut last_child: HashMap<&str, RecordId> = HashMap::new();
            for child in &node.include {
                if self.config.existing_object_keys(&child.name).is_some()
                    || self.is_user_relation(child)
                {
                    continue;
                }

                let items: Vec<&Map<String, Value>> = match self.child_value(raw, &child.name) {
                    Some(Value::Array(items)) => items.iter().filter_map(Value::as_object).collect(),
                    Some(Value::Object(object)) => vec![object],
                    _ => continue,
                };

                for (child_index, item) in items.into_iter().enumerate() {
                    match self
                        .persist_tree(child, item, &record, Some(child_index), members, ctx, state)
                        .await
                    {
                        Ok(saved) => {
                            if let Some(id) = saved.id {
                                last_child.insert(child.name.as_str(), id);
                            }
                        }
                        Err(e) => {
                            self.tracker
                                .log_failure(SOURCE_RELATION, Some(&child.name), Some(child_index), &e.error, e.retry_count, Some(item))
                                .await;
                            state.fail(&child.name, &e.error);
                        }
                    }
                }
            }

            self.link_deferred(&mut record, node, &last_child, index, state)
                .await;
            Ok(record)
        })
    }

    /// Fill pointers to children that only exist once the subtree is saved.
    async fn link_deferred(
        &self,
        record: &mut Record,
        node: &RelationNode,
        last_child: &HashMap<&str, RecordId>,
        index: Option<usize>,
        state: &mut RestoreState,
    ) {
        let mut linked = false;
        for link in self.config.deferred_links(&node.name) {
            if let Some(id) = last_child.get(link.relation.as_str()) {
                record
                    .attributes
                    .insert(link.attribute.clone(), Value::from(*id));
                linked = true;
            }
        }
        if !linked {
            return;
        }

        if let Err(e) = self.update_with_retry(record, &node.name, index).await {
            self.tracker
                .log_failure(SOURCE_DEFERRED_LINK, Some(&node.name), index, &e.error, e.retry_count, None)
                .await;
            state.fail(&node.name, &e.error);
        }
    }

    /// Reuse a matching record under the root, or create it there.
    async fn find_or_create(
        &self,
        node: &RelationNode,
        raw: &Map<String, Value>,
        keys: &[String],
        members: &MemberMap,
        ctx: &JobContext,
        state: &mut RestoreState,
    ) -> std::result::Result<RecordId, EntryError> {
        let root_id = ctx.target.id;
        let relation = self.factory.create(&node.name, raw, members, ctx)?;

        let lookup: Map<String, Value> = keys
            .iter()
            .filter_map(|key| {
                relation
                    .attributes
                    .get(key)
                    .map(|value| (key.clone(), value.clone()))
            })
            .collect();

        if lookup.len() == keys.len()
            && let Some(existing) = self
                .store
                .find_existing(root_id, &relation.target_class, &lookup)
                .await?
            && let Some(id) = existing.id
        {
            debug!("Reusing existing {} {}", relation.target_class, id);
            return Ok(id);
        }

        let record = self
            .store
            .new_instance(&relation.target_class, relation.attributes)
            .await?
            .with_parent(root_id, node.name.as_str(), root_id);
        let id = self.persist_with_retry(&record, &node.name, None).await?;
        state.created(&node.name);
        Ok(id)
    }

    async fn persist_with_retry(
        &self,
        record: &Record,
        relation: &str,
        index: Option<usize>,
    ) -> std::result::Result<RecordId, EntryError> {
        let mut retried: Vec<String> = Vec::new();
        let store = &self.store;
        let result = with_retry(
            &self.retry,
            "persist",
            |e: &ImportExportError, _attempt| retried.push(transient_message(e)),
            || async move { store.persist(record).await.map_err(ImportExportError::from) },
        )
        .await;

        self.log_retries(&retried, relation, index).await;
        result.map_err(|error| EntryError {
            error,
            retry_count: retry_count(&retried),
        })
    }

    async fn update_with_retry(
        &self,
        record: &Record,
        relation: &str,
        index: Option<usize>,
    ) -> std::result::Result<(), EntryError> {
        let mut retried: Vec<String> = Vec::new();
        let store = &self.store;
        let result = with_retry(
            &self.retry,
            "update",
            |e: &ImportExportError, _attempt| retried.push(transient_message(e)),
            || async move { store.update(record).await.map_err(ImportExportError::from) },
        )
        .await;

        self.log_retries(&retried, relation, index).await;
        result.map_err(|error| EntryError {
            error,
            retry_count: retry_count(&retried),
        })
    }

    async fn log_retries(&self, retried: &[String], relation: &str, index: Option<usize>) {
        for (attempt, message) in retried.iter().enumerate() {
            let error = ImportExportError::transient(message.as_str());
            self.tracker
                .log_failure(
                    SOURCE_PERSIST_RETRY,
                    Some(relation),
                    index,
                    &error,
                    retry_count(&retried[..=attempt]),
                    None,
                )
                .await;
        }
    }

    /// Entries under the current name, or under any old name.
    fn entries(&self, reader: &DocumentReader, relation: &str) -> Result<Option<RelationEntries>> {
        if let Some(entries) = reader.relation(relation)? {
            return Ok(Some(entries));
        }
        for alias in self.config.aliases_for(relation) {
            if let Some(entries) = reader.relation(alias)? {
                return Ok(Some(entries));
            }
        }
        Ok(None)
    }

    fn child_value<'r>(&self, raw: &'r Map<String, Value>, relation: &str) -> Option<&'r Value> {
        raw.get(relation).or_else(|| {
            self.config
                .aliases_for(relation)
                .into_iter()
                .find_map(|alias| raw.get(alias))
        })
    }

    /// Users are resolved through the member map, never created.
    fn is_user_relation(&self, node: &RelationNode) -> bool {
        self.config.target_class(&node.name) == USER_CLASS
    }
}

fn transient_message(error: &ImportExportError) -> String {
    match error {
        ImportExportError::TransientPersistence { message, .. } => message.clone(),
        other => other.to_string(),
    }
}

fn retry_count(retried: &[String]) -> u32 {
    u32::try_from(retried.len()).unwrap_or(u32::MAX)
}

fn apply_overrides(
    attributes: &mut Map<String, Value>,
    overrides: &Map<String, Value>,
    permitted: &PermittedAttributes,
) {
    for (key, value) in overrides {
        if !permitted.permits(key) {
            debug!("Ignoring override for non-permitted attribute '{}'", key);
            continue;
        }
        let value = match (key.as_str(), value) {
            (VISIBILITY_LEVEL, Value::String(level)) => match level.trim().parse::<i64>() {
                Ok(level) => Value::from(level),
                Err(_) => {
                    warn!("Ignoring non-numeric visibility override");
                    continue;
                }
            },
            (CLASSIFICATION_LABEL, Value::String(label)) if label.is_empty() => Value::Null,
            _ => value.clone(),
        };
        attributes.insert(key.clone(), value);
    }
}

/// Never more visible than the destination namespace.
fn clamp_visibility(attributes: &mut Map<String, Value>, ceiling: Option<i64>) {
    let Some(ceiling) = ceiling else {
        return;
    };
    if let Some(level) = attributes.get(VISIBILITY_LEVEL).and_then(Value::as_i64)
        && level > ceiling
    {
        attributes.insert(VISIBILITY_LEVEL.to_string(), Value::from(ceiling));
    }
}
