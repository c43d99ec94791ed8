use ie_core::{
    AttributesPermitter, ImportExportError, JobContext, MemberMap, RelationConfig,
    RelationRecord, Result,
};

use std::sync::Arc;

use rand::Rng;
use rand::distr::Alphanumeric;
use serde_json::{Map, Value};

/// References to the exported root, rewritten to the destination root.
const PROJECT_REFERENCES: [&str; 2] = ["project_id", "target_project_id"];
const SOURCE_PROJECT_REFERENCE: &str = "source_project_id";
/// References to the exported namespace, rewritten to the destination namespace.
const NAMESPACE_REFERENCES: [&str; 2] = ["group_id", "namespace_id"];
/// Under a group root this points at the destination group itself.
const GROUP_REFERENCE: &str = "group_id";
const GROUP_CLASS: &str = "Group";
/// User references remapped through the member map.
const USER_REFERENCES: [&str; 11] = [
    "author_id",
    "user_id",
    "assignee_id",
    "updated_by_id",
    "last_edited_by_id",
    "merged_by_id",
    "merge_user_id",
    "closed_by_id",
    "resolved_by_id",
    "owner_id",
    "created_by_id",
];
/// Null here means "deleted user" and maps to the ghost account.
const GHOST_REFERENCE: &str = "author_id";

const CACHED_MARKDOWN_VERSION: &str = "cached_markdown_version";
const AUTO_MERGE: &str = "merge_when_pipeline_succeeds";
const CI_STATUS_RELATIONS: [&str; 3] = ["ci_pipelines", "stages", "builds"];
const CANCELABLE_STATUSES: [&str; 6] = [
    "created",
    "pending",
    "running",
    "preparing",
    "waiting_for_resource",
    "scheduled",
];
const CANCELED: &str = "canceled";

const NOTES_RELATION: &str = "notes";
const DEFAULT_SOURCE_NAME: &str = "GitLab";
const TOKEN_LENGTH: usize = 20;

/// Builds persistable records from raw document entries.
///
/// Identifiers from the source environment never survive: `id` and
/// unmapped `*_id` keys are dropped, root and namespace references point
/// at the destination, user references go through the member map.
pub struct RelationFactory {
    config: Arc<RelationConfig>,
    permitter: Arc<AttributesPermitter>,
}

impl RelationFactory {
    pub fn new(config: Arc<RelationConfig>, permitter: Arc<AttributesPermitter>) -> Self {
        Self { config, permitter }
    }

    pub fn create(
        &self,
        relation: &str,
        raw: &Map<String, Value>,
        members: &MemberMap,
        ctx: &JobContext,
    ) -> Result<RelationRecord> {
        if !self.permitter.permitted_attributes_defined(relation) {
            return Err(ImportExportError::unknown_relation(relation));
        }
        let relation = self.config.canonical_name(relation);
        let permitted = self.permitter.permit(relation, raw);
        let group_root = ctx.target.class == GROUP_CLASS;
        let mut attributes = Map::new();

        for (key, value) in permitted {
            if is_source_only(&key) {
                continue;
            }
            if let Some(mapped) = remap(&key, value, raw, members, ctx, group_root) {
                attributes.insert(key, mapped);
            }
        }

        for token in self.config.regenerate_tokens(relation) {
            if raw.contains_key(token) {
                attributes.insert(token.clone(), Value::String(random_token()));
            }
        }

        if attributes.contains_key(AUTO_MERGE) {
            attributes.insert(AUTO_MERGE.to_string(), Value::Bool(false));
        }

        if CI_STATUS_RELATIONS.contains(&relation)
            && let Some(Value::String(status)) = attributes.get("status")
            && CANCELABLE_STATUSES.contains(&status.as_str())
        {
            attributes.insert("status".to_string(), Value::String(CANCELED.to_string()));
        }

        if relation == NOTES_RELATION {
            append_missing_author_note(&mut attributes, raw, members, ctx);
        }

        Ok(RelationRecord {
            relation_name: relation.to_string(),
            attributes,
            target_class: self.config.target_class(relation),
        })
    }
}

/// None drops the attribute.
fn remap(
    key: &str,
    value: Value,
    raw: &Map<String, Value>,
    members: &MemberMap,
    ctx: &JobContext,
    group_root: bool,
) -> Option<Value> {
    let root_id = ctx.target.id;
    if PROJECT_REFERENCES.contains(&key) {
        return Some(Value::from(root_id));
    }
    if key == SOURCE_PROJECT_REFERENCE {
        let same_project = !value.is_null() && raw.get("target_project_id") == Some(&value);
        return Some(if same_project {
            Value::from(root_id)
        } else {
            Value::Null
        });
    }
    if group_root && key == GROUP_REFERENCE {
        return Some(Value::from(root_id));
    }
    if NAMESPACE_REFERENCES.contains(&key) {
        return ctx.target.namespace_id.map(Value::from);
    }
    if USER_REFERENCES.contains(&key) {
        return Some(match value {
            Value::Null if key == GHOST_REFERENCE => members
                .ghost_user_id()
                .map(Value::from)
                .unwrap_or(Value::Null),
            Value::Null => Value::Null,
            other => match other.as_i64() {
                Some(exported) => Value::from(members.user_id_for(exported)),
                None => Value::from(members.importing_user_id()),
            },
        });
    }
    if key.ends_with("_id") {
        return None;
    }
    Some(value)
}

/// Attributes that never travel: ids, render caches, encrypted columns.
pub(crate) fn is_source_only(key: &str) -> bool {
    key == "id" || is_render_cache(key) || is_encrypted(key)
}

fn is_render_cache(key: &str) -> bool {
    key.ends_with("_html") || key == CACHED_MARKDOWN_VERSION
}

fn is_encrypted(key: &str) -> bool {
    key.starts_with("encrypted_") || key.ends_with("_iv")
}

fn random_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// `\n\n *By {name} on {created_at} (imported from {source})*`
fn append_missing_author_note(
    attributes: &mut Map<String, Value>,
    raw: &Map<String, Value>,
    members: &MemberMap,
    ctx: &JobContext,
) {
    let Some(author_id) = raw.get(GHOST_REFERENCE).and_then(Value::as_i64) else {
        return;
    };
    if members.is_resolved(author_id) {
        return;
    }

    let name = raw
        .get("author")
        .and_then(|author| author.get("name"))
        .and_then(Value::as_str)
        .unwrap_or("Unknown User");
    let created_at = raw
        .get("created_at")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let source = ctx
        .options
        .source_name
        .as_deref()
        .unwrap_or(DEFAULT_SOURCE_NAME);
    let note = attributes
        .get("note")
        .and_then(Value::as_str)
        .unwrap_or_default();

    let annotated = format!(
        "{}\n\n *By {} on {} (imported from {})*",
        note, name, created_at, source
    );
    attributes.insert("note".to_string(), Value::String(annotated));
}
