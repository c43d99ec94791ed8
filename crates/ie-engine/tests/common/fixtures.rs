use super::memory::{MemoryFailures, MemoryProgress, MemoryStore, MemoryUsers};

use ie_config::RetryConfig;
use ie_core::{
    FailureLog, JobContext, ObjectStore, ProgressStore, Record, RelationConfig, TargetRoot, User,
    UserDirectory,
};
use ie_engine::{
    DocumentWriter, ExportCounts, JsonWriter, MethodRegistry, NdjsonWriter, ProgressTracker,
    TreeRestorer, TreeSerializer,
};

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde_json::{Value, json};

pub const IMPORTER_ID: i64 = 1;
pub const ALICE_ID: i64 = 100;
pub const BOB_ID: i64 = 101;
pub const GHOST_ID: i64 = 99;

pub fn user(id: i64, username: &str, email: &str, name: &str) -> User {
    User {
        id,
        username: username.to_string(),
        email: email.to_string(),
        name: name.to_string(),
    }
}

pub fn importer() -> User {
    user(IMPORTER_ID, "importer", "importer@example.com", "Importer")
}

pub fn fast_retry() -> RetryConfig {
    RetryConfig {
        max_attempts: 3,
        initial_delay_ms: 10,
        jitter: false,
        ..RetryConfig::default()
    }
}

/// Ids of the interesting records in the seeded source project.
pub struct SourceProject {
    pub root: Record,
    pub bug_label: Record,
    pub crash_issue: Record,
    pub merge_request: Record,
}

/// One store plus the ports an import needs, wired to the bundled tree.
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub users: Arc<MemoryUsers>,
    pub progress: Arc<MemoryProgress>,
    pub failures: Arc<MemoryFailures>,
    pub config: Arc<RelationConfig>,
}

impl Harness {
    pub fn new() -> Self {
        let alice = user(ALICE_ID, "alice", "alice@example.com", "Alice");
        let bob = user(BOB_ID, "bob", "bob@example.com", "Bob");
        let ghost = user(GHOST_ID, "ghost", "ghost@example.com", "Ghost User");

        let store = MemoryStore::new();
        store.add_user(alice.clone());
        store.add_user(bob.clone());
        store.add_user(importer());

        Self {
            store: Arc::new(store),
            users: Arc::new(MemoryUsers {
                users: vec![alice, bob, importer()],
                ghost: Some(ghost),
            }),
            progress: Arc::new(MemoryProgress::default()),
            failures: Arc::new(MemoryFailures::default()),
            config: Arc::new(RelationConfig::default_project().unwrap()),
        }
    }

    /// Same store and users, restoring through the bundled group tree.
    pub fn for_group() -> Self {
        Self {
            config: Arc::new(RelationConfig::default_group().unwrap()),
            ..Self::new()
        }
    }

    /// Same store, but only `users` exist on the destination instance.
    pub fn with_destination_users(mut self, users: Vec<User>) -> Self {
        let ghost = self.users.ghost.clone();
        self.users = Arc::new(MemoryUsers { users, ghost });
        self
    }

    pub fn object_store(&self) -> Arc<dyn ObjectStore> {
        self.store.clone()
    }

    pub fn user_directory(&self) -> Arc<dyn UserDirectory> {
        self.users.clone()
    }

    pub fn progress_store(&self) -> Arc<dyn ProgressStore> {
        self.progress.clone()
    }

    pub fn failure_log(&self) -> Arc<dyn FailureLog> {
        self.failures.clone()
    }

    /// An empty destination project and a job importing into it.
    pub fn destination(&self, namespace_visibility: Option<i64>) -> (Record, JobContext) {
        let root = self
            .store
            .seed_root("Project", json!({"name": "Destination", "path": "destination"}));
        let target = TargetRoot {
            id: root.id.unwrap(),
            class: "Project".to_string(),
            namespace_id: Some(7),
            namespace_visibility,
        };
        (root, JobContext::new(importer(), target))
    }

    /// An empty destination group, a top-level namespace of its own.
    pub fn group_destination(&self) -> (Record, JobContext) {
        let root = self
            .store
            .seed_root("Group", json!({"name": "Destination", "path": "destination"}));
        let target = TargetRoot {
            id: root.id.unwrap(),
            class: "Group".to_string(),
            namespace_id: None,
            namespace_visibility: None,
        };
        (root, JobContext::new(importer(), target))
    }

    pub fn restorer(&self, ctx: &JobContext) -> TreeRestorer {
        let tracker = ProgressTracker::new(self.progress_store(), self.failure_log(), ctx);
        TreeRestorer::new(
            self.object_store(),
            self.user_directory(),
            Arc::clone(&self.config),
            tracker,
            fast_retry(),
        )
    }

    pub fn serializer(&self, batch_size: usize) -> TreeSerializer {
        TreeSerializer::new(
            self.object_store(),
            Arc::clone(&self.config),
            MethodRegistry::with_defaults(),
            batch_size,
        )
        .unwrap()
    }

    pub async fn export_to(&self, root: &Record, dir: &Path, ndjson: bool) -> ExportCounts {
        let mut writer: Box<dyn DocumentWriter> = if ndjson {
            Box::new(NdjsonWriter::new(dir.to_path_buf(), "project"))
        } else {
            Box::new(JsonWriter::new(dir.to_path_buf(), "project"))
        };
        self.serializer(2)
            .serialize(root, writer.as_mut())
            .await
            .unwrap()
    }

    /// A small but complete project owned by alice.
    pub fn seed_source_project(&self) -> SourceProject {
        let store = &self.store;
        let root = store.seed_root(
            "Project",
            json!({
                "name": "Source",
                "path": "source-project",
                "description": "Tracker for the source team",
                "visibility_level": 20,
                "runners_token": "source-runners-token",
            }),
        );
        let root_id = root.id.unwrap();

        let bug_label = store.seed_child(
            &root,
            "labels",
            "ProjectLabel",
            json!({"title": "bug", "color": "#ff0000", "project_id": root_id}),
        );
        let feature_label = store.seed_child(
            &root,
            "labels",
            "ProjectLabel",
            json!({"title": "feature", "color": "#00ff00", "project_id": root_id}),
        );
        let milestone = store.seed_child(
            &root,
            "milestones",
            "Milestone",
            json!({"title": "v1", "project_id": root_id}),
        );

        store.seed_child(
            &root,
            "project_members",
            "ProjectMember",
            json!({"user_id": ALICE_ID, "access_level": 40}),
        );
        store.seed_child(
            &root,
            "project_members",
            "ProjectMember",
            json!({"user_id": BOB_ID, "access_level": 30}),
        );

        let crash_issue = store.seed_child(
            &root,
            "issues",
            "Issue",
            json!({
                "iid": 1,
                "title": "Crash on start",
                "project_id": root_id,
                "author_id": ALICE_ID,
                "milestone_id": milestone.id.unwrap(),
                "description_html": "<p>cached</p>",
            }),
        );
        store.seed_child(
            &crash_issue,
            "notes",
            "Note",
            json!({"note": "Confirmed", "author_id": ALICE_ID, "created_at": "2024-03-01T10:00:00Z"}),
        );
        store.seed_child(
            &crash_issue,
            "notes",
            "Note",
            json!({"note": "Me too", "author_id": 555, "created_at": "2024-03-02T10:00:00Z"}),
        );
        store.seed_child(
            &crash_issue,
            "label_links",
            "LabelLink",
            json!({"label_id": bug_label.id.unwrap()}),
        );

        let feature_issue = store.seed_child(
            &root,
            "issues",
            "Issue",
            json!({"iid": 2, "title": "Dark mode", "project_id": root_id, "author_id": BOB_ID}),
        );
        store.seed_child(
            &feature_issue,
            "label_links",
            "LabelLink",
            json!({"label_id": feature_label.id.unwrap()}),
        );
        store.seed_child(
            &feature_issue,
            "label_links",
            "LabelLink",
            json!({"label_id": bug_label.id.unwrap()}),
        );

        let merge_request = store.seed_child(
            &root,
            "merge_requests",
            "MergeRequest",
            json!({
                "iid": 1,
                "title": "Fix crash",
                "source_project_id": root_id,
                "target_project_id": root_id,
                "author_id": ALICE_ID,
                "merge_when_pipeline_succeeds": true,
            }),
        );
        let diff = store.seed_child(
            &merge_request,
            "merge_request_diff",
            "MergeRequestDiff",
            json!({"state": "collected", "st_diffs": "diff --git"}),
        );
        store.seed_child(
            &diff,
            "merge_request_diff_files",
            "MergeRequestDiffFile",
            json!({"new_path": "src/main.rs", "diff": "+fn main() {}"}),
        );
        store.set_attribute(
            merge_request.id.unwrap(),
            "latest_merge_request_diff_id",
            json!(diff.id.unwrap()),
        );

        store.seed_child(
            &root,
            "triggers",
            "Ci::Trigger",
            json!({"description": "deploy", "token": "source-trigger-token", "owner_id": ALICE_ID}),
        );
        store.seed_child(
            &root,
            "project_feature",
            "ProjectFeature",
            json!({"issues_access_level": 20, "wiki_access_level": 0}),
        );

        SourceProject {
            root,
            bug_label,
            crash_issue,
            merge_request,
        }
    }
}

/// Write an NDJSON document by hand: a root object plus relation files.
pub fn write_ndjson_document(dir: &Path, root: Value, relations: &[(&str, &[&str])]) {
    write_ndjson_tree(dir, "project", root, relations);
}

pub fn write_ndjson_tree(dir: &Path, root_name: &str, root: Value, relations: &[(&str, &[&str])]) {
    let tree = dir.join("tree");
    fs::create_dir_all(tree.join(root_name)).unwrap();
    fs::write(tree.join(format!("{}.json", root_name)), root.to_string()).unwrap();
    for (relation, lines) in relations {
        let mut body = lines.join("\n");
        body.push('\n');
        fs::write(tree.join(root_name).join(format!("{}.ndjson", relation)), body).unwrap();
    }
}

pub fn titles(records: &[Record]) -> Vec<String> {
    let mut titles: Vec<String> = records
        .iter()
        .filter_map(|r| r.attribute_str("title").map(str::to_string))
        .collect();
    titles.sort();
    titles
}
