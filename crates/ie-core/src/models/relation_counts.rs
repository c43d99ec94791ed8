use serde::Serialize;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RelationCounts {
    pub created: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl RelationCounts {
    pub fn total(&self) -> usize {
        self.created + self.skipped + self.failed
    }
}
