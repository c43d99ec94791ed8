use crate::UserId;

use std::collections::{BTreeSet, HashMap};

/// Exported user id as it appears in the archive.
pub type ExportedUserId = i64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingInvitation {
    pub index: usize,
    pub invite_email: String,
    pub access_level: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    pub index: usize,
    pub user_id: UserId,
    pub access_level: i64,
}

/// Exported user ids resolved to destination users.
///
/// Built once per import job; read-only afterwards.
#[derive(Debug, Clone)]
pub struct MemberMap {
    map: HashMap<ExportedUserId, UserId>,
    importing_user_id: UserId,
    ghost_user_id: Option<UserId>,
    missing_author_ids: BTreeSet<ExportedUserId>,
    pending_invitations: Vec<PendingInvitation>,
    memberships: Vec<Membership>,
}

impl MemberMap {
    pub fn new(importing_user_id: UserId, ghost_user_id: Option<UserId>) -> Self {
        Self {
            map: HashMap::new(),
            importing_user_id,
            ghost_user_id,
            missing_author_ids: BTreeSet::new(),
            pending_invitations: Vec::new(),
            memberships: Vec::new(),
        }
    }

    pub fn insert_resolved(&mut self, exported: ExportedUserId, user_id: UserId) {
        self.missing_author_ids.remove(&exported);
        self.map.insert(exported, user_id);
    }

    /// Default `exported` to the importing user and remember it as missing.
    pub fn insert_missing(&mut self, exported: ExportedUserId) {
        if self.map.contains_key(&exported) {
            return;
        }
        self.map.insert(exported, self.importing_user_id);
        self.missing_author_ids.insert(exported);
    }

    pub fn push_invitation(&mut self, invitation: PendingInvitation) {
        self.pending_invitations.push(invitation);
    }

    pub fn push_membership(&mut self, membership: Membership) {
        self.memberships.push(membership);
    }

    pub fn user_id_for(&self, exported: ExportedUserId) -> UserId {
        self.map
            .get(&exported)
            .copied()
            .unwrap_or(self.importing_user_id)
    }

    /// True when `exported` maps to a real destination user.
    pub fn is_resolved(&self, exported: ExportedUserId) -> bool {
        self.map.contains_key(&exported) && !self.missing_author_ids.contains(&exported)
    }

    pub fn map(&self) -> &HashMap<ExportedUserId, UserId> {
        &self.map
    }

    pub fn importing_user_id(&self) -> UserId {
        self.importing_user_id
    }

    pub fn ghost_user_id(&self) -> Option<UserId> {
        self.ghost_user_id
    }

    pub fn missing_author_ids(&self) -> &BTreeSet<ExportedUserId> {
        &self.missing_author_ids
    }

    pub fn pending_invitations(&self) -> &[PendingInvitation] {
        &self.pending_invitations
    }

    pub fn memberships(&self) -> &[Membership] {
        &self.memberships
    }
}
