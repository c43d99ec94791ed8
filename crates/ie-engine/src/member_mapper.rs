use ie_core::{
    MemberMap, Membership, PendingInvitation, Result, TargetRoot, User, UserDirectory,
};

use log::{debug, info};
use serde_json::Value;

/// Default access level when an exported member carries none (developer).
const DEFAULT_ACCESS_LEVEL: i64 = 30;

/// Resolves exported members against the destination user directory.
pub struct MemberMapper;

impl MemberMapper {
    /// One pass over `exported_members`: email first, then username.
    ///
    /// Unresolvable users fall back to `importing_user` and are recorded as
    /// missing. Members with only an `invite_email` stay pending invitations.
    pub async fn build(
        exported_members: &[Value],
        importing_user: &User,
        destination_scope: &TargetRoot,
        users: &dyn UserDirectory,
    ) -> Result<MemberMap> {
        let ghost = users.ghost_user().await?;
        let mut map = MemberMap::new(importing_user.id, ghost.map(|user| user.id));

        for (index, member) in exported_members.iter().enumerate() {
            let access_level = member
                .get("access_level")
                .and_then(Value::as_i64)
                .unwrap_or(DEFAULT_ACCESS_LEVEL);
            let user = member.get("user").filter(|user| user.is_object());

            let Some(user) = user else {
                match member.get("invite_email").and_then(Value::as_str) {
                    Some(email) if !email.is_empty() => map.push_invitation(PendingInvitation {
                        index,
                        invite_email: email.to_string(),
                        access_level,
                    }),
                    _ => debug!("Exported member {} has neither user nor invite", index),
                }
                continue;
            };

            let Some(exported_id) = user
                .get("id")
                .and_then(Value::as_i64)
                .or_else(|| member.get("user_id").and_then(Value::as_i64))
            else {
                debug!("Exported member {} has no user id", index);
                continue;
            };

            match resolve(user, users).await? {
                Some(found) => {
                    map.insert_resolved(exported_id, found.id);
                    map.push_membership(Membership {
                        index,
                        user_id: found.id,
                        access_level,
                    });
                }
                None => map.insert_missing(exported_id),
            }
        }

        info!(
            "Mapped {} exported members into {} {}: {} missing, {} pending invitations",
            exported_members.len(),
            destination_scope.class,
            destination_scope.id,
            map.missing_author_ids().len(),
            map.pending_invitations().len()
        );
        Ok(map)
    }
}

async fn resolve(user: &Value, users: &dyn UserDirectory) -> Result<Option<User>> {
    if let Some(email) = user.get("email").and_then(Value::as_str)
        && let Some(found) = users.find_user_by_email(email).await?
    {
        return Ok(Some(found));
    }
    if let Some(username) = user.get("username").and_then(Value::as_str)
        && let Some(found) = users.find_user_by_username(username).await?
    {
        return Ok(Some(found));
    }
    Ok(None)
}
