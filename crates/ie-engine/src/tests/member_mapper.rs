use super::{StaticUsers, target, user};
use crate::member_mapper::MemberMapper;

use googletest::assert_that;
use googletest::prelude::eq;
use serde_json::{Value, json};

fn directory() -> StaticUsers {
    StaticUsers {
        users: vec![
            user(100, "alice", "alice@example.com"),
            user(101, "bob", "bob@dest.example.com"),
        ],
        ghost: Some(user(99, "ghost", "ghost@example.com")),
    }
}

fn exported() -> Vec<Value> {
    vec![
        json!({"access_level": 40, "user": {"id": 10, "email": "alice@example.com", "username": "alice-src"}}),
        json!({"access_level": 30, "user": {"id": 11, "email": "bob@src.example.com", "username": "bob"}}),
        json!({"access_level": 20, "user": {"id": 12, "email": "carol@src.example.com", "username": "carol"}}),
        json!({"access_level": 30, "user_id": null, "invite_email": "dave@example.com"}),
    ]
}

#[tokio::test]
async fn given_exported_members_when_build_then_resolved_by_email_then_username() {
    // Given
    let importer = user(1, "importer", "importer@example.com");

    // When
    let map = MemberMapper::build(&exported(), &importer, &target(500), &directory())
        .await
        .unwrap();

    // Then
    assert_that!(map.user_id_for(10), eq(100));
    assert_that!(map.user_id_for(11), eq(101));
    assert_that!(map.user_id_for(12), eq(1));
    assert_that!(map.is_resolved(12), eq(false));
    assert_that!(map.ghost_user_id(), eq(Some(99)));
}

#[tokio::test]
async fn given_missing_user_when_build_then_recorded_as_missing_author() {
    // Given
    let importer = user(1, "importer", "importer@example.com");

    // When
    let map = MemberMapper::build(&exported(), &importer, &target(500), &directory())
        .await
        .unwrap();

    // Then
    assert_that!(map.missing_author_ids().len(), eq(1));
    assert_that!(map.missing_author_ids().contains(&12), eq(true));
    assert_that!(map.memberships().len(), eq(2));
    assert_that!(map.memberships()[0].access_level, eq(40));
}

#[tokio::test]
async fn given_invite_only_member_when_build_then_pending_invitation() {
    // Given
    let importer = user(1, "importer", "importer@example.com");

    // When
    let map = MemberMapper::build(&exported(), &importer, &target(500), &directory())
        .await
        .unwrap();

    // Then
    let invitations = map.pending_invitations();
    assert_that!(invitations.len(), eq(1));
    assert_that!(invitations[0].invite_email, eq("dave@example.com"));
    assert_that!(invitations[0].index, eq(3));
}

#[tokio::test]
async fn given_no_exported_members_when_build_then_everyone_maps_to_importer() {
    // Given
    let importer = user(1, "importer", "importer@example.com");

    // When
    let map = MemberMapper::build(&[], &importer, &target(500), &directory())
        .await
        .unwrap();

    // Then
    assert_that!(map.user_id_for(10), eq(1));
    assert_that!(map.memberships().len(), eq(0));
}
