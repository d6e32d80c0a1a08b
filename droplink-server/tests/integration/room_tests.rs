use crate::integration::init_tracing;
use crate::utils::{TestClient, create_test_router};
use droplink_core::{ClientEnvelope, RoomId, ServerEnvelope};

#[test]
fn create_then_join_round_trip() {
    init_tracing();
    let router = create_test_router();

    let mut host = TestClient::connect(&router);
    let room_id = host.create_room("Music Lounge", "Music", false);
    let host_id = host.join(room_id, "host");

    let mut guest = TestClient::connect(&router);
    let guest_id = guest.join(room_id, "guest");
    assert_ne!(host_id, guest_id);

    // Only the prior member hears about the newcomer.
    match host.recv() {
        ServerEnvelope::NewMember { user_id, user_name } => {
            assert_eq!(user_id, guest_id);
            assert_eq!(user_name, "guest");
        }
        other => panic!("expected new-member, got {other:?}"),
    }
    assert!(guest.try_recv().is_none(), "newcomer must not see its own join");
}

#[test]
fn join_unknown_room_reports_not_found() {
    init_tracing();
    let router = create_test_router();

    let mut client = TestClient::connect(&router);
    let message = client.join_expecting_error(RoomId::new(), "lost");
    assert_eq!(message, "Room not found");
}

#[test]
fn sixth_join_reports_room_full() {
    init_tracing();
    let router = create_test_router();

    let mut host = TestClient::connect(&router);
    let room_id = host.create_room("packed", "General", true);

    let mut members: Vec<TestClient> = Vec::new();
    for i in 0..5 {
        let mut member = TestClient::connect(&router);
        member.join(room_id, &format!("member-{i}"));
        members.push(member);
    }

    let mut late = TestClient::connect(&router);
    assert_eq!(late.join_expecting_error(room_id, "late"), "Room is full");
}

#[test]
fn new_member_fans_out_to_all_prior_members() {
    init_tracing();
    let router = create_test_router();

    let mut host = TestClient::connect(&router);
    let room_id = host.create_room("mesh", "General", true);
    host.join(room_id, "a");

    let mut second = TestClient::connect(&router);
    second.join(room_id, "b");

    let mut third = TestClient::connect(&router);
    let third_id = third.join(room_id, "c");

    // First joiner saw b and c, second joiner saw only c.
    let host_joins = host.drain();
    assert_eq!(host_joins.len(), 2);
    let second_joins = second.drain();
    assert_eq!(second_joins.len(), 1);
    assert!(matches!(
        &second_joins[0],
        ServerEnvelope::NewMember { user_id, .. } if *user_id == third_id
    ));
    assert!(third.try_recv().is_none());
}

#[test]
fn last_member_leaving_deletes_the_room() {
    init_tracing();
    let router = create_test_router();

    let mut host = TestClient::connect(&router);
    let room_id = host.create_room("ephemeral", "General", true);
    host.join(room_id, "solo");
    host.disconnect();

    let mut next = TestClient::connect(&router);
    assert_eq!(
        next.join_expecting_error(room_id, "too late"),
        "Room not found"
    );
}

#[test]
fn disconnect_notifies_remaining_members_once() {
    init_tracing();
    let router = create_test_router();

    let mut host = TestClient::connect(&router);
    let room_id = host.create_room("steady", "General", true);
    host.join(room_id, "stayer");

    let mut leaver = TestClient::connect(&router);
    let leaver_id = leaver.join(room_id, "leaver");
    host.drain();

    // Close and an explicit leave racing: cleanup must run exactly once.
    leaver.disconnect();
    leaver.disconnect();

    let notices = host.drain();
    assert_eq!(notices.len(), 1);
    assert!(matches!(
        &notices[0],
        ServerEnvelope::MemberLeft { user_id } if *user_id == leaver_id
    ));
}

#[test]
fn public_room_search_matches_case_insensitively() {
    init_tracing();
    let router = create_test_router();

    let mut host = TestClient::connect(&router);
    host.create_room("Music Lounge", "Music", false);
    host.create_room("Documents", "Documents", false);
    host.create_room("Muse Hall", "Music", true); // private, never listed

    host.send(ClientEnvelope::ListPublicRooms { query: "mus".into() });
    match host.recv() {
        ServerEnvelope::PublicRoomsList { rooms } => {
            assert_eq!(rooms.len(), 1);
            assert_eq!(rooms[0].room_name, "Music Lounge");
        }
        other => panic!("expected public-rooms-list, got {other:?}"),
    }

    host.send(ClientEnvelope::ListPublicRooms { query: String::new() });
    match host.recv() {
        ServerEnvelope::PublicRoomsList { rooms } => assert_eq!(rooms.len(), 2),
        other => panic!("expected public-rooms-list, got {other:?}"),
    }
}
