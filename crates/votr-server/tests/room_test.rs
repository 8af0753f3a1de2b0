//! Room actor behavior tests
//!
//! Drives a running room through its queues, the same way the gateway and
//! read pumps do, and observes what each member's outbox receives.

use tokio::sync::oneshot;
use votr_core::{Inbound, RoomId, Secret, SessionId, USER_ENTERED, USER_PLACED_VOTE};
use votr_proto::{Message, MessageKind};
use votr_server::{Membership, OWNER_GREETING, Outbox, Room, RoomHandle, session};

const SECRET: &str = "S3cr3t-key";

fn spawn_room(name: &str) -> RoomHandle {
    Room::spawn(RoomId::from(name), Secret::from(SECRET), 16)
}

async fn join(room: &RoomHandle, raw: u64) -> (SessionId, Outbox, Option<Secret>) {
    let id = SessionId::new(raw);
    let (member, outbox) = session::channel(id, 16);
    let (reply, joined) = oneshot::channel();
    room.membership().send(Membership::Join { member, reply }).await.unwrap();
    (id, outbox, joined.await.unwrap())
}

async fn send(room: &RoomHandle, origin: SessionId, message: Message) {
    room.incoming().send(Inbound::new(origin, message)).await.unwrap();
}

/// Owner and guest joined, greeting already consumed.
async fn two_member_room(name: &str) -> (RoomHandle, (SessionId, Outbox), (SessionId, Outbox)) {
    let room = spawn_room(name);
    let (a, mut outbox_a, secret) = join(&room, 1).await;
    let (b, outbox_b, guest_secret) = join(&room, 2).await;

    assert_eq!(secret, Some(Secret::from(SECRET)));
    assert_eq!(guest_secret, None);
    assert_eq!(outbox_a.recv().await.unwrap().value, OWNER_GREETING);

    (room, (a, outbox_a), (b, outbox_b))
}

/// Full round: two votes, owner reveals, votes reset.
#[tokio::test]
async fn vote_and_reveal_round() {
    let (room, (a, mut outbox_a), (b, mut outbox_b)) = two_member_room("round").await;

    send(&room, a, Message::vote("5")).await;
    for outbox in [&mut outbox_a, &mut outbox_b] {
        let msg = outbox.recv().await.unwrap();
        assert_eq!(msg.kind, MessageKind::Status);
        assert_eq!(msg.value, USER_PLACED_VOTE);
        assert_eq!((msg.user_count, msg.vote_count), (2, 1));
    }

    send(&room, b, Message::vote("5")).await;
    for outbox in [&mut outbox_a, &mut outbox_b] {
        assert_eq!(outbox.recv().await.unwrap().vote_count, 2);
    }

    send(&room, a, Message::reveal("").with_secret(SECRET)).await;
    for outbox in [&mut outbox_a, &mut outbox_b] {
        let msg = outbox.recv().await.unwrap();
        assert_eq!(msg.kind, MessageKind::Reveal);
        assert_eq!(msg.value, "5, 5");
        assert_eq!((msg.user_count, msg.vote_count), (2, 0));
        assert_eq!(msg.secret, None);
    }

    // New round: voting again counts from zero.
    send(&room, b, Message::vote("8")).await;
    assert_eq!(outbox_a.recv().await.unwrap().vote_count, 1);
}

/// A rejected message broadcasts nothing; the next accepted one is the
/// first thing members see.
#[tokio::test]
async fn rejected_messages_are_not_broadcast() {
    let (room, (a, mut outbox_a), (b, mut outbox_b)) = two_member_room("rejects").await;

    send(&room, a, Message::vote("5")).await;
    send(&room, b, Message::vote("3")).await;
    for outbox in [&mut outbox_a, &mut outbox_b] {
        outbox.recv().await.unwrap();
        outbox.recv().await.unwrap();
    }

    // Wrong secret, missing secret, guest with no secret.
    send(&room, a, Message::reveal("").with_secret("guess")).await;
    send(&room, a, Message::reveal("")).await;
    send(&room, b, Message::reveal("")).await;
    // Not a vote value, repeated vote, ignore kind, unknown kind.
    send(&room, a, Message::vote("4")).await;
    send(&room, a, Message::vote("5")).await;
    send(&room, a, Message::ignore()).await;
    send(&room, a, Message::new(MessageKind::Unknown(42), "x")).await;

    send(&room, b, Message::status("marker")).await;

    for outbox in [&mut outbox_a, &mut outbox_b] {
        let msg = outbox.recv().await.unwrap();
        assert_eq!(msg.value, "marker");
        // Votes survived every rejected message.
        assert_eq!(msg.vote_count, 2);
    }
}

#[tokio::test]
async fn reveal_before_everyone_voted_is_rejected() {
    let (room, (a, mut outbox_a), _guest) = two_member_room("early").await;

    send(&room, a, Message::vote("2")).await;
    assert_eq!(outbox_a.recv().await.unwrap().vote_count, 1);

    send(&room, a, Message::reveal("").with_secret(SECRET)).await;
    send(&room, a, Message::status("marker")).await;

    let msg = outbox_a.recv().await.unwrap();
    assert_eq!(msg.value, "marker");
    assert_eq!(msg.vote_count, 1);
}

/// Votes from different members racing into one room are all counted.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_votes_are_serialized() {
    let (room, (a, mut outbox_a), (b, _outbox_b)) = two_member_room("race").await;

    let first = room.incoming().clone();
    let second = room.incoming().clone();
    let (r1, r2) = tokio::join!(
        tokio::spawn(async move { first.send(Inbound::new(a, Message::vote("1"))).await }),
        tokio::spawn(async move { second.send(Inbound::new(b, Message::vote("2"))).await }),
    );
    r1.unwrap().unwrap();
    r2.unwrap().unwrap();

    let first_count = outbox_a.recv().await.unwrap().vote_count;
    let second_count = outbox_a.recv().await.unwrap().vote_count;
    assert_eq!([first_count, second_count], [1, 2]);
}

#[tokio::test]
async fn status_is_relayed_without_secret() {
    let (room, (a, mut outbox_a), (_, mut outbox_b)) = two_member_room("status").await;

    send(&room, a, Message::status(USER_ENTERED).with_secret(SECRET)).await;

    for outbox in [&mut outbox_a, &mut outbox_b] {
        let msg = outbox.recv().await.unwrap();
        assert_eq!(msg.value, USER_ENTERED);
        assert_eq!(msg.secret, None);
        assert_eq!(msg.user_count, 2);
    }
}

/// Leaving produces no broadcast, and a room emptied of members hands its
/// secret to the next member that joins.
#[tokio::test]
async fn leave_is_silent_and_empty_room_gets_new_owner() {
    let (room, (a, mut outbox_a), (b, mut outbox_b)) = two_member_room("leave").await;

    room.membership().send(Membership::Leave(a)).await.unwrap();
    assert!(outbox_a.recv().await.is_none());

    send(&room, b, Message::status("still here")).await;
    let msg = outbox_b.recv().await.unwrap();
    assert_eq!(msg.value, "still here");
    assert_eq!(msg.user_count, 1);

    room.membership().send(Membership::Leave(b)).await.unwrap();
    assert!(outbox_b.recv().await.is_none());
    assert!(!room.is_closed());

    let (_, mut outbox_c, secret) = join(&room, 3).await;
    assert_eq!(secret, Some(Secret::from(SECRET)));
    let greeting = outbox_c.recv().await.unwrap();
    assert_eq!(greeting.secret.as_deref(), Some(SECRET));
}

#[tokio::test]
async fn leaving_voter_no_longer_blocks_reveal() {
    let (room, (a, mut outbox_a), (b, _outbox_b)) = two_member_room("quitter").await;

    send(&room, a, Message::vote("0")).await;
    assert_eq!(outbox_a.recv().await.unwrap().vote_count, 1);

    room.membership().send(Membership::Leave(b)).await.unwrap();
    send(&room, a, Message::reveal("").with_secret(SECRET)).await;

    let msg = outbox_a.recv().await.unwrap();
    assert_eq!(msg.kind, MessageKind::Reveal);
    assert_eq!(msg.value, "0");
    assert_eq!(msg.user_count, 1);
}

/// A vote queued before its sender's leave is still counted and broadcast.
#[tokio::test]
async fn queued_messages_are_handled_before_leave() {
    let (room, (a, _outbox_a), (b, mut outbox_b)) = two_member_room("drain").await;

    send(&room, a, Message::vote("5")).await;
    room.membership().send(Membership::Leave(a)).await.unwrap();
    send(&room, b, Message::status("marker")).await;

    let placed = outbox_b.recv().await.unwrap();
    assert_eq!(placed.value, USER_PLACED_VOTE);
    assert_eq!((placed.user_count, placed.vote_count), (2, 1));

    let marker = outbox_b.recv().await.unwrap();
    assert_eq!(marker.value, "marker");
    assert_eq!((marker.user_count, marker.vote_count), (1, 0));
}
