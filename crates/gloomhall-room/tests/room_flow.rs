//! System tests driving rooms through their public handles.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};

use gloomhall_catalog::Catalog;
use gloomhall_game::{GameConfig, PacingProfile};
use gloomhall_protocol::{
    ClientIntent, GameMode, GamePhase, PlayerId, RoomCode, ServerNotice,
};
use gloomhall_room::{RoomError, RoomStore};

fn store() -> Arc<RoomStore> {
    RoomStore::new(
        Arc::new(Catalog::builtin()),
        GameConfig {
            pacing: PacingProfile::instant(),
            ..Default::default()
        },
    )
}

fn channel() -> (
    mpsc::UnboundedSender<ServerNotice>,
    mpsc::UnboundedReceiver<ServerNotice>,
) {
    mpsc::unbounded_channel()
}

async fn next_notice(rx: &mut mpsc::UnboundedReceiver<ServerNotice>) -> ServerNotice {
    timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("notice within deadline")
        .expect("notice channel open")
}

async fn wait_for<F>(
    rx: &mut mpsc::UnboundedReceiver<ServerNotice>,
    mut matches: F,
) -> ServerNotice
where
    F: FnMut(&ServerNotice) -> bool,
{
    timeout(Duration::from_secs(5), async {
        loop {
            let notice = rx.recv().await.expect("notice channel open");
            if matches(&notice) {
                return notice;
            }
        }
    })
    .await
    .expect("matching notice within deadline")
}

#[tokio::test]
async fn test_create_room_delivers_roster_and_snapshot() {
    let store = store();
    let (tx, mut rx) = channel();
    let handle = store
        .create_room(PlayerId(1), "Ada".into(), tx)
        .await
        .expect("room created");
    assert_eq!(handle.code().0.len(), RoomCode::LEN);

    let roster = wait_for(&mut rx, |n| {
        matches!(n, ServerNotice::PlayerListUpdate { .. })
    })
    .await;
    if let ServerNotice::PlayerListUpdate { players } = roster {
        assert_eq!(players.len(), 1);
        assert!(players[0].is_host);
    }
    wait_for(&mut rx, |n| matches!(n, ServerNotice::RoomSnapshot { .. })).await;
}

#[tokio::test]
async fn test_second_player_joins_by_code() {
    let store = store();
    let (tx1, mut rx1) = channel();
    let handle = store
        .create_room(PlayerId(1), "Ada".into(), tx1)
        .await
        .expect("room created");

    let (tx2, mut rx2) = channel();
    store
        .join_room(handle.code(), PlayerId(2), "Brendan".into(), tx2)
        .await
        .expect("joined");

    let roster = wait_for(&mut rx1, |n| {
        matches!(n, ServerNotice::PlayerListUpdate { players } if players.len() == 2)
    })
    .await;
    if let ServerNotice::PlayerListUpdate { players } = roster {
        assert!(players.iter().any(|p| p.name == "Brendan"));
    }
    wait_for(&mut rx2, |n| matches!(n, ServerNotice::RoomSnapshot { .. })).await;
}

#[tokio::test]
async fn test_join_unknown_room_fails() {
    let store = store();
    let (tx, _rx) = channel();
    let err = store
        .join_room(&RoomCode::from("ZZZZZ"), PlayerId(1), "Ada".into(), tx)
        .await
        .unwrap_err();
    assert!(matches!(err, RoomError::NotFound(_)));
}

#[tokio::test]
async fn test_player_cannot_sit_in_two_rooms() {
    let store = store();
    let (tx1, _rx1) = channel();
    store
        .create_room(PlayerId(1), "Ada".into(), tx1)
        .await
        .expect("room created");
    let (tx2, _rx2) = channel();
    let err = store
        .create_room(PlayerId(1), "Ada".into(), tx2)
        .await
        .unwrap_err();
    assert!(matches!(err, RoomError::AlreadyInRoom));
}

#[tokio::test]
async fn test_concurrent_creates_mint_distinct_rooms() {
    let store = store();
    let mut creates = Vec::new();
    for i in 1..=32u64 {
        let store = Arc::clone(&store);
        creates.push(tokio::spawn(async move {
            let (tx, rx) = channel();
            let handle = store
                .create_room(PlayerId(i), format!("player-{i}"), tx)
                .await
                .expect("room created");
            (handle.code().clone(), rx)
        }));
    }

    let mut codes = std::collections::HashSet::new();
    let mut receivers = Vec::new();
    for create in creates {
        let (code, rx) = create.await.expect("create task");
        codes.insert(code);
        receivers.push(rx);
    }
    assert_eq!(codes.len(), 32, "every room must get its own code");
    assert_eq!(store.room_count(), 32);
}

#[tokio::test]
async fn test_room_reaped_after_last_human_leaves() {
    let store = store();
    let (tx, _rx) = channel();
    store
        .create_room(PlayerId(1), "Ada".into(), tx)
        .await
        .expect("room created");
    assert_eq!(store.room_count(), 1);

    store.leave_room(PlayerId(1)).await.expect("left");
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while store.room_count() != 0 {
        assert!(
            tokio::time::Instant::now() < deadline,
            "room was not reaped"
        );
        sleep(Duration::from_millis(10)).await;
    }
}

#[tokio::test]
async fn test_game_runs_turns_on_its_own() {
    let store = store();
    let (tx1, mut rx1) = channel();
    let handle = store
        .create_room(PlayerId(1), "Ada".into(), tx1)
        .await
        .expect("room created");
    let (tx2, _rx2) = channel();
    store
        .join_room(handle.code(), PlayerId(2), "Brendan".into(), tx2)
        .await
        .expect("joined");

    let catalog = Catalog::builtin();
    let warrior = catalog.classes()[0].id;
    let mage = catalog.classes()[1].id;
    handle
        .intent(PlayerId(1), ClientIntent::ChooseClass { class_id: warrior })
        .await
        .expect("class");
    handle
        .intent(PlayerId(2), ClientIntent::ChooseClass { class_id: mage })
        .await
        .expect("class");
    handle
        .intent(
            PlayerId(1),
            ClientIntent::StartGame {
                mode: GameMode::Beginner,
            },
        )
        .await
        .expect("start");

    wait_for(&mut rx1, |n| matches!(n, ServerNotice::GameStarted { .. })).await;

    // NPC seats act by themselves; human turns need an explicit end.
    // Keep ending our turns until the keeper has taken a second turn.
    let done = timeout(Duration::from_secs(5), async {
        loop {
            let notice = rx1.recv().await.expect("notice channel open");
            let ServerNotice::RoomSnapshot { snapshot } = notice else {
                continue;
            };
            if snapshot.turns_elapsed >= 2 {
                return snapshot;
            }
            if snapshot.phase == GamePhase::Active {
                if let Some(active) = snapshot.active_player {
                    if active == PlayerId(1) || active == PlayerId(2) {
                        let _ = handle.intent(active, ClientIntent::EndTurn).await;
                    }
                }
            }
        }
    })
    .await
    .expect("turn loop progressed");

    assert_eq!(done.turn_order.len(), 5);
    assert!(done.turns_elapsed >= 2);
}
