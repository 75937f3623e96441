//! Integration tests for command dispatch and frame handling.

use avalon::prelude::*;

// =========================================================================
// Helpers
// =========================================================================

fn conn(name: &str) -> ConnectionHandle {
    ConnectionHandle::new(format!("{name}-conn"))
}

fn server() -> GameServer {
    GameServer::builder()
        .config(GameConfig {
            rng_seed: Some(99),
            ..GameConfig::default()
        })
        .build()
}

const NAMES: [&str; 5] = ["alice", "bob", "carol", "dave", "erin"];

/// Creates a game hosted by alice with all five players seated.
async fn seated_game(server: &GameServer) -> GameId {
    let created = server
        .dispatch(
            &conn("alice"),
            ClientCommand::CreateGame {
                username: "alice".into(),
            },
        )
        .await
        .unwrap();
    let game_id = created.game_id;
    for name in &NAMES[1..] {
        server
            .dispatch(
                &conn(name),
                ClientCommand::JoinGame {
                    game_id,
                    username: (*name).into(),
                },
            )
            .await
            .unwrap();
    }
    game_id
}

fn decode_server(bytes: &[u8]) -> ServerMessage {
    JsonCodec.decode(bytes).unwrap()
}

fn decode_state(msg: &ServerMessage) -> StateUpdate {
    match msg {
        ServerMessage::State { data, .. } => JsonCodec.decode(data).unwrap(),
        other => panic!("expected State, got {other:?}"),
    }
}

fn frame(cmd: &ClientCommand) -> Vec<u8> {
    JsonCodec.encode(cmd).unwrap()
}

// =========================================================================
// dispatch
// =========================================================================

#[tokio::test]
async fn test_create_game_seats_host() {
    let server = server();
    let created = server
        .dispatch(
            &conn("alice"),
            ClientCommand::CreateGame {
                username: "alice".into(),
            },
        )
        .await
        .unwrap();

    assert_eq!(created.snapshot.phase, Phase::Lobby);
    assert_eq!(created.snapshot.host.as_deref(), Some("alice"));
    assert_eq!(created.members, vec![conn("alice")]);
    assert_eq!(created.membership, Some(Membership::Joined(conn("alice"))));
    assert_eq!(server.game_count().await, 1);
}

#[tokio::test]
async fn test_join_unknown_game() {
    let server = server();
    let err = server
        .dispatch(
            &conn("bob"),
            ClientCommand::JoinGame {
                game_id: GameId(42),
                username: "bob".into(),
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AvalonError::Game(GameError::GameNotFound(_))));
    assert_eq!(err.code(), 404);
}

#[tokio::test]
async fn test_full_round_through_dispatch() {
    let server = server();
    let game_id = seated_game(&server).await;

    let started = server
        .dispatch(&conn("alice"), ClientCommand::StartGame { game_id })
        .await
        .unwrap();
    assert_eq!(started.snapshot.phase, Phase::TeamBuilding);
    let leader = conn(started.snapshot.leader.as_deref().unwrap());

    for name in ["alice", "bob"] {
        server
            .dispatch(
                &leader,
                ClientCommand::ToggleTeam {
                    game_id,
                    username: name.into(),
                },
            )
            .await
            .unwrap();
    }
    server
        .dispatch(&leader, ClientCommand::ConfirmTeam { game_id })
        .await
        .unwrap();

    let mut last = None;
    for name in NAMES {
        last = Some(
            server
                .dispatch(
                    &conn(name),
                    ClientCommand::ApproveTeam {
                        game_id,
                        approve: true,
                    },
                )
                .await
                .unwrap(),
        );
    }
    assert_eq!(last.unwrap().snapshot.phase, Phase::Quest);

    for name in ["alice", "bob"] {
        server
            .dispatch(
                &conn(name),
                ClientCommand::SubmitQuestOutcome {
                    game_id,
                    success: true,
                },
            )
            .await
            .unwrap();
    }

    server
        .dispatch(&leader, ClientCommand::RevealNextQuestResult { game_id })
        .await
        .unwrap();
    let resolved = server
        .dispatch(&leader, ClientCommand::RevealNextQuestResult { game_id })
        .await
        .unwrap();

    assert_eq!(resolved.snapshot.quest_results, vec![Loyalty::Good]);
    assert_eq!(resolved.snapshot.round, 2);
    assert_eq!(resolved.snapshot.phase, Phase::TeamBuilding);
}

#[tokio::test]
async fn test_non_leader_rejected() {
    let server = server();
    let game_id = seated_game(&server).await;
    let started = server
        .dispatch(&conn("alice"), ClientCommand::StartGame { game_id })
        .await
        .unwrap();
    let leader = started.snapshot.leader.unwrap();
    let outsider = NAMES.iter().find(|n| **n != leader).unwrap();

    let err = server
        .dispatch(&conn(outsider), ClientCommand::ConfirmTeam { game_id })
        .await
        .unwrap_err();
    assert!(matches!(err, AvalonError::Game(GameError::NotLeader(_))));
    assert_eq!(err.code(), 403);
}

#[tokio::test]
async fn test_last_leave_removes_game() {
    let server = server();
    let created = server
        .dispatch(
            &conn("alice"),
            ClientCommand::CreateGame {
                username: "alice".into(),
            },
        )
        .await
        .unwrap();

    let left = server
        .dispatch(
            &conn("alice"),
            ClientCommand::LeaveGame {
                game_id: created.game_id,
            },
        )
        .await
        .unwrap();

    assert!(left.closed);
    assert_eq!(left.membership, Some(Membership::Left(conn("alice"))));
    assert_eq!(server.game_count().await, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_join_racing_last_leave_never_lands_in_removed_game() {
    let server = server();
    for _ in 0..50 {
        let created = server
            .dispatch(
                &conn("alice"),
                ClientCommand::CreateGame {
                    username: "alice".into(),
                },
            )
            .await
            .unwrap();
        let game_id = created.game_id;

        let alice_conn = conn("alice");
        let bob_conn = conn("bob");
        let (left, joined) = tokio::join!(
            server.dispatch(&alice_conn, ClientCommand::LeaveGame { game_id }),
            server.dispatch(
                &bob_conn,
                ClientCommand::JoinGame {
                    game_id,
                    username: "bob".into(),
                },
            ),
        );
        let left = left.unwrap();

        match joined {
            Ok(joined) => {
                // Bob got in first, so the game survives with bob hosting.
                assert!(!left.closed);
                assert_eq!(joined.membership, Some(Membership::Joined(conn("bob"))));
                let bob_left = server
                    .dispatch(&conn("bob"), ClientCommand::LeaveGame { game_id })
                    .await
                    .unwrap();
                assert!(bob_left.closed);
            }
            Err(err) => {
                assert!(left.closed);
                assert!(matches!(err, AvalonError::Game(GameError::GameNotFound(_))));
            }
        }
        assert_eq!(server.game_count().await, 0);
    }
}

#[tokio::test]
async fn test_join_after_last_leave_is_not_found() {
    let server = server();
    let created = server
        .dispatch(
            &conn("alice"),
            ClientCommand::CreateGame {
                username: "alice".into(),
            },
        )
        .await
        .unwrap();
    let game_id = created.game_id;
    server
        .dispatch(&conn("alice"), ClientCommand::LeaveGame { game_id })
        .await
        .unwrap();

    let err = server
        .dispatch(
            &conn("bob"),
            ClientCommand::JoinGame {
                game_id,
                username: "bob".into(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AvalonError::Game(GameError::GameNotFound(_))));
    assert_eq!(err.code(), 404);
}

#[tokio::test]
async fn test_host_leave_keeps_game() {
    let server = server();
    let game_id = seated_game(&server).await;

    let left = server
        .dispatch(&conn("alice"), ClientCommand::LeaveGame { game_id })
        .await
        .unwrap();

    assert!(!left.closed);
    assert_eq!(left.snapshot.host.as_deref(), Some("bob"));
    assert_eq!(server.game_count().await, 1);
}

#[tokio::test]
async fn test_view_shows_own_role() {
    let server = server();
    let game_id = seated_game(&server).await;
    server
        .dispatch(&conn("alice"), ClientCommand::StartGame { game_id })
        .await
        .unwrap();

    let mut evil = 0;
    for name in NAMES {
        let view = server.view(game_id, &conn(name)).await.unwrap();
        if view.role.unwrap().loyalty() == Loyalty::Evil {
            evil += 1;
            assert_eq!(view.known_evil.len(), 1);
        } else {
            assert!(view.known_evil.is_empty());
        }
    }
    assert_eq!(evil, 2);
}

// =========================================================================
// handle_frame
// =========================================================================

#[tokio::test]
async fn test_frame_create_replies_to_caller_and_group() {
    let server = server();
    let reply = server
        .handle_frame(
            &conn("alice"),
            &frame(&ClientCommand::CreateGame {
                username: "alice".into(),
            }),
        )
        .await
        .unwrap();

    assert_eq!(reply.outbound.len(), 2);
    let (to, bytes) = &reply.outbound[0];
    assert_eq!(to, &Recipient::Connection(conn("alice")));
    let game_id = match decode_server(bytes) {
        ServerMessage::GameCreated { game_id } => game_id,
        other => panic!("expected GameCreated, got {other:?}"),
    };

    let (to, bytes) = &reply.outbound[1];
    assert_eq!(to, &Recipient::Game(game_id));
    match decode_state(&decode_server(bytes)) {
        StateUpdate::Public { events, snapshot } => {
            assert_eq!(
                events,
                vec![GameEvent::PlayerJoined {
                    name: "alice".into()
                }]
            );
            assert_eq!(snapshot.game_id, game_id);
        }
        other => panic!("expected public update, got {other:?}"),
    }
    assert_eq!(
        reply.membership,
        Some((game_id, Membership::Joined(conn("alice"))))
    );
}

#[tokio::test]
async fn test_frame_garbage_returns_400() {
    let server = server();
    let reply = server
        .handle_frame(&conn("alice"), b"not json")
        .await
        .unwrap();

    assert_eq!(reply.outbound.len(), 1);
    let (to, bytes) = &reply.outbound[0];
    assert_eq!(to, &Recipient::Connection(conn("alice")));
    assert!(matches!(
        decode_server(bytes),
        ServerMessage::Error { code: 400, .. }
    ));
    assert!(reply.membership.is_none());
}

#[tokio::test]
async fn test_frame_empty_returns_400() {
    let server = server();
    let reply = server.handle_frame(&conn("alice"), b"").await.unwrap();

    assert_eq!(reply.outbound.len(), 1);
    match decode_server(&reply.outbound[0].1) {
        ServerMessage::Error { code, message } => {
            assert_eq!(code, 400);
            assert!(message.contains("empty frame"));
        }
        other => panic!("expected Error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_frame_rule_error_goes_to_caller_only() {
    let server = server();
    let game_id = seated_game(&server).await;

    let reply = server
        .handle_frame(
            &conn("bob"),
            &frame(&ClientCommand::StartGame { game_id }),
        )
        .await
        .unwrap();

    assert_eq!(reply.outbound.len(), 1);
    let (to, bytes) = &reply.outbound[0];
    assert_eq!(to, &Recipient::Connection(conn("bob")));
    match decode_server(bytes) {
        ServerMessage::Error { code, message } => {
            assert_eq!(code, 403);
            assert!(message.contains("not the host"));
        }
        other => panic!("expected Error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_frame_start_sends_private_roles() {
    let server = server();
    let game_id = seated_game(&server).await;

    let reply = server
        .handle_frame(
            &conn("alice"),
            &frame(&ClientCommand::StartGame { game_id }),
        )
        .await
        .unwrap();

    // One public update plus one private view per player.
    assert_eq!(reply.outbound.len(), 1 + NAMES.len());
    assert_eq!(reply.outbound[0].0, Recipient::Game(game_id));

    for (to, bytes) in &reply.outbound[1..] {
        let Recipient::Connection(member) = to else {
            panic!("private view addressed to a group");
        };
        match decode_state(&decode_server(bytes)) {
            StateUpdate::Private { view } => {
                assert!(view.role.is_some());
                assert!(NAMES.iter().any(|n| &conn(n) == member));
            }
            other => panic!("expected private update, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_frame_leave_notifies_leaver_and_group() {
    let server = server();
    let game_id = seated_game(&server).await;

    let reply = server
        .handle_frame(&conn("carol"), &frame(&ClientCommand::LeaveGame { game_id }))
        .await
        .unwrap();

    let recipients: Vec<_> = reply.outbound.iter().map(|(to, _)| to.clone()).collect();
    assert_eq!(
        recipients,
        vec![
            Recipient::Connection(conn("carol")),
            Recipient::Game(game_id)
        ]
    );
    assert_eq!(
        reply.membership,
        Some((game_id, Membership::Left(conn("carol"))))
    );
}
