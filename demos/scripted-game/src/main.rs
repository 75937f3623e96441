use std::collections::HashMap;

use avalon::prelude::*;
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

const PLAYERS: [&str; 7] = ["ana", "ben", "cleo", "dev", "eli", "fay", "gus"];

fn conn(name: &str) -> ConnectionHandle {
    ConnectionHandle::new(format!("conn-{name}"))
}

/// Runs one command and logs what it changed.
async fn send(
    server: &GameServer,
    name: &str,
    command: ClientCommand,
) -> Result<Dispatch, AvalonError> {
    let dispatch = server.dispatch(&conn(name), command).await?;
    for event in &dispatch.events {
        tracing::info!(player = name, ?event);
    }
    Ok(dispatch)
}

fn game_over(dispatch: &Dispatch) -> Option<&GameEvent> {
    dispatch
        .events
        .iter()
        .find(|e| matches!(e, GameEvent::GameOver { .. }))
}

// ---------------------------------------------------------------------------
// Scripted play
// ---------------------------------------------------------------------------

/// Plays one game to the end. Good players approve every team and pass
/// every quest; Evil players only approve teams with an Evil member and
/// always fail quests.
async fn play(server: &GameServer, seed: u64) -> Result<GameEvent, Box<dyn std::error::Error>> {
    let host = PLAYERS[0];
    let created = send(
        server,
        host,
        ClientCommand::CreateGame {
            username: host.into(),
        },
    )
    .await?;
    let game_id = created.game_id;
    for name in &PLAYERS[1..] {
        send(
            server,
            name,
            ClientCommand::JoinGame {
                game_id,
                username: (*name).into(),
            },
        )
        .await?;
    }

    let mut last = send(server, host, ClientCommand::StartGame { game_id }).await?;

    let mut roles = HashMap::new();
    for name in PLAYERS {
        let view = server.view(game_id, &conn(name)).await?;
        if let Some(role) = view.role {
            roles.insert(name, role.loyalty());
        }
    }
    tracing::info!(seed, ?roles, "roles dealt");
    let is_good = |name: &str| roles.get(name) == Some(&Loyalty::Good);

    loop {
        if let Some(over) = game_over(&last) {
            return Ok(over.clone());
        }
        let snapshot = last.snapshot.clone();
        let leader = snapshot.leader.clone().ok_or("game in progress without a leader")?;

        last = match snapshot.phase {
            Phase::TeamBuilding => {
                let size = snapshot.required_team_size.ok_or("no team size")?;
                let seat = snapshot
                    .players
                    .iter()
                    .position(|p| p.name == leader)
                    .ok_or("leader not seated")?;
                let team = snapshot
                    .players
                    .iter()
                    .cycle()
                    .skip(seat)
                    .take(size)
                    .map(|p| p.name.clone());
                for username in team {
                    send(server, &leader, ClientCommand::ToggleTeam { game_id, username }).await?;
                }
                send(server, &leader, ClientCommand::ConfirmTeam { game_id }).await?
            }
            Phase::TeamVote => {
                let tainted = snapshot.team.iter().any(|n| !is_good(n));
                let mut result = None;
                for name in PLAYERS {
                    let approve = is_good(name) || tainted;
                    let cmd = ClientCommand::ApproveTeam { game_id, approve };
                    result = Some(send(server, name, cmd).await?);
                }
                result.ok_or("nobody voted")?
            }
            Phase::Quest => {
                let mut result = None;
                for name in &snapshot.team {
                    let success = is_good(name);
                    let cmd = ClientCommand::SubmitQuestOutcome { game_id, success };
                    result = Some(send(server, name, cmd).await?);
                }
                result.ok_or("empty quest team")?
            }
            Phase::QuestResults => {
                send(server, &leader, ClientCommand::RevealNextQuestResult { game_id }).await?
            }
            Phase::Lobby => return Err("game returned to lobby without a result".into()),
        };
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let seed = match std::env::var("AVALON_SEED") {
        Ok(raw) => raw.parse()?,
        Err(_) => 7,
    };

    let server = GameServer::builder()
        .config(GameConfig {
            rng_seed: Some(seed),
            ..GameConfig::default()
        })
        .build();

    match play(&server, seed).await? {
        GameEvent::GameOver {
            winner,
            reason,
            quest_results,
        } => {
            let history: Vec<String> = quest_results.iter().map(ToString::to_string).collect();
            println!("{winner} wins ({reason:?}); quests: {}", history.join(", "));
        }
        other => println!("unexpected ending: {other:?}"),
    }
    Ok(())
}
