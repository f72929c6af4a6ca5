//! Online match tests: two agent-driven peers play through the in-memory
//! broker and must end on the same canonical snapshot.

use std::sync::Arc;
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;

use mazerace_core::config::{Difficulty, MatchConfig};
use mazerace_core::net::messages::PlayerProfile;
use mazerace_core::net::protocol::{Topics, encode_snapshot};
use mazerace_core::player::{PLAYER_ONE, PLAYER_TWO};
use mazerace_core::snapshot::GameSnapshot;
use mazerace_core::test_helpers::contract_trap_invariant_holds;
use mazerace_core::time::now_ms;
use mazerace_game::GameEngine;
use mazerace_game::pathfinding::has_path_to_goal;
use mazerace_sync::{
    Channel, GameSession, Lobby, LocalAgent, MatchAssignment, MemoryBroker, MemoryClient,
    PublishOptions, SessionEnd, spawn_session,
};

const MATCH_DEADLINE: Duration = Duration::from_secs(3600);

fn agent_config() -> MatchConfig {
    MatchConfig {
        poll_interval_ms: 200,
        agent_think_min_ms: 50,
        agent_think_max_ms: 150,
        leave_flush_delay_ms: 10,
        ..MatchConfig::default()
    }
}

fn as_channel(client: &Arc<MemoryClient>) -> Arc<dyn Channel> {
    Arc::clone(client) as Arc<dyn Channel>
}

/// Run both seats to completion and return their final snapshots.
async fn play_out(
    config: &MatchConfig,
    seats: [(Arc<MemoryClient>, MatchAssignment, Difficulty, u64); 2],
) -> (GameSnapshot, GameSnapshot) {
    let mut handles = Vec::new();
    let mut command_senders = Vec::new();
    for (client, assignment, difficulty, seed) in seats {
        let agent = LocalAgent::new(difficulty, config.agent_think_range(), seed);
        let engine = GameEngine::new(config.clone());
        let session = GameSession::new(as_channel(&client), engine, assignment)
            .with_agent(Box::new(agent));
        let (commands, _events, handle) = spawn_session(session);
        command_senders.push(commands);
        handles.push(handle);
    }

    let ends = tokio::time::timeout(MATCH_DEADLINE, futures::future::join_all(handles))
        .await
        .expect("match should finish");
    let mut finals = ends.into_iter().map(|end| match end.unwrap().unwrap() {
        SessionEnd::Finished(snapshot) => snapshot,
        other => panic!("expected a finished match, got {other:?}"),
    });
    let a = finals.next().unwrap();
    let b = finals.next().unwrap();
    (a, b)
}

fn assert_sane_final(snapshot: &GameSnapshot, walls_per_player: u32) {
    assert!(snapshot.is_finished());
    contract_trap_invariant_holds(snapshot, has_path_to_goal);
    let walls_left: u32 = snapshot.players.values().map(|p| p.walls_left).sum();
    assert_eq!(
        walls_left as usize + snapshot.walls.len(),
        2 * walls_per_player as usize
    );
}

// Two searchers pair up through the lobby and play a full match
#[tokio::test(start_paused = true)]
async fn matched_agents_converge_on_final_snapshot() {
    let config = agent_config();
    let broker = MemoryBroker::new();
    let (ca, cb) = (Arc::new(broker.connect()), Arc::new(broker.connect()));
    let lobby_a = Lobby::new(as_channel(&ca), GameEngine::new(config.clone()));
    let lobby_b = Lobby::new(as_channel(&cb), GameEngine::new(config.clone()));
    let (mut rng_a, mut rng_b) = (StdRng::seed_from_u64(11), StdRng::seed_from_u64(12));

    let (ra, rb) = tokio::join!(
        lobby_a.find_match(
            PlayerProfile {
                name: "Ada".to_string(),
                walls_left: config.walls_per_player,
            },
            &mut rng_a
        ),
        lobby_b.find_match(
            PlayerProfile {
                name: "Bea".to_string(),
                walls_left: config.walls_per_player,
            },
            &mut rng_b
        )
    );
    let (ra, rb) = (ra.unwrap(), rb.unwrap());
    assert_eq!(ra.game_id, rb.game_id);

    let (a, b) = play_out(
        &config,
        [
            (ca, ra, Difficulty::Hard, 1),
            (cb, rb, Difficulty::Medium, 2),
        ],
    )
    .await;
    assert_eq!(a, b, "peers must agree on the final snapshot");
    assert!(a.winner.is_some());
    assert_sane_final(&a, config.walls_per_player);
}

// A created game is joined by id, then played out
#[tokio::test(start_paused = true)]
async fn created_game_is_joined_and_played() {
    let config = MatchConfig {
        walls_per_player: 6,
        ..agent_config()
    };
    let broker = MemoryBroker::new();
    let (host_client, guest_client) = (Arc::new(broker.connect()), Arc::new(broker.connect()));
    let host = Lobby::new(as_channel(&host_client), GameEngine::new(config.clone()));
    let guest = Lobby::new(as_channel(&guest_client), GameEngine::new(config.clone()));
    let mut rng = StdRng::seed_from_u64(3);

    let created = host.create_game("Host", &mut rng).await.unwrap();
    let (seated, joined) = tokio::join!(host.await_joiner(&created.game_id), async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        guest.join_game(&created.game_id, "Guest").await
    });
    let (seated, joined) = (seated.unwrap(), joined.unwrap());
    assert_eq!(seated.snapshot, joined.snapshot);

    let (a, b) = play_out(
        &config,
        [
            (host_client, seated, Difficulty::Medium, 5),
            (guest_client, joined, Difficulty::Easy, 6),
        ],
    )
    .await;
    assert_eq!(a, b);
    assert_sane_final(&a, 6);
}

// A peer that loses every push still converges through polling
#[tokio::test(start_paused = true)]
async fn lossy_peer_converges_by_polling() {
    let config = agent_config();
    let broker = MemoryBroker::new();
    let (ca, cb) = (Arc::new(broker.connect()), Arc::new(broker.connect()));
    cb.set_push_loss(true);

    let engine = GameEngine::new(config.clone());
    let mut rng = StdRng::seed_from_u64(21);
    let start = engine.new_match("Ada", "Bea", &mut rng, now_ms());
    let topic = Topics::new(config.topic_prefix.clone()).game_state("lossy");
    let payload = encode_snapshot(&start).unwrap();
    ca.publish(&topic, payload, PublishOptions::RETAINED)
        .await
        .unwrap();

    let seat = |local_player_id| MatchAssignment {
        game_id: "lossy".to_string(),
        local_player_id,
        snapshot: start.clone(),
    };
    let (a, b) = play_out(
        &config,
        [
            (ca, seat(PLAYER_ONE), Difficulty::Medium, 7),
            (cb, seat(PLAYER_TWO), Difficulty::Medium, 8),
        ],
    )
    .await;
    assert_eq!(a, b);
    assert_sane_final(&a, config.walls_per_player);
}
