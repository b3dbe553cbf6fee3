mod utils;
use std::sync::Arc;
use std::time::Duration;
use utils::{FailingMatchRepository, FailingPlayerStatsRepository, TestSetupBuilder};

use matchstats::generator::{start_match_generator, GeneratorConfig, SkipReason};
use matchstats::matches::InMemoryMatchRepository;
use matchstats::player_stats::InMemoryPlayerStatsRepository;
use matchstats::{AppError, MatchGenerator, PlayerAggregate, TickOutcome};

const FAST_TICKS: Duration = Duration::from_millis(10);

#[tokio::test]
async fn tick_without_servers_generates_nothing() {
    let setup = TestSetupBuilder::new().with_four_players().build();
    let generator = MatchGenerator::from_state(&setup.state);

    let outcome = generator.tick().await.expect("skip is not an error");

    assert_eq!(outcome, TickOutcome::Skipped(SkipReason::NoServers));
    assert_eq!(setup.matches.match_count().await, 0);
    for player in ["alice", "bob", "charlie", "david"] {
        assert_eq!(
            setup.state.player_stats.get(player).await.unwrap(),
            PlayerAggregate::Empty
        );
    }
}

#[tokio::test]
async fn tick_with_single_player_generates_nothing() {
    let setup = TestSetupBuilder::new()
        .with_servers(vec!["eu:1"])
        .with_players(vec!["solo"])
        .build();

    let outcome = MatchGenerator::from_state(&setup.state).tick().await.unwrap();

    assert_eq!(
        outcome,
        TickOutcome::Skipped(SkipReason::NotEnoughPlayers { available: 1 })
    );
    assert_eq!(setup.matches.match_count().await, 0);
}

#[tokio::test]
async fn generated_match_is_visible_in_reports() {
    let setup = TestSetupBuilder::new()
        .with_servers(vec!["eu:1", "us:1"])
        .with_four_players()
        .build();

    let outcome = MatchGenerator::from_state(&setup.state).tick().await.unwrap();
    let TickOutcome::Generated(record) = outcome else {
        panic!("expected a generated match, got {:?}", outcome);
    };

    assert_eq!(
        setup.state.reports.recent_matches(1).await.unwrap(),
        vec![record.clone()]
    );
    let best = setup.state.reports.best_players(10).await.unwrap();
    assert_eq!(best.len(), record.player_count());
}

#[tokio::test]
async fn failing_match_store_leaves_aggregates_untouched() {
    let failing = Arc::new(FailingMatchRepository::new());
    let state = TestSetupBuilder::new()
        .with_servers(vec!["eu:1"])
        .with_four_players()
        .build_state(failing.clone(), Arc::new(InMemoryPlayerStatsRepository::new()));

    let result = MatchGenerator::from_state(&state).tick().await;

    assert!(matches!(result, Err(AppError::StorageUnavailable(_))));
    assert_eq!(failing.save_attempts(), 1);
    for player in ["alice", "bob", "charlie", "david"] {
        assert_eq!(
            state.player_stats.get(player).await.unwrap(),
            PlayerAggregate::Empty
        );
    }
}

#[tokio::test]
async fn failing_aggregate_store_still_keeps_the_match() {
    let matches = Arc::new(InMemoryMatchRepository::new());
    let failing = Arc::new(FailingPlayerStatsRepository::new());
    let state = TestSetupBuilder::new()
        .with_servers(vec!["eu:1"])
        .with_players(vec!["ace", "bo"])
        .build_state(matches.clone(), failing.clone());

    let result = MatchGenerator::from_state(&state).tick().await;

    assert!(matches!(result, Err(AppError::StorageUnavailable(_))));
    assert_eq!(matches.match_count().await, 1);
    // One failed load per participant, so both were attempted
    assert_eq!(failing.calls(), 2);
}

#[tokio::test]
async fn scheduler_keeps_ticking_after_failures() {
    let failing = Arc::new(FailingMatchRepository::new());
    let state = TestSetupBuilder::new()
        .with_servers(vec!["eu:1"])
        .with_four_players()
        .build_state(failing.clone(), Arc::new(InMemoryPlayerStatsRepository::new()));

    let task = tokio::spawn(start_match_generator(
        Arc::new(MatchGenerator::from_state(&state)),
        GeneratorConfig {
            interval: FAST_TICKS,
        },
    ));
    tokio::time::sleep(Duration::from_millis(150)).await;

    assert!(!task.is_finished());
    assert!(failing.save_attempts() >= 2);
    task.abort();
}

#[tokio::test]
async fn scheduler_generates_consistent_matches() {
    let setup = TestSetupBuilder::new()
        .with_servers(vec!["eu:1", "us:1", "ap:1"])
        .with_four_players()
        .build();

    let task = tokio::spawn(start_match_generator(
        Arc::new(MatchGenerator::from_state(&setup.state)),
        GeneratorConfig {
            interval: FAST_TICKS,
        },
    ));
    tokio::time::sleep(Duration::from_millis(150)).await;
    task.abort();
    let _ = task.await;

    assert!(setup.matches.match_count().await >= 2);
    assert!(setup.matches.consistency_violations().await.is_empty());
}

#[tokio::test]
async fn aggregates_match_every_generated_match() {
    let setup = TestSetupBuilder::new()
        .with_servers(vec!["eu:1", "us:1", "ap:1"])
        .with_four_players()
        .build();
    let generator = MatchGenerator::from_state(&setup.state);

    for _ in 0..25 {
        generator.tick().await.unwrap();
    }

    let all = setup.state.reports.recent_matches(25).await.unwrap();
    assert_eq!(all.len(), 25);

    let participations: u64 = all.iter().map(|m| m.player_count() as u64).sum();
    let mut aggregated = 0;
    for player in ["alice", "bob", "charlie", "david"] {
        let aggregate = setup.state.player_stats.get(player).await.unwrap();
        let expected = PlayerAggregate::from_scores(
            all.iter().filter_map(|m| m.scores.get(player).copied()),
        );
        assert_eq!(aggregate, expected);
        aggregated += aggregate.match_count();
    }
    assert_eq!(aggregated, participations);
}
