//! Store checks against a live PostgreSQL. Each test returns early unless
//! `DATABASE_URL` is set.

use std::time::Duration;

use anyhow::Result;
use sqlx::PgPool;
use uuid::Uuid;

use captain_api::config::DatabaseConfig;
use captain_api::database::{AssociateOutcome, Card, DatabaseManager, PgRegistry, RegistryStore};
use captain_api::session::{PgSessionStore, SessionState, SessionStore};

async fn connect() -> Result<Option<PgPool>> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping");
        return Ok(None);
    };
    let pool = DatabaseManager::connect(&DatabaseConfig {
        url: Some(url),
        max_connections: 5,
        connection_timeout: 5,
    })
    .await?;
    // parallel tests can race the first CREATE TABLE
    if DatabaseManager::bootstrap(&pool).await.is_err() {
        DatabaseManager::bootstrap(&pool).await?;
    }
    Ok(Some(pool))
}

/// Names unique to one test run
fn names(prefix: &str) -> (String, String, String, String) {
    let tag = Uuid::new_v4().simple().to_string();
    (
        format!("{}-r1-{}", prefix, tag),
        format!("{}-r2-{}", prefix, tag),
        format!("{}-c1-{}", prefix, tag),
        format!("{}-c2-{}", prefix, tag),
    )
}

async fn seed(registry: &PgRegistry, robots: [&str; 2], cards: [&str; 2]) -> Result<()> {
    for card in cards {
        registry.upsert_card(&Card::new(card, Vec::new())).await?;
    }
    for robot in robots {
        registry.upsert_robot(robot, "http://127.0.0.1:9").await?;
    }
    Ok(())
}

async fn cleanup(pool: &PgPool, robots: [&str; 2], cards: [&str; 2]) -> Result<()> {
    sqlx::query("DELETE FROM robots WHERE name = ANY($1)")
        .bind(robots.map(String::from).to_vec())
        .execute(pool)
        .await?;
    sqlx::query("DELETE FROM cards WHERE card_id = ANY($1)")
        .bind(cards.map(String::from).to_vec())
        .execute(pool)
        .await?;
    Ok(())
}

#[tokio::test]
async fn same_pair_associates_twice() -> Result<()> {
    let Some(pool) = connect().await? else { return Ok(()) };
    let registry = PgRegistry::new(pool.clone());
    let (r1, r2, c1, c2) = names("pair");
    seed(&registry, [r1.as_str(), r2.as_str()], [c1.as_str(), c2.as_str()]).await?;

    assert_eq!(registry.associate(&r1, &c1).await?, AssociateOutcome::Associated);
    assert_eq!(registry.associate(&r1, &c1).await?, AssociateOutcome::Associated);
    assert_eq!(registry.find_robot_by_card(&c1).await?.map(|r| r.name), Some(r1.clone()));

    cleanup(&pool, [r1.as_str(), r2.as_str()], [c1.as_str(), c2.as_str()]).await
}

#[tokio::test]
async fn bound_robot_and_bound_card_are_refused() -> Result<()> {
    let Some(pool) = connect().await? else { return Ok(()) };
    let registry = PgRegistry::new(pool.clone());
    let (r1, r2, c1, c2) = names("bound");
    seed(&registry, [r1.as_str(), r2.as_str()], [c1.as_str(), c2.as_str()]).await?;

    assert_eq!(registry.associate(&r1, &c1).await?, AssociateOutcome::Associated);
    // robot already holds another card
    assert_eq!(registry.associate(&r1, &c2).await?, AssociateOutcome::AlreadyAssociated);
    // card already held by another robot
    assert_eq!(registry.associate(&r2, &c1).await?, AssociateOutcome::AlreadyAssociated);

    assert_eq!(registry.find_robot(&r1).await?.map(|r| r.card_id), Some(c1.clone()));
    assert_eq!(registry.find_robot(&r2).await?.map(|r| r.card_id), Some(String::new()));

    assert_eq!(registry.associate(&r2, "no-such-card").await?, AssociateOutcome::CardNotFound);
    assert_eq!(registry.associate("no-such-robot", &c2).await?, AssociateOutcome::RobotNotFound);

    cleanup(&pool, [r1.as_str(), r2.as_str()], [c1.as_str(), c2.as_str()]).await
}

#[tokio::test]
async fn racing_robots_have_one_winner() -> Result<()> {
    let Some(pool) = connect().await? else { return Ok(()) };
    let registry = PgRegistry::new(pool.clone());
    let (r1, r2, c1, c2) = names("race");
    seed(&registry, [r1.as_str(), r2.as_str()], [c1.as_str(), c2.as_str()]).await?;

    let (a, b) = futures::join!(registry.associate(&r1, &c1), registry.associate(&r2, &c1));
    let outcomes = [a?, b?];
    assert_eq!(
        outcomes.iter().filter(|o| **o == AssociateOutcome::Associated).count(),
        1,
        "{:?}",
        outcomes
    );
    assert!(outcomes.contains(&AssociateOutcome::AlreadyAssociated));

    let holders = registry
        .list_robots()
        .await?
        .into_iter()
        .filter(|r| r.card_id == c1)
        .count();
    assert_eq!(holders, 1);

    cleanup(&pool, [r1.as_str(), r2.as_str()], [c1.as_str(), c2.as_str()]).await
}

#[tokio::test]
async fn url_upsert_keeps_card() -> Result<()> {
    let Some(pool) = connect().await? else { return Ok(()) };
    let registry = PgRegistry::new(pool.clone());
    let (r1, r2, c1, c2) = names("upsert");
    seed(&registry, [r1.as_str(), r2.as_str()], [c1.as_str(), c2.as_str()]).await?;

    registry.associate(&r1, &c1).await?;
    registry.upsert_robot(&r1, "http://10.0.0.11:3000").await?;

    let robot = registry.find_robot(&r1).await?.expect("robot");
    assert_eq!(robot.url, "http://10.0.0.11:3000");
    assert_eq!(robot.card_id, c1);

    cleanup(&pool, [r1.as_str(), r2.as_str()], [c1.as_str(), c2.as_str()]).await
}

#[tokio::test]
async fn sessions_round_trip_and_expire() -> Result<()> {
    let Some(pool) = connect().await? else { return Ok(()) };
    let store = PgSessionStore::new(pool.clone());

    let id = Uuid::new_v4();
    let mut state = SessionState::default();
    state.grant_admin();
    state.card_id = Some("card-42".to_string());

    store.save(id, &state, Duration::from_secs(60)).await?;
    assert_eq!(store.load(id).await?, Some(state.clone()));

    state.revoke_admin();
    store.save(id, &state, Duration::from_secs(60)).await?;
    assert_eq!(store.load(id).await?.map(|s| s.is_admin()), Some(false));

    let expired = Uuid::new_v4();
    store.save(expired, &state, Duration::ZERO).await?;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(store.load(expired).await?, None);
    assert_eq!(store.load(Uuid::new_v4()).await?, None);

    sqlx::query("DELETE FROM sessions WHERE id = ANY($1)")
        .bind(vec![id, expired])
        .execute(&pool)
        .await?;
    Ok(())
}
