use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::manager::DatabaseError;
use super::models::{Card, Robot};
use super::registry::{AssociateOutcome, RegistryStore};

#[derive(Default)]
struct Tables {
    cards: HashMap<String, Card>,
    robots: BTreeMap<String, Robot>,
}

/// In-process registry for development and tests.
///
/// Every mutation runs under one write lock, which makes `associate` atomic
/// with respect to all other registry writes.
#[derive(Default)]
pub struct MemoryRegistry {
    tables: RwLock<Tables>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RegistryStore for MemoryRegistry {
    async fn find_card(&self, card_id: &str) -> Result<Option<Card>, DatabaseError> {
        Ok(self.tables.read().await.cards.get(card_id).cloned())
    }

    async fn upsert_card(&self, card: &Card) -> Result<(), DatabaseError> {
        self.tables
            .write()
            .await
            .cards
            .insert(card.card_id.clone(), card.clone());
        Ok(())
    }

    async fn find_robot(&self, name: &str) -> Result<Option<Robot>, DatabaseError> {
        Ok(self.tables.read().await.robots.get(name).cloned())
    }

    async fn find_robot_by_card(&self, card_id: &str) -> Result<Option<Robot>, DatabaseError> {
        if card_id.is_empty() {
            return Ok(None);
        }
        let tables = self.tables.read().await;
        Ok(tables.robots.values().find(|r| r.card_id == card_id).cloned())
    }

    async fn list_robots(&self) -> Result<Vec<Robot>, DatabaseError> {
        Ok(self.tables.read().await.robots.values().cloned().collect())
    }

    async fn upsert_robot(&self, name: &str, url: &str) -> Result<(), DatabaseError> {
        let mut tables = self.tables.write().await;
        tables
            .robots
            .entry(name.to_string())
            .and_modify(|robot| robot.url = url.to_string())
            .or_insert_with(|| Robot::new(name, url));
        Ok(())
    }

    async fn delete_robot(&self, name: &str) -> Result<u64, DatabaseError> {
        let removed = self.tables.write().await.robots.remove(name);
        Ok(u64::from(removed.is_some()))
    }

    async fn associate(&self, name: &str, card_id: &str) -> Result<AssociateOutcome, DatabaseError> {
        let mut tables = self.tables.write().await;

        if !tables.cards.contains_key(card_id) {
            return Ok(AssociateOutcome::CardNotFound);
        }

        let held_elsewhere = tables
            .robots
            .values()
            .any(|r| r.card_id == card_id && r.name != name);

        let Some(robot) = tables.robots.get_mut(name) else {
            return Ok(AssociateOutcome::RobotNotFound);
        };

        if held_elsewhere || (robot.is_associated() && robot.card_id != card_id) {
            return Ok(AssociateOutcome::AlreadyAssociated);
        }

        robot.card_id = card_id.to_string();
        Ok(AssociateOutcome::Associated)
    }

    async fn disassociate(&self, name: &str) -> Result<bool, DatabaseError> {
        let mut tables = self.tables.write().await;
        match tables.robots.get_mut(name) {
            Some(robot) => {
                robot.card_id.clear();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    async fn seeded() -> MemoryRegistry {
        let registry = MemoryRegistry::new();
        registry.upsert_card(&Card::new("c1", vec![1, 2, 3])).await.unwrap();
        registry.upsert_card(&Card::new("c2", vec![])).await.unwrap();
        registry.upsert_robot("r1", "http://10.0.0.1:5000").await.unwrap();
        registry.upsert_robot("r2", "http://10.0.0.2:5000").await.unwrap();
        registry
    }

    #[tokio::test]
    async fn upsert_robot_keeps_association() {
        let registry = seeded().await;
        assert_eq!(registry.associate("r1", "c1").await.unwrap(), AssociateOutcome::Associated);

        registry.upsert_robot("r1", "http://10.0.0.9:5000").await.unwrap();
        let robot = registry.find_robot("r1").await.unwrap().unwrap();
        assert_eq!(robot.url, "http://10.0.0.9:5000");
        assert_eq!(robot.card_id, "c1");
    }

    #[tokio::test]
    async fn associate_is_idempotent() {
        let registry = seeded().await;
        assert_eq!(registry.associate("r1", "c1").await.unwrap(), AssociateOutcome::Associated);
        assert_eq!(registry.associate("r1", "c1").await.unwrap(), AssociateOutcome::Associated);

        let holders: Vec<_> = registry
            .list_robots()
            .await
            .unwrap()
            .into_iter()
            .filter(|r| r.card_id == "c1")
            .collect();
        assert_eq!(holders.len(), 1);
    }

    #[tokio::test]
    async fn associate_rejects_conflicts() {
        let registry = seeded().await;
        registry.associate("r1", "c1").await.unwrap();

        // card already held by r1
        assert_eq!(
            registry.associate("r2", "c1").await.unwrap(),
            AssociateOutcome::AlreadyAssociated
        );
        // r1 already holds another card
        assert_eq!(
            registry.associate("r1", "c2").await.unwrap(),
            AssociateOutcome::AlreadyAssociated
        );
        assert_eq!(registry.find_robot("r2").await.unwrap().unwrap().card_id, "");
    }

    #[tokio::test]
    async fn associate_reports_missing_records() {
        let registry = seeded().await;
        assert_eq!(
            registry.associate("r1", "missing").await.unwrap(),
            AssociateOutcome::CardNotFound
        );
        assert_eq!(
            registry.associate("ghost", "c1").await.unwrap(),
            AssociateOutcome::RobotNotFound
        );
        assert_eq!(registry.find_robot("r1").await.unwrap().unwrap().card_id, "");
    }

    #[tokio::test]
    async fn disassociate_frees_card() {
        let registry = seeded().await;
        registry.associate("r1", "c1").await.unwrap();
        assert!(registry.disassociate("r1").await.unwrap());
        assert!(registry.find_robot_by_card("c1").await.unwrap().is_none());
        assert_eq!(registry.associate("r2", "c1").await.unwrap(), AssociateOutcome::Associated);
        assert!(!registry.disassociate("ghost").await.unwrap());
    }

    #[tokio::test]
    async fn empty_card_never_matches() {
        let registry = seeded().await;
        assert!(registry.find_robot_by_card("").await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_association_leaves_one_holder() {
        for _ in 0..50 {
            let registry = Arc::new(seeded().await);

            let a = tokio::spawn({
                let registry = Arc::clone(&registry);
                async move { registry.associate("r1", "c1").await.unwrap() }
            });
            let b = tokio::spawn({
                let registry = Arc::clone(&registry);
                async move { registry.associate("r2", "c1").await.unwrap() }
            });

            let outcomes = [a.await.unwrap(), b.await.unwrap()];
            let wins = outcomes
                .iter()
                .filter(|o| **o == AssociateOutcome::Associated)
                .count();
            assert_eq!(wins, 1, "outcomes: {:?}", outcomes);

            let holders = registry
                .list_robots()
                .await
                .unwrap()
                .into_iter()
                .filter(|r| r.card_id == "c1")
                .count();
            assert_eq!(holders, 1);
        }
    }
}
