// Tasks, the feeds they use and the actors subscribed to them

use super::{require, Entity, RegistryError, Repository, Tracked};
use crate::store::schema::{task_services, task_subscriptions, tasks};
use crate::store::{Predicate, Row, Select, Statement, Table};

const BY_ID: &str = "by_id";
const BY_TASK: &str = "by_task";
const BY_ACTOR: &str = "by_actor";

// ============================================================================
// TASK
// ============================================================================

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Task {
    pub id: String,
    pub priority: Option<i64>,
    pub affiliation: Option<String>,
    pub description: Option<String>,
    pub detail: Option<String>,
    pub detail_uri: Option<String>,
}

impl Task {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }
}

impl Entity for Task {
    const TABLE: Table = Table::Tasks;
    const KIND: &'static str = "task";

    fn from_row(row: &Row) -> Self {
        Self {
            id: row.get_string(tasks::TASK_ID).unwrap_or_default(),
            priority: row.get_i64(tasks::PRIORITY),
            affiliation: row.get_string(tasks::AFFILIATION),
            description: row.get_string(tasks::DESCRIPTION),
            detail: row.get_string(tasks::DETAIL),
            detail_uri: row.get_string(tasks::DETAIL_URI),
        }
    }

    fn to_row(&self) -> Row {
        Row::new()
            .with(tasks::TASK_ID, &self.id)
            .with(tasks::PRIORITY, self.priority)
            .with(tasks::AFFILIATION, self.affiliation.clone())
            .with(tasks::DESCRIPTION, self.description.clone())
            .with(tasks::DETAIL, self.detail.clone())
            .with(tasks::DETAIL_URI, self.detail_uri.clone())
    }

    fn validate(&self) -> Result<(), RegistryError> {
        require(Self::KIND, "id", &self.id)
    }

    fn finders() -> Vec<(&'static str, Select)> {
        vec![(
            BY_ID,
            Select::from(Table::Tasks).filter(Predicate::eq_param(tasks::TASK_ID, 0)),
        )]
    }
}

impl Repository<Task> {
    pub fn get_by_id(&self, id: &str) -> Option<Tracked<Task>> {
        self.find_or_empty(BY_ID, &[id.into()]).into_iter().next()
    }
}

// ============================================================================
// TASK SERVICE
// ============================================================================

/// A feed of a system that a task makes use of
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TaskService {
    pub task_id: String,
    pub platform_id: String,
    pub system_id: String,
    pub feed_id: String,
    pub description: Option<String>,
    pub configuration_uri: Option<String>,
    pub configuration: Option<String>,
}

impl TaskService {
    pub fn new(
        task_id: impl Into<String>,
        platform_id: impl Into<String>,
        system_id: impl Into<String>,
        feed_id: impl Into<String>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            platform_id: platform_id.into(),
            system_id: system_id.into(),
            feed_id: feed_id.into(),
            ..Default::default()
        }
    }
}

impl Entity for TaskService {
    const TABLE: Table = Table::TaskServices;
    const KIND: &'static str = "task service";

    fn from_row(row: &Row) -> Self {
        Self {
            task_id: row.get_string(task_services::TASK_ID).unwrap_or_default(),
            platform_id: row.get_string(task_services::PLATFORM_ID).unwrap_or_default(),
            system_id: row.get_string(task_services::SERVICE_ID).unwrap_or_default(),
            feed_id: row.get_string(task_services::DATA_FEED_ID).unwrap_or_default(),
            description: row.get_string(task_services::DESCRIPTION),
            configuration_uri: row.get_string(task_services::CONFIGURATION_URI),
            configuration: row.get_string(task_services::CONFIGURATION),
        }
    }

    fn to_row(&self) -> Row {
        Row::new()
            .with(task_services::TASK_ID, &self.task_id)
            .with(task_services::PLATFORM_ID, &self.platform_id)
            .with(task_services::SERVICE_ID, &self.system_id)
            .with(task_services::DATA_FEED_ID, &self.feed_id)
            .with(task_services::DESCRIPTION, self.description.clone())
            .with(task_services::CONFIGURATION_URI, self.configuration_uri.clone())
            .with(task_services::CONFIGURATION, self.configuration.clone())
    }

    fn validate(&self) -> Result<(), RegistryError> {
        require(Self::KIND, "task id", &self.task_id)?;
        require(Self::KIND, "platform id", &self.platform_id)?;
        require(Self::KIND, "system id", &self.system_id)?;
        require(Self::KIND, "feed id", &self.feed_id)
    }

    fn finders() -> Vec<(&'static str, Select)> {
        let base = || {
            Select::from(Table::TaskServices)
                .order_by(task_services::PLATFORM_ID)
                .order_by(task_services::SERVICE_ID)
                .order_by(task_services::DATA_FEED_ID)
        };
        vec![
            (
                BY_TASK,
                base().filter(Predicate::eq_param(task_services::TASK_ID, 0)),
            ),
            (
                BY_ID,
                base().filter(Predicate::all([
                    Predicate::eq_param(task_services::TASK_ID, 0),
                    Predicate::eq_param(task_services::PLATFORM_ID, 1),
                    Predicate::eq_param(task_services::SERVICE_ID, 2),
                    Predicate::eq_param(task_services::DATA_FEED_ID, 3),
                ])),
            ),
        ]
    }
}

impl Repository<TaskService> {
    pub fn get_by_task(&self, task_id: &str) -> Vec<Tracked<TaskService>> {
        self.find_or_empty(BY_TASK, &[task_id.into()])
    }

    pub fn get_by_id(
        &self,
        task_id: &str,
        platform_id: &str,
        system_id: &str,
        feed_id: &str,
    ) -> Option<Tracked<TaskService>> {
        self.find_or_empty(
            BY_ID,
            &[
                task_id.into(),
                platform_id.into(),
                system_id.into(),
                feed_id.into(),
            ],
        )
        .into_iter()
        .next()
    }

    /// Remove every feed association of a task.
    pub fn delete_by_task(&self, task_id: &str) -> bool {
        self.execute_logged(&Statement::delete(
            Table::TaskServices,
            Predicate::eq(task_services::TASK_ID, task_id),
        ))
    }
}

// ============================================================================
// TASK SUBSCRIPTION
// ============================================================================

/// An actor's subscription to a task feed. Every column is part of the key.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TaskSubscription {
    pub task_id: String,
    pub actor_id: String,
    pub platform_id: String,
    pub system_id: String,
    pub feed_id: String,
    pub actor_platform_id: String,
}

impl TaskSubscription {
    pub fn new(
        task_id: impl Into<String>,
        actor_id: impl Into<String>,
        platform_id: impl Into<String>,
        system_id: impl Into<String>,
        feed_id: impl Into<String>,
        actor_platform_id: impl Into<String>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            actor_id: actor_id.into(),
            platform_id: platform_id.into(),
            system_id: system_id.into(),
            feed_id: feed_id.into(),
            actor_platform_id: actor_platform_id.into(),
        }
    }
}

impl Entity for TaskSubscription {
    const TABLE: Table = Table::TaskSubscriptions;
    const KIND: &'static str = "task subscription";

    fn from_row(row: &Row) -> Self {
        Self {
            task_id: row.get_string(task_subscriptions::TASK_ID).unwrap_or_default(),
            actor_id: row.get_string(task_subscriptions::ACTOR_ID).unwrap_or_default(),
            platform_id: row
                .get_string(task_subscriptions::PLATFORM_ID)
                .unwrap_or_default(),
            system_id: row.get_string(task_subscriptions::SERVICE_ID).unwrap_or_default(),
            feed_id: row
                .get_string(task_subscriptions::DATA_FEED_ID)
                .unwrap_or_default(),
            actor_platform_id: row
                .get_string(task_subscriptions::ACTOR_PLATFORM_ID)
                .unwrap_or_default(),
        }
    }

    fn to_row(&self) -> Row {
        Row::new()
            .with(task_subscriptions::TASK_ID, &self.task_id)
            .with(task_subscriptions::ACTOR_ID, &self.actor_id)
            .with(task_subscriptions::PLATFORM_ID, &self.platform_id)
            .with(task_subscriptions::SERVICE_ID, &self.system_id)
            .with(task_subscriptions::DATA_FEED_ID, &self.feed_id)
            .with(task_subscriptions::ACTOR_PLATFORM_ID, &self.actor_platform_id)
    }

    fn validate(&self) -> Result<(), RegistryError> {
        require(Self::KIND, "task id", &self.task_id)?;
        require(Self::KIND, "actor id", &self.actor_id)?;
        require(Self::KIND, "platform id", &self.platform_id)?;
        require(Self::KIND, "system id", &self.system_id)?;
        require(Self::KIND, "feed id", &self.feed_id)?;
        require(Self::KIND, "actor platform id", &self.actor_platform_id)
    }

    fn finders() -> Vec<(&'static str, Select)> {
        let base = || {
            Select::from(Table::TaskSubscriptions)
                .order_by(task_subscriptions::ACTOR_ID)
                .order_by(task_subscriptions::PLATFORM_ID)
                .order_by(task_subscriptions::SERVICE_ID)
                .order_by(task_subscriptions::DATA_FEED_ID)
        };
        vec![
            (
                BY_TASK,
                base().filter(Predicate::eq_param(task_subscriptions::TASK_ID, 0)),
            ),
            (
                BY_ACTOR,
                base().filter(
                    Predicate::eq_param(task_subscriptions::ACTOR_ID, 0)
                        .and(Predicate::eq_param(task_subscriptions::ACTOR_PLATFORM_ID, 1)),
                ),
            ),
        ]
    }
}

impl Repository<TaskSubscription> {
    pub fn get_by_task(&self, task_id: &str) -> Vec<Tracked<TaskSubscription>> {
        self.find_or_empty(BY_TASK, &[task_id.into()])
    }

    /// Subscriptions held by an actor connected through `actor_platform_id`
    pub fn get_by_actor(
        &self,
        actor_id: &str,
        actor_platform_id: &str,
    ) -> Vec<Tracked<TaskSubscription>> {
        self.find_or_empty(BY_ACTOR, &[actor_id.into(), actor_platform_id.into()])
    }

    /// Remove every subscription to a task.
    pub fn delete_for_task(&self, task_id: &str) -> bool {
        self.execute_logged(&Statement::delete(
            Table::TaskSubscriptions,
            Predicate::eq(task_subscriptions::TASK_ID, task_id),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{RegistryStore, Scope, TableStore};
    use std::sync::Arc;

    fn store() -> Arc<dyn RegistryStore> {
        Arc::new(TableStore::memory())
    }

    #[test]
    fn test_task_services_by_task_and_delete() {
        let repo: Repository<TaskService> = Repository::new(store(), Scope::Local);
        for ts in [
            TaskService::new("t1", "p1", "s1", "f1"),
            TaskService::new("t1", "p1", "s1", "f2"),
            TaskService::new("t2", "p1", "s1", "f1"),
        ] {
            repo.save(&mut repo.create_with(ts)).unwrap();
        }

        assert_eq!(repo.get_by_task("t1").len(), 2);
        assert!(repo.get_by_id("t1", "p1", "s1", "f2").is_some());
        assert!(repo.delete_by_task("t1"));
        assert!(repo.get_by_task("t1").is_empty());
        assert_eq!(repo.get_by_task("t2").len(), 1);
    }

    #[test]
    fn test_task_service_origin_through_distributed_scope() {
        let store = store();
        let local: Repository<TaskService> = Repository::new(store.clone(), Scope::Local);
        local
            .save(&mut local.create_with(TaskService::new("t1", "p1", "s1", "f1")))
            .unwrap();
        let row = TaskService::new("t1", "p1", "s1", "f1")
            .to_row()
            .with(crate::store::schema::ORIGIN_NODE, "n4");
        let distributed: Repository<TaskService> = Repository::new(store, Scope::Distributed);
        assert_eq!(distributed.create(&row).origin_node(), Some("n4"));
    }

    #[test]
    fn test_subscriptions_by_task_and_actor() {
        let repo: Repository<TaskSubscription> = Repository::new(store(), Scope::Local);
        for sub in [
            TaskSubscription::new("t1", "alice", "p1", "s1", "f1", "phone"),
            TaskSubscription::new("t1", "bob", "p1", "s1", "f1", "laptop"),
            TaskSubscription::new("t2", "alice", "p2", "s1", "f1", "phone"),
        ] {
            repo.save(&mut repo.create_with(sub)).unwrap();
        }

        assert_eq!(repo.get_by_task("t1").len(), 2);
        assert_eq!(repo.get_by_actor("alice", "phone").len(), 2);
        assert!(repo.get_by_actor("alice", "laptop").is_empty());
        assert!(repo.delete_for_task("t1"));
        assert_eq!(repo.get_all().len(), 1);
    }

    #[test]
    fn test_subscription_key_change_updates_in_place() {
        let repo: Repository<TaskSubscription> = Repository::new(store(), Scope::Local);
        let mut sub = repo.create_with(TaskSubscription::new("t1", "alice", "p1", "s1", "f1", "phone"));
        repo.save(&mut sub).unwrap();

        sub.feed_id = "f2".into();
        assert!(repo.save(&mut sub).unwrap());
        let all = repo.get_all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].feed_id, "f2");
    }
}
