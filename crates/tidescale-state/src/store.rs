//! StateStore — redb-backed state persistence for Tidescale.
//!
//! Provides typed operations over policies, cluster topologies, replica
//! sets and scheduling plans. All values are JSON-serialized into redb's
//! `&[u8]` value columns. The store supports both on-disk and in-memory
//! backends (the latter for testing).

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::tables::*;
use crate::types::*;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

type JsonTable = TableDefinition<'static, &'static str, &'static [u8]>;

/// Thread-safe state store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) a persistent state store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory state store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(POLICIES).map_err(map_err!(Table))?;
        txn.open_table(CLUSTERS).map_err(map_err!(Table))?;
        txn.open_table(REPLICA_SETS).map_err(map_err!(Table))?;
        txn.open_table(SCHEDULE_PLANS).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    // ── Generic helpers ────────────────────────────────────────────

    fn insert_json<T: Serialize>(
        txn: &WriteTransaction,
        table: JsonTable,
        key: &str,
        value: &T,
    ) -> StateResult<()> {
        let bytes = serde_json::to_vec(value).map_err(map_err!(Serialize))?;
        let mut table = txn.open_table(table).map_err(map_err!(Table))?;
        table
            .insert(key, bytes.as_slice())
            .map_err(map_err!(Write))?;
        Ok(())
    }

    fn put<T: Serialize>(&self, table: JsonTable, key: &str, value: &T) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        Self::insert_json(&txn, table, key, value)?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    fn get<T: DeserializeOwned>(&self, table: JsonTable, key: &str) -> StateResult<Option<T>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(table).map_err(map_err!(Table))?;
        match table.get(key).map_err(map_err!(Read))? {
            Some(guard) => {
                let value: T =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn list_with_prefix<T: DeserializeOwned>(
        &self,
        table: JsonTable,
        prefix: &str,
    ) -> StateResult<Vec<T>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(table).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table.iter().map_err(map_err!(Read))? {
            let (key, value) = entry.map_err(map_err!(Read))?;
            if key.value().starts_with(prefix) {
                let item: T =
                    serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
                results.push(item);
            }
        }
        Ok(results)
    }

    fn delete(&self, table: JsonTable, key: &str) -> StateResult<bool> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let existed;
        {
            let mut table = txn.open_table(table).map_err(map_err!(Table))?;
            existed = table.remove(key).map_err(map_err!(Write))?.is_some();
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(existed)
    }

    // ── Policies ───────────────────────────────────────────────────

    /// Insert or update an autoscaling policy.
    pub fn put_policy(&self, policy: &AutoScalingPolicy) -> StateResult<()> {
        let key = policy.table_key();
        self.put(POLICIES, &key, policy)?;
        debug!(%key, "policy stored");
        Ok(())
    }

    /// Get a policy by `{namespace}/{name}` key.
    pub fn get_policy(&self, key: &str) -> StateResult<Option<AutoScalingPolicy>> {
        self.get(POLICIES, key)
    }

    /// List all policies.
    pub fn list_policies(&self) -> StateResult<Vec<AutoScalingPolicy>> {
        self.list_with_prefix(POLICIES, "")
    }

    // ── Clusters ───────────────────────────────────────────────────

    /// Insert or update a cluster topology.
    pub fn put_cluster(&self, cluster: &ClusterTopology) -> StateResult<()> {
        let key = cluster.table_key();
        self.put(CLUSTERS, &key, cluster)?;
        debug!(%key, "cluster stored");
        Ok(())
    }

    /// Get a cluster by `{namespace}/{name}` key.
    pub fn get_cluster(&self, key: &str) -> StateResult<Option<ClusterTopology>> {
        self.get(CLUSTERS, key)
    }

    // ── Replica sets ───────────────────────────────────────────────

    /// Insert or update a replica set.
    pub fn put_replica_set(&self, set: &ReplicaSet) -> StateResult<()> {
        let key = set.table_key();
        self.put(REPLICA_SETS, &key, set)?;
        debug!(%key, "replica set stored");
        Ok(())
    }

    /// Get the replica set backing one component of a cluster.
    pub fn get_replica_set(
        &self,
        namespace: &str,
        cluster: &str,
        member: MemberType,
    ) -> StateResult<Option<ReplicaSet>> {
        self.get(REPLICA_SETS, &replica_set_key(namespace, cluster, member))
    }

    // ── Reconciliation results ─────────────────────────────────────

    /// Persist a policy and the clusters it mutated in one transaction.
    ///
    /// Either every record is written or none is.
    pub fn commit_pass(
        &self,
        policy: &AutoScalingPolicy,
        clusters: &[ClusterTopology],
    ) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        Self::insert_json(&txn, POLICIES, &policy.table_key(), policy)?;
        for cluster in clusters {
            Self::insert_json(&txn, CLUSTERS, &cluster.table_key(), cluster)?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(
            policy = %policy.table_key(),
            clusters = clusters.len(),
            "reconciliation pass committed"
        );
        Ok(())
    }

    // ── Scheduling plans ───────────────────────────────────────────

    /// Insert or update a scheduling plan.
    pub fn put_schedule_plan(&self, plan: &SchedulePlan) -> StateResult<()> {
        self.put(SCHEDULE_PLANS, &plan.id, plan)
    }

    /// List all scheduling plans.
    pub fn list_schedule_plans(&self) -> StateResult<Vec<SchedulePlan>> {
        self.list_with_prefix(SCHEDULE_PLANS, "")
    }

    /// Delete a scheduling plan by id. Returns true if it existed.
    pub fn delete_schedule_plan(&self, id: &str) -> StateResult<bool> {
        self.delete(SCHEDULE_PLANS, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, BTreeSet};

    fn test_policy(namespace: &str, name: &str) -> AutoScalingPolicy {
        AutoScalingPolicy {
            namespace: namespace.to_string(),
            name: name.to_string(),
            clusters: vec![ClusterRef::new(namespace, "basic")],
            sql: Some(ComponentPolicy::new(2, 10)),
            storage: None,
            annotations: BTreeMap::new(),
        }
    }

    fn test_cluster(namespace: &str, name: &str) -> ClusterTopology {
        ClusterTopology {
            namespace: namespace.to_string(),
            name: name.to_string(),
            sql: Some(ComponentSpec { replicas: 2 }),
            storage: Some(ComponentSpec { replicas: 3 }),
            status: ClusterStatus::default(),
        }
    }

    fn test_replica_set(cluster: &str, member: MemberType) -> ReplicaSet {
        ReplicaSet {
            namespace: "db".to_string(),
            cluster: cluster.to_string(),
            member,
            replicas: 3,
            status_replicas: 3,
            generation: 1,
            observed_generation: 1,
            current_revision: "rev-1".to_string(),
            update_revision: "rev-1".to_string(),
            delete_slots: BTreeSet::new(),
        }
    }

    // ── Policy CRUD ────────────────────────────────────────────────

    #[test]
    fn policy_put_and_get() {
        let store = StateStore::open_in_memory().unwrap();
        let policy = test_policy("db", "auto");

        store.put_policy(&policy).unwrap();
        let retrieved = store.get_policy("db/auto").unwrap();

        assert_eq!(retrieved, Some(policy));
    }

    #[test]
    fn policy_update_in_place() {
        let store = StateStore::open_in_memory().unwrap();
        let mut policy = test_policy("db", "auto");
        store.put_policy(&policy).unwrap();

        policy
            .annotations
            .insert("lastAutoScalingTimestamp.sql".to_string(), "1000".to_string());
        store.put_policy(&policy).unwrap();

        let retrieved = store.get_policy("db/auto").unwrap().unwrap();
        assert_eq!(retrieved.annotations.len(), 1);
        assert_eq!(store.list_policies().unwrap().len(), 1);
    }

    // ── Cluster CRUD ───────────────────────────────────────────────

    #[test]
    fn cluster_put_and_get() {
        let store = StateStore::open_in_memory().unwrap();
        store.put_cluster(&test_cluster("db", "basic")).unwrap();
        store.put_cluster(&test_cluster("db", "other")).unwrap();

        let basic = store.get_cluster("db/basic").unwrap().unwrap();
        assert_eq!(basic.sql, Some(ComponentSpec { replicas: 2 }));
        assert_eq!(store.get_cluster("db/other").unwrap().unwrap().name, "other");
        assert!(store.get_cluster("ops/basic").unwrap().is_none());
    }

    // ── Replica sets ───────────────────────────────────────────────

    #[test]
    fn replica_sets_keyed_by_cluster_and_member() {
        let store = StateStore::open_in_memory().unwrap();
        store.put_replica_set(&test_replica_set("basic", MemberType::Storage)).unwrap();
        store.put_replica_set(&test_replica_set("basic-2", MemberType::Sql)).unwrap();

        let storage = store
            .get_replica_set("db", "basic", MemberType::Storage)
            .unwrap()
            .unwrap();
        assert_eq!(storage.member, MemberType::Storage);
        assert_eq!(storage.cluster, "basic");

        assert!(store.get_replica_set("db", "basic", MemberType::Sql).unwrap().is_none());
        assert!(store.get_replica_set("db", "basic-2", MemberType::Sql).unwrap().is_some());
    }

    // ── Pass commit ────────────────────────────────────────────────

    #[test]
    fn commit_pass_writes_policy_and_clusters() {
        let store = StateStore::open_in_memory().unwrap();
        let mut policy = test_policy("db", "auto");
        policy
            .annotations
            .insert("lastAutoScalingTimestamp.sql".to_string(), "42".to_string());
        let mut cluster = test_cluster("db", "basic");
        cluster.sql = Some(ComponentSpec { replicas: 6 });

        store.commit_pass(&policy, std::slice::from_ref(&cluster)).unwrap();

        assert_eq!(store.get_policy("db/auto").unwrap(), Some(policy));
        assert_eq!(store.get_cluster("db/basic").unwrap(), Some(cluster));
    }

    // ── Scheduling plans ───────────────────────────────────────────

    #[test]
    fn schedule_plans_put_list_delete() {
        let store = StateStore::open_in_memory().unwrap();
        let plan = SchedulePlan {
            id: "plan-1".to_string(),
            region_ids: vec![1, 2],
            store_ids: vec![4],
            start_time: 10,
            end_time: 20,
        };
        store.put_schedule_plan(&plan).unwrap();

        assert_eq!(store.list_schedule_plans().unwrap(), vec![plan]);
        assert!(store.delete_schedule_plan("plan-1").unwrap());
        assert!(store.list_schedule_plans().unwrap().is_empty());
    }

    // ── Persistence (on-disk) ──────────────────────────────────────

    #[test]
    fn persistence_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.redb");

        {
            let store = StateStore::open(&db_path).unwrap();
            store.put_policy(&test_policy("prod", "auto")).unwrap();
        }

        // Reopen the same database file.
        let store = StateStore::open(&db_path).unwrap();
        let policy = store.get_policy("prod/auto").unwrap();
        assert!(policy.is_some());
        assert_eq!(policy.unwrap().name, "auto");
    }

    // ── Edge cases ─────────────────────────────────────────────────

    #[test]
    fn empty_store_operations() {
        let store = StateStore::open_in_memory().unwrap();

        assert!(store.list_policies().unwrap().is_empty());
        assert!(store.get_cluster("db/any").unwrap().is_none());
        assert!(store.get_replica_set("db", "any", MemberType::Sql).unwrap().is_none());
        assert!(store.list_schedule_plans().unwrap().is_empty());
        assert!(!store.delete_schedule_plan("nope").unwrap());
    }
}
