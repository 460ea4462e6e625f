//! Time-windowed schedule plans and the predicted-hot-region query.

use std::sync::{PoisonError, RwLock};

use tracing::{debug, info};

use tidescale_state::{SchedulePlan, StateStore};

use crate::error::{ScheduleError, ScheduleResult};

/// Storage for schedule plans, shared by whoever queries or mutates them.
pub trait SchedulePlanTable: Send + Sync {
    /// Insert or replace a plan (keyed by id).
    fn add_plan(&self, plan: SchedulePlan) -> ScheduleResult<()>;

    fn plans(&self) -> ScheduleResult<Vec<SchedulePlan>>;

    /// Drop plans whose window ended before `now`; returns how many.
    fn prune_expired(&self, now: u64) -> ScheduleResult<usize>;

    /// Whether some plan active at `now` lists `region_id`.
    fn is_predicted_hot_region(&self, region_id: u64, now: u64) -> ScheduleResult<bool> {
        let hot = self
            .plans()?
            .iter()
            .any(|p| p.is_active(now) && p.region_ids.contains(&region_id));
        if hot {
            info!(region_id, "region is predicted hot");
        }
        Ok(hot)
    }
}

fn validate(plan: &SchedulePlan) -> ScheduleResult<()> {
    if plan.start_time > plan.end_time {
        return Err(ScheduleError::InvalidWindow {
            id: plan.id.clone(),
            start: plan.start_time,
            end: plan.end_time,
        });
    }
    Ok(())
}

// ── In-memory ──────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct InMemoryPlanTable {
    plans: RwLock<Vec<SchedulePlan>>,
}

impl InMemoryPlanTable {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SchedulePlanTable for InMemoryPlanTable {
    fn add_plan(&self, plan: SchedulePlan) -> ScheduleResult<()> {
        validate(&plan)?;
        let mut plans = self.plans.write().unwrap_or_else(PoisonError::into_inner);
        plans.retain(|p| p.id != plan.id);
        debug!(plan = %plan.id, regions = plan.region_ids.len(), "schedule plan added");
        plans.push(plan);
        Ok(())
    }

    fn plans(&self) -> ScheduleResult<Vec<SchedulePlan>> {
        Ok(self
            .plans
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn prune_expired(&self, now: u64) -> ScheduleResult<usize> {
        let mut plans = self.plans.write().unwrap_or_else(PoisonError::into_inner);
        let before = plans.len();
        plans.retain(|p| p.end_time >= now);
        Ok(before - plans.len())
    }
}

// ── Persistent ─────────────────────────────────────────────────────

/// Plan table backed by the state store, surviving restarts.
#[derive(Clone)]
pub struct PersistentPlanTable {
    store: StateStore,
}

impl PersistentPlanTable {
    pub fn new(store: StateStore) -> Self {
        Self { store }
    }
}

impl SchedulePlanTable for PersistentPlanTable {
    fn add_plan(&self, plan: SchedulePlan) -> ScheduleResult<()> {
        validate(&plan)?;
        self.store.put_schedule_plan(&plan)?;
        Ok(())
    }

    fn plans(&self) -> ScheduleResult<Vec<SchedulePlan>> {
        Ok(self.store.list_schedule_plans()?)
    }

    fn prune_expired(&self, now: u64) -> ScheduleResult<usize> {
        let mut pruned = 0;
        for plan in self.store.list_schedule_plans()? {
            if plan.end_time < now && self.store.delete_schedule_plan(&plan.id)? {
                pruned += 1;
            }
        }
        Ok(pruned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(id: &str, regions: &[u64], start: u64, end: u64) -> SchedulePlan {
        SchedulePlan {
            id: id.to_string(),
            region_ids: regions.to_vec(),
            store_ids: vec![1],
            start_time: start,
            end_time: end,
        }
    }

    fn exercise(table: &dyn SchedulePlanTable) {
        table.add_plan(plan("a", &[7, 8], 100, 200)).unwrap();
        table.add_plan(plan("b", &[9], 150, 300)).unwrap();

        assert!(table.is_predicted_hot_region(7, 100).unwrap());
        assert!(table.is_predicted_hot_region(8, 200).unwrap());
        assert!(!table.is_predicted_hot_region(7, 201).unwrap());
        assert!(!table.is_predicted_hot_region(9, 149).unwrap());
        assert!(table.is_predicted_hot_region(9, 250).unwrap());
        assert!(!table.is_predicted_hot_region(42, 150).unwrap());

        assert_eq!(table.prune_expired(250).unwrap(), 1);
        let ids: Vec<String> = table.plans().unwrap().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["b".to_string()]);
    }

    #[test]
    fn in_memory_table() {
        exercise(&InMemoryPlanTable::new());
    }

    #[test]
    fn persistent_table() {
        let store = StateStore::open_in_memory().unwrap();
        exercise(&PersistentPlanTable::new(store));
    }

    #[test]
    fn inverted_window_rejected() {
        let table = InMemoryPlanTable::new();
        let err = table.add_plan(plan("bad", &[1], 300, 100)).unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidWindow { .. }));
        assert!(table.plans().unwrap().is_empty());
    }

    #[test]
    fn add_replaces_same_id() {
        let table = InMemoryPlanTable::new();
        table.add_plan(plan("a", &[1], 100, 200)).unwrap();
        table.add_plan(plan("a", &[2], 100, 200)).unwrap();

        let plans = table.plans().unwrap();
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].region_ids, vec![2]);
    }

    #[test]
    fn persistent_plans_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plans.redb");
        {
            let table = PersistentPlanTable::new(StateStore::open(&path).unwrap());
            table.add_plan(plan("a", &[7], 100, 200)).unwrap();
        }
        let table = PersistentPlanTable::new(StateStore::open(&path).unwrap());
        assert!(table.is_predicted_hot_region(7, 150).unwrap());
    }
}
