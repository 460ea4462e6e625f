//! Scaling history persisted in the policy's annotation bag.
//!
//! ```text
//! lastAutoScalingTimestamp.<component>  -> "1718000000"   (unix seconds)
//! autoScalingOutOrdinals.<component>    -> "[3,4,5]"      (storage only)
//! ```
//!
//! Policies that drive several clusters suffix each key with
//! `@<namespace>/<name>` so clusters keep independent cool-downs.

use std::collections::{BTreeMap, BTreeSet};

use tidescale_state::{ClusterRef, MemberType};

use crate::error::{AutoScaleError, AutoScaleResult};

pub const LAST_SCALE_TIMESTAMP_PREFIX: &str = "lastAutoScalingTimestamp";
pub const SCALE_OUT_ORDINALS_PREFIX: &str = "autoScalingOutOrdinals";

/// Annotation keys for one component of one cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryKeys {
    pub timestamp: String,
    pub ordinals: String,
}

impl HistoryKeys {
    pub fn new(member: MemberType, scope: Option<&ClusterRef>) -> Self {
        let suffix = scope.map(|c| format!("@{c}")).unwrap_or_default();
        Self {
            timestamp: format!("{LAST_SCALE_TIMESTAMP_PREFIX}.{member}{suffix}"),
            ordinals: format!("{SCALE_OUT_ORDINALS_PREFIX}.{member}{suffix}"),
        }
    }
}

/// Last recorded scale time, if any.
pub fn last_scale_timestamp(
    annotations: &BTreeMap<String, String>,
    keys: &HistoryKeys,
) -> AutoScaleResult<Option<u64>> {
    match annotations.get(&keys.timestamp) {
        None => Ok(None),
        Some(raw) => raw.trim().parse::<u64>().map(Some).map_err(|e| {
            AutoScaleError::Config(format!(
                "annotation {}={raw:?} is not unix seconds: {e}",
                keys.timestamp
            ))
        }),
    }
}

/// Ordinals created by earlier scale-outs that nothing has consumed yet.
pub fn pending_ordinals(
    annotations: &BTreeMap<String, String>,
    keys: &HistoryKeys,
) -> AutoScaleResult<BTreeSet<i32>> {
    match annotations.get(&keys.ordinals) {
        None => Ok(BTreeSet::new()),
        Some(raw) => {
            let list: Vec<i32> = serde_json::from_str(raw).map_err(AutoScaleError::Encoding)?;
            Ok(list.into_iter().collect())
        }
    }
}

/// Encode an ordinal set as a sorted JSON array.
pub fn encode_ordinals(ordinals: &BTreeSet<i32>) -> AutoScaleResult<String> {
    let list: Vec<i32> = ordinals.iter().copied().collect();
    serde_json::to_string(&list).map_err(AutoScaleError::Encoding)
}

/// The slots a replica set with `replicas` replicas occupies.
///
/// Slots are handed out in ascending order starting from zero, skipping
/// anything listed in `delete_slots`.
pub fn pod_ordinals(replicas: i32, delete_slots: &BTreeSet<i32>) -> BTreeSet<i32> {
    let wanted = replicas.max(0) as usize;
    (0..)
        .filter(|ordinal| !delete_slots.contains(ordinal))
        .take(wanted)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotations(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn keys_for_single_cluster_policy() {
        let keys = HistoryKeys::new(MemberType::Sql, None);
        assert_eq!(keys.timestamp, "lastAutoScalingTimestamp.sql");
        assert_eq!(keys.ordinals, "autoScalingOutOrdinals.sql");
    }

    #[test]
    fn keys_scoped_to_cluster() {
        let cluster = ClusterRef::new("db", "east");
        let keys = HistoryKeys::new(MemberType::Storage, Some(&cluster));
        assert_eq!(keys.timestamp, "lastAutoScalingTimestamp.storage@db/east");
        assert_eq!(keys.ordinals, "autoScalingOutOrdinals.storage@db/east");
    }

    #[test]
    fn timestamp_absent_or_parsed() {
        let keys = HistoryKeys::new(MemberType::Sql, None);
        assert_eq!(last_scale_timestamp(&BTreeMap::new(), &keys).unwrap(), None);

        let ann = annotations(&[("lastAutoScalingTimestamp.sql", "1700000000")]);
        assert_eq!(last_scale_timestamp(&ann, &keys).unwrap(), Some(1_700_000_000));
    }

    #[test]
    fn malformed_timestamp_is_config_error() {
        let keys = HistoryKeys::new(MemberType::Sql, None);
        let ann = annotations(&[("lastAutoScalingTimestamp.sql", "yesterday")]);
        assert!(matches!(
            last_scale_timestamp(&ann, &keys),
            Err(AutoScaleError::Config(_))
        ));
    }

    #[test]
    fn ordinals_decode_and_encode_sorted() {
        let keys = HistoryKeys::new(MemberType::Storage, None);
        let ann = annotations(&[("autoScalingOutOrdinals.storage", "[5,3,4]")]);
        let set = pending_ordinals(&ann, &keys).unwrap();
        assert_eq!(set, BTreeSet::from([3, 4, 5]));
        assert_eq!(encode_ordinals(&set).unwrap(), "[3,4,5]");
    }

    #[test]
    fn malformed_ordinals_is_encoding_error() {
        let keys = HistoryKeys::new(MemberType::Storage, None);
        let ann = annotations(&[("autoScalingOutOrdinals.storage", "3,4")]);
        assert!(matches!(
            pending_ordinals(&ann, &keys),
            Err(AutoScaleError::Encoding(_))
        ));
    }

    #[test]
    fn pod_ordinals_skip_deleted_slots() {
        assert_eq!(pod_ordinals(3, &BTreeSet::new()), BTreeSet::from([0, 1, 2]));
        assert_eq!(
            pod_ordinals(3, &BTreeSet::from([1])),
            BTreeSet::from([0, 2, 3])
        );
        assert_eq!(
            pod_ordinals(4, &BTreeSet::from([0, 4])),
            BTreeSet::from([1, 2, 3, 5])
        );
        assert!(pod_ordinals(0, &BTreeSet::new()).is_empty());
        assert!(pod_ordinals(-2, &BTreeSet::new()).is_empty());
    }
}
