// Path: crates/vmcore-scheduler/src/merge.rs
//! `sort_access_blocks(workers)` (spec.md §4.6): a parallel k-way merge over
//! every request's declared access map, producing one globally-sorted
//! `app -> chunk -> [AccessBlockInfo]` map. Within a chunk, the final order
//! is `(offset ascending, access type in the fixed order check_only <
//! writable < read_only < int_additive, requestID ascending)`.

use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::btree_map::Entry;
use vmcore_heap::AccessMap;
use vmcore_types::DeclaredAccess;

use crate::request::AppRequestInfo;

/// The fixed commit/collision ordering of spec.md §4.6.
fn cmp_entry(a: &DeclaredAccess, b: &DeclaredAccess) -> Ordering {
    a.offset
        .cmp(&b.offset)
        .then_with(|| a.access_type.cmp(&b.access_type))
        .then_with(|| a.request_id.cmp(&b.request_id))
}

/// Merges `b` into `a`, keeping every per-key vector sorted by
/// [`cmp_entry`]. Used both as the shard builder's fold and as the pairwise
/// reduce step of the k-way merge, so a shard of one request and the full
/// merge share one code path.
fn merge_into(mut a: AccessMap, b: AccessMap) -> AccessMap {
    for (key, entries) in b {
        match a.entry(key) {
            Entry::Occupied(mut existing) => {
                let merged = existing.get_mut();
                merged.extend(entries);
                merged.sort_by(cmp_entry);
            }
            Entry::Vacant(slot) => {
                slot.insert(entries);
            }
        }
    }
    a
}

/// Builds one shard's sorted partial map from a slice of requests.
fn build_shard(requests: &[AppRequestInfo]) -> AccessMap {
    let mut local: AccessMap = AccessMap::new();
    for request in requests {
        for (key, entries) in &request.memory_access_map {
            local.entry(*key).or_default().extend(entries.iter().copied());
        }
    }
    for entries in local.values_mut() {
        entries.sort_by(cmp_entry);
    }
    local
}

/// Divides `requests` into `workers` shards, sorts each shard's map in
/// parallel, then merges shards pairwise via an ordered-static-map union
/// that preserves per-key insertion order when combining (spec.md §4.6).
pub fn sort_access_blocks(requests: &[AppRequestInfo], workers: usize) -> AccessMap {
    let workers = workers.max(1);
    if requests.is_empty() {
        return AccessMap::new();
    }
    let shard_size = requests.len().div_ceil(workers).max(1);
    requests
        .par_chunks(shard_size)
        .map(build_shard)
        .reduce(AccessMap::new, merge_into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vmcore_types::{AccessType, LongID, LongLongID};

    fn declared(offset: i64, access_type: AccessType, request_id: u32) -> DeclaredAccess {
        DeclaredAccess {
            offset,
            size: 8,
            access_type,
            request_id,
            new_size: None,
        }
    }

    fn request(id: u32, key: (LongID, LongLongID), entries: Vec<DeclaredAccess>) -> AppRequestInfo {
        AppRequestInfo {
            id,
            called_app_id: key.0,
            memory_access_map: vec![(key, entries)],
            adjacency: Vec::new(),
            attachments: Vec::new(),
            digest: vmcore_types::Digest::ZERO,
            http_request: vmcore_types::HttpRequest::default(),
        }
    }

    #[test]
    fn merges_and_sorts_across_shards() {
        let key = (LongID(1), LongLongID::new(LongID(2), LongID(3)));
        let requests = vec![
            request(0, key, vec![declared(8, AccessType::Writable, 0)]),
            request(1, key, vec![declared(0, AccessType::ReadOnly, 1)]),
            request(2, key, vec![declared(0, AccessType::Writable, 2)]),
        ];

        let merged = sort_access_blocks(&requests, 3);
        let entries = merged.get(&key).expect("key present");
        assert_eq!(entries.len(), 3);
        // offset 0 entries come first; within offset 0, writable (1) sorts
        // before read_only (2) per the fixed access-type order.
        assert_eq!(entries[0].access_type, AccessType::Writable);
        assert_eq!(entries[0].request_id, 2);
        assert_eq!(entries[1].access_type, AccessType::ReadOnly);
        assert_eq!(entries[1].request_id, 1);
        assert_eq!(entries[2].offset, 8);
    }

    #[test]
    fn single_worker_still_produces_correct_order() {
        let key = (LongID(1), LongLongID::new(LongID(2), LongID(3)));
        let requests = vec![request(
            0,
            key,
            vec![
                declared(4, AccessType::IntAdditive, 0),
                declared(0, AccessType::CheckOnly, 0),
            ],
        )];
        let merged = sort_access_blocks(&requests, 1);
        let entries = merged.get(&key).unwrap();
        assert_eq!(entries[0].offset, 0);
        assert_eq!(entries[1].offset, 4);
    }
}
