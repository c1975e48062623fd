//! Bucket engine: fans scanned entries out into one accumulator set per
//! timestamp bucket, then finalises each bucket into a `Record`.

use super::accumulator::Accumulator;
use super::{AggregateKind, AggregateSpec, BucketFields};
use crate::id::EntryId;
use crate::record::Record;
use std::collections::{BTreeMap, HashMap};

pub(super) fn run<'a>(
    spec: &AggregateSpec,
    entries: impl Iterator<Item = (EntryId, &'a Record)>,
) -> Vec<(u64, BucketFields)> {
    let mut buckets: BTreeMap<u64, Vec<Accumulator>> = BTreeMap::new();

    for (id, record) in entries {
        let bucket_start = (id.timestamp / spec.time_bucket) * spec.time_bucket;
        let slots = buckets
            .entry(bucket_start)
            .or_insert_with(|| spec.fields.iter().map(|(_, kind)| Accumulator::new(*kind)).collect());
        for ((field, _), accumulator) in spec.fields.iter().zip(slots.iter_mut()) {
            accumulator.apply(record.get(field));
        }
    }

    buckets
        .into_iter()
        .map(|(bucket_start, accumulators)| (bucket_start, finalize_bucket(spec, accumulators)))
        .collect()
}

/// Group finalised `(field, kind, value)` triples by field name in
/// first-occurrence order, keeping every `(kind, value)` pair for fields
/// requested more than once under different kinds. Returns the nested shape
/// directly — `range`-family replies read this as-is; only the `copy` store
/// writer flattens it (`flatten_to_record`).
fn finalize_bucket(spec: &AggregateSpec, accumulators: Vec<Accumulator>) -> BucketFields {
    let mut order: Vec<String> = Vec::new();
    let mut grouped: HashMap<String, Vec<(AggregateKind, String)>> = HashMap::new();

    for ((field, kind), accumulator) in spec.fields.iter().zip(accumulators) {
        let rendered = accumulator.finalize(spec.time_bucket);
        grouped.entry(field.clone()).or_insert_with(|| {
            order.push(field.clone());
            Vec::new()
        });
        grouped.get_mut(field).expect("just inserted").push((*kind, rendered));
    }

    order
        .into_iter()
        .map(|field| {
            let kinds = grouped.remove(&field).expect("field tracked in order");
            (field, kinds)
        })
        .collect()
}
