//! Module: range
//! Responsibility: the shared scan → filter → project pipeline behind
//! `RANGE`, `REVRANGE`, `POPRANGE`, and the left/right sides of `MERGE`.
//! Does not own: aggregation (applied by the caller over this pipeline's
//! output) or reply formatting.

use crate::error::EngineResult;
use crate::filter::Predicate;
use crate::id::EntryId;
use crate::record::{ProjectionMode, Record};
use crate::stream::Stream;

/// One resolved `(EntryId, Record)` pair after filtering and projection,
/// still carrying its id for merge/aggregation to bucket or order by.
pub type RangeRow = (EntryId, Record);

#[derive(Clone, Debug, Default)]
pub struct RangeOptions {
    pub limit: Option<usize>,
    pub filter: Option<Predicate>,
    pub projection: ProjectionMode,
}

/// Result of one scan pass: the filtered+projected rows, plus how many raw
/// rows the collaborator actually returned before filtering — the pair the
/// diagnostics trace (§4.J) needs to report rows filtered out.
#[derive(Clone, Debug, Default)]
pub struct ScanReport {
    pub rows: Vec<RangeRow>,
    pub scanned: usize,
}

/// Scan `min..=max` ascending, filter, then project. The count limit is
/// applied to filtered-in rows, not to raw scanned rows, so the collaborator
/// is asked for an unbounded scan whenever a filter is present.
pub fn scan_forward(
    stream: &impl Stream,
    min: EntryId,
    max: EntryId,
    options: &RangeOptions,
) -> EngineResult<ScanReport> {
    let collaborator_limit = if options.filter.is_some() { None } else { options.limit };
    let raw = stream.scan(min, max, collaborator_limit)?;
    let scanned = raw.len();
    Ok(ScanReport {
        rows: apply(raw, options),
        scanned,
    })
}

/// As `scan_forward`, but descending.
pub fn scan_backward(
    stream: &impl Stream,
    min: EntryId,
    max: EntryId,
    options: &RangeOptions,
) -> EngineResult<ScanReport> {
    let collaborator_limit = if options.filter.is_some() { None } else { options.limit };
    let raw = stream.scan_rev(min, max, collaborator_limit)?;
    let scanned = raw.len();
    Ok(ScanReport {
        rows: apply(raw, options),
        scanned,
    })
}

fn apply(raw: Vec<(EntryId, Record)>, options: &RangeOptions) -> Vec<RangeRow> {
    let mut out = Vec::new();
    for (id, record) in raw {
        if let Some(predicate) = &options.filter {
            if !crate::filter::evaluate(predicate, &record) {
                continue;
            }
        }
        out.push((id, options.projection.apply(&record)));
        if let Some(limit) = options.limit {
            if out.len() >= limit {
                break;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStream;

    fn seeded() -> MemoryStream {
        let mut stream = MemoryStream::new();
        for (ts, temp) in [(1, "10"), (2, "20"), (3, "30"), (4, "40")] {
            stream
                .append(EntryId::new(ts, 0), Record::new(vec![("temp".to_string(), temp.to_string())]))
                .unwrap();
        }
        stream
    }

    #[test]
    fn forward_scan_respects_limit_after_filtering() {
        let stream = seeded();
        let predicate = crate::filter::compile(&["temp>15".to_string()]).unwrap();
        let options = RangeOptions {
            limit: Some(2),
            filter: Some(predicate),
            projection: ProjectionMode::None,
        };
        let report = scan_forward(&stream, EntryId::min(), EntryId::max(), &options).unwrap();
        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.rows[0].0, EntryId::new(2, 0));
        assert_eq!(report.rows[1].0, EntryId::new(3, 0));
        assert_eq!(report.scanned, 4);
    }

    #[test]
    fn backward_scan_reverses_order() {
        let stream = seeded();
        let options = RangeOptions::default();
        let report = scan_backward(&stream, EntryId::min(), EntryId::max(), &options).unwrap();
        let ids: Vec<_> = report.rows.iter().map(|(id, _)| id.timestamp).collect();
        assert_eq!(ids, vec![4, 3, 2, 1]);
        assert_eq!(report.scanned, 4);
    }
}
