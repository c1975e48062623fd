//! Module: merge
//! Responsibility: ordered two-way merge of two already filtered and
//! projected row sequences, by `EntryId`.
//! Does not own: scanning (`range`) or which side wins a field collision on
//! tie (neither side "wins" a field merge — ties simply emit the left row
//! and advance past both).

use crate::range::RangeRow;

/// Merge two ascending `(EntryId, Record)` sequences into one ascending
/// sequence. On an id tie, the left row is emitted and both cursors advance
/// — this is a merge of a total order, not a left/right join, so a tie
/// never produces two output rows for the same id.
///
/// Known defect in prior designs: resuming a tail flush from a fixed or
/// undefined index after the shorter side is exhausted. This implementation
/// resumes each side's tail flush from its own live cursor.
#[must_use]
pub fn merge(left: Vec<RangeRow>, right: Vec<RangeRow>) -> Vec<RangeRow> {
    let mut out = Vec::with_capacity(left.len() + right.len());
    let mut li = 0;
    let mut ri = 0;

    while li < left.len() && ri < right.len() {
        match left[li].0.cmp(&right[ri].0) {
            std::cmp::Ordering::Less => {
                out.push(left[li].clone());
                li += 1;
            }
            std::cmp::Ordering::Greater => {
                out.push(right[ri].clone());
                ri += 1;
            }
            std::cmp::Ordering::Equal => {
                out.push(left[li].clone());
                li += 1;
                ri += 1;
            }
        }
    }

    out.extend_from_slice(&left[li..]);
    out.extend_from_slice(&right[ri..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::EntryId;
    use crate::record::Record;

    fn row(ts: u64) -> RangeRow {
        (EntryId::new(ts, 0), Record::new(vec![]))
    }

    #[test]
    fn interleaves_disjoint_ids() {
        let left = vec![row(1), row(3), row(5)];
        let right = vec![row(2), row(4)];
        let merged = merge(left, right);
        let ids: Vec<_> = merged.iter().map(|(id, _)| id.timestamp).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn tie_emits_once_and_advances_both() {
        let left = vec![row(1), row(2)];
        let right = vec![row(2), row(3)];
        let merged = merge(left, right);
        let ids: Vec<_> = merged.iter().map(|(id, _)| id.timestamp).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn tail_flush_resumes_from_live_cursor_on_both_sides() {
        // left exhausted first: right's remaining tail, starting mid-way
        // through its own slice, must still all appear.
        let left = vec![row(1)];
        let right = vec![row(1), row(2), row(3), row(4)];
        let merged = merge(left, right);
        let ids: Vec<_> = merged.iter().map(|(id, _)| id.timestamp).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);

        // right exhausted first, symmetric case.
        let left = vec![row(1), row(2), row(3), row(4)];
        let right = vec![row(1)];
        let merged = merge(left, right);
        let ids: Vec<_> = merged.iter().map(|(id, _)| id.timestamp).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);
    }

    #[test]
    fn empty_sides_are_handled() {
        assert_eq!(merge(vec![], vec![]).len(), 0);
        assert_eq!(merge(vec![row(1)], vec![]).len(), 1);
        assert_eq!(merge(vec![], vec![row(1)]).len(), 1);
    }
}
