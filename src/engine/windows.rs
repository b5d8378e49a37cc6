use crate::model::Span;

// ── Free-window algebra ──────────────────────────────────────────
//
// Powers the schedule board's open-slot listing: the free windows of a
// resource are the query window minus the union of its event spans.

/// Merge sorted overlapping/adjacent intervals into disjoint intervals.
pub fn merge_overlapping(sorted: &[Span]) -> Vec<Span> {
    let mut merged: Vec<Span> = Vec::new();
    for &span in sorted {
        if let Some(last) = merged.last_mut()
            && span.start <= last.end {
                last.end = last.end.max(span.end);
                continue;
            }
        merged.push(span);
    }
    merged
}

/// Subtract a sorted, disjoint set of intervals from a sorted base set.
pub fn subtract_intervals(base: &[Span], to_remove: &[Span]) -> Vec<Span> {
    let mut result = Vec::new();
    let mut ri = 0;

    for &b in base {
        let mut cursor = b.start;

        while ri < to_remove.len() && to_remove[ri].end <= cursor {
            ri += 1;
        }

        let mut j = ri;
        while j < to_remove.len() && to_remove[j].start < b.end {
            let r = &to_remove[j];
            if r.start > cursor {
                result.push(Span::new(cursor, r.start));
            }
            cursor = cursor.max(r.end);
            j += 1;
        }

        if cursor < b.end {
            result.push(Span::new(cursor, b.end));
        }
    }

    result
}

/// Free sub-windows of `query` not covered by any span in `occupied`
/// (unsorted, possibly overlapping; clamped to the query window first).
pub fn free_spans(occupied: &[Span], query: &Span) -> Vec<Span> {
    let mut clamped: Vec<Span> = occupied
        .iter()
        .filter(|s| s.overlaps(query))
        .map(|s| Span::new(s.start.max(query.start), s.end.min(query.end)))
        .collect();
    if clamped.is_empty() {
        return vec![*query];
    }
    clamped.sort_by_key(|s| s.start);
    let merged = merge_overlapping(&clamped);
    subtract_intervals(&[*query], &merged)
}
