//! Workload-text segmentation for the query execution state machine.
//!
//! A workload query's raw text may carry auxiliary statements around the one
//! terminal select: `create view` statements executed during Prepare and
//! `drop view` statements executed during Cleanup. Segmentation is on the
//! statement separator, matching by substring the way the workloads are
//! written (no full SQL parse).

/// Statements to execute during Prepare, in order of appearance.
pub fn view_statements(text: &str) -> Vec<&str> {
    text.split(';')
        .filter(|segment| segment.contains("create view"))
        .collect()
}

/// The terminal select statement of the workload text, if any.
///
/// View-creation segments contain a select of their own and are skipped; the
/// first remaining segment mentioning `select` wins.
pub fn terminal_select(text: &str) -> Option<&str> {
    text.split(';').find(|segment| {
        !segment.contains("create view")
            && (segment.contains("select") || segment.contains("SELECT"))
    })
}

/// Statements to execute during Cleanup, in order of appearance.
pub fn drop_view_statements(text: &str) -> Vec<&str> {
    text.split(';')
        .filter(|segment| segment.contains("drop view"))
        .collect()
}
