//! JSON export of collected evaluations.

use std::collections::HashMap;

use serde::Serialize;

use crate::model::{Evaluation, Report, UserId};

/// One exported evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportRecord {
    pub url: String,
    pub title: String,
    #[serde(rename = "tgID")]
    pub user_id: UserId,
    pub content: String,
    pub performance: Option<u8>,
    pub comment: String,
}

/// Pair each evaluation with its listed report, in schedule order.
///
/// Evaluations whose report was removed from the schedule are left out.
pub fn export_records(reports: &[Report], evaluations: &[Evaluation]) -> Vec<ExportRecord> {
    let mut by_url: HashMap<&str, Vec<&Evaluation>> = HashMap::new();
    for evaluation in evaluations {
        by_url
            .entry(evaluation.url.as_str())
            .or_default()
            .push(evaluation);
    }

    reports
        .iter()
        .flat_map(|report| {
            by_url
                .remove(report.url.as_str())
                .unwrap_or_default()
                .into_iter()
                .map(move |e| ExportRecord {
                    url: e.url.clone(),
                    title: report.title.clone(),
                    user_id: e.user_id,
                    content: e.content.encode(),
                    performance: e.performance.map(|p| p.get()),
                    comment: e.comment.clone(),
                })
        })
        .collect()
}

/// Serialize records as a pretty-printed JSON array.
pub fn to_json(records: &[ExportRecord]) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec_pretty(records)
}
