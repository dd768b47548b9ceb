//! Enrollment chart aggregation
//!
//! Turns a student's enrollment statuses across a pathway's offer groups into
//! per-semester counts, one colored series per reported status:
//!
//! ```text
//! offer groups ──filter(group_name)──► semesters (first-seen order)
//!      │
//!      └─► status lookups (concurrent, order kept) ──normalize──► counts
//! ```

use std::sync::Arc;

use futures::future::try_join_all;
use pathways_types::{ChartData, ChartDataset};
use tracing::{debug, warn};

use crate::enrollment::EnrollmentStatus;
use crate::error::{PathwayError, Result};
use crate::ports::{EnrollmentStatusLookup, PathwayStore};
use crate::services::offer_groups::load_offers_pathways;
use crate::types::*;

/// Display style of a status series
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusStyle {
    pub status: EnrollmentStatus,
    pub label: &'static str,
    pub background_color: &'static str,
}

/// Chart styles. A status without an entry is never charted; a status that
/// normalizes to another one is counted under that one's series.
pub const STATUS_STYLES: &[StatusStyle] = &[
    StatusStyle {
        status: EnrollmentStatus::Activated,
        label: "Enrolled",
        background_color: "rgb(0,0,255)",
    },
    StatusStyle {
        status: EnrollmentStatus::Completed,
        label: "Passed",
        background_color: "rgb(0,255,0)",
    },
    StatusStyle {
        status: EnrollmentStatus::Approved,
        label: "Passed",
        background_color: "rgb(0,255,0)",
    },
    StatusStyle {
        status: EnrollmentStatus::Unenrolled,
        label: "Unenrolled",
        background_color: "rgba(255,255,0,0.2)",
    },
    StatusStyle {
        status: EnrollmentStatus::Failed,
        label: "Failed",
        background_color: "rgb(255,99,132)",
    },
];

pub fn style_for(status: EnrollmentStatus) -> Option<&'static StatusStyle> {
    STATUS_STYLES.iter().find(|style| style.status == status)
}

/// Statuses that get their own series, in enumeration order
pub fn charted_statuses() -> impl Iterator<Item = (EnrollmentStatus, &'static StatusStyle)> {
    EnrollmentStatus::ALL
        .into_iter()
        .filter(|status| status.normalized() == *status)
        .filter_map(|status| style_for(status).map(|style| (status, style)))
}

/// Distinct semesters in first-seen order
fn distinct_semesters(groups: &[OfferGroup]) -> Vec<String> {
    let mut semesters: Vec<String> = Vec::new();
    for group in groups {
        if !semesters.contains(&group.semester) {
            semesters.push(group.semester.clone());
        }
    }
    semesters
}

pub struct EnrollmentAggregator {
    store: Arc<dyn PathwayStore>,
    lookup: Arc<dyn EnrollmentStatusLookup>,
}

impl EnrollmentAggregator {
    pub fn new(store: Arc<dyn PathwayStore>, lookup: Arc<dyn EnrollmentStatusLookup>) -> Self {
        Self { store, lookup }
    }

    /// Per-semester status counts of one student on one pathway.
    ///
    /// An empty `group_name` is treated as no filter. Any failed status
    /// lookup aborts the whole chart.
    pub async fn build_chart_data(
        &self,
        student_id: StudentId,
        pathway_id: PathwayId,
        group_name: Option<&str>,
    ) -> Result<ChartData> {
        let pathway = self
            .store
            .find_pathway(pathway_id)
            .await?
            .ok_or_else(|| PathwayError::pathway_not_found(pathway_id))?;

        let mut groups = load_offers_pathways(self.store.as_ref(), pathway.id).await?;
        if let Some(name) = group_name.filter(|name| !name.is_empty()) {
            groups.retain(|g| g.group_name == name);
        }

        let semesters = distinct_semesters(&groups);

        let lookups = groups.iter().map(|group| {
            let lookup = Arc::clone(&self.lookup);
            async move {
                lookup
                    .student_enroll_status(student_id, group.offer_id)
                    .await
                    .map(|status| (status.map(EnrollmentStatus::normalized), group.semester.as_str()))
            }
        });
        let statuses = try_join_all(lookups).await.map_err(|e| {
            warn!(
                "Status lookup failed for student {} on pathway {}: {}",
                student_id, pathway_id, e
            );
            e
        })?;

        debug!(
            student_id,
            pathway_id,
            groups = groups.len(),
            semesters = semesters.len(),
            "Aggregating enrollment chart"
        );

        let datasets = charted_statuses()
            .map(|(status, style)| ChartDataset {
                label: style.label.to_string(),
                background_color: style.background_color.to_string(),
                data: semesters
                    .iter()
                    .map(|semester| {
                        statuses
                            .iter()
                            .filter(|(s, sem)| *s == Some(status) && *sem == semester.as_str())
                            .count()
                    })
                    .collect(),
            })
            .collect();

        Ok(ChartData {
            labels: semesters,
            datasets,
        })
    }
}
