use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::roster::{score_of, ScoreColumn, Semester, StudentRecord};

/// Official six-band performance classification. The label strings are used
/// verbatim as table headers and legend keys downstream; changing them is a
/// breaking change for the frontend and the exporters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Rank {
    #[serde(rename = "Xuất sắc")]
    XuatSac,
    #[serde(rename = "Tốt")]
    Tot,
    #[serde(rename = "Khá")]
    Kha,
    #[serde(rename = "Đạt")]
    Dat,
    #[serde(rename = "Yếu")]
    Yeu,
    #[serde(rename = "Kém")]
    Kem,
}

impl Rank {
    pub const ALL: [Rank; 6] = [
        Rank::XuatSac,
        Rank::Tot,
        Rank::Kha,
        Rank::Dat,
        Rank::Yeu,
        Rank::Kem,
    ];
}

/// Band thresholds are inclusive on the lower bound and evaluated high to
/// low. No upper clamp: anything at or above 9 is Xuất sắc, anything below
/// 3.5 (negative scores included) is Kém.
pub fn rank_of(score: f64) -> Rank {
    if score >= 9.0 {
        Rank::XuatSac
    } else if score >= 8.0 {
        Rank::Tot
    } else if score >= 6.5 {
        Rank::Kha
    } else if score >= 5.0 {
        Rank::Dat
    } else if score >= 3.5 {
        Rank::Yeu
    } else {
        Rank::Kem
    }
}

/// Coursework-vs-exam consistency buckets, labeled for direct display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum DeltaGroup {
    #[serde(rename = "Thi thấp hơn quá trình")]
    ExamLower,
    #[serde(rename = "Phù hợp")]
    Consistent,
    #[serde(rename = "Thi cao hơn quá trình")]
    ExamHigher,
}

impl DeltaGroup {
    pub const ALL: [DeltaGroup; 3] = [
        DeltaGroup::ExamLower,
        DeltaGroup::Consistent,
        DeltaGroup::ExamHigher,
    ];
}

/// The open interval (-1, 1) reads as consistent; both outer thresholds are
/// inclusive.
pub fn delta_group_of(delta: f64) -> DeltaGroup {
    if delta >= 1.0 {
        DeltaGroup::ExamLower
    } else if delta <= -1.0 {
        DeltaGroup::ExamHigher
    } else {
        DeltaGroup::Consistent
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EngineError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl EngineError {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            details: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptiveStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub std_dev: f64,
}

fn finite_sorted(values: &[f64]) -> Vec<f64> {
    let mut v: Vec<f64> = values.iter().copied().filter(|x| x.is_finite()).collect();
    v.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    v
}

/// Percentile by linear interpolation on rank: pos = (n-1)*p, blend the two
/// neighbors by the fractional remainder, boundary positions pass through.
fn percentile(sorted: &[f64], p: f64) -> f64 {
    let pos = (sorted.len() as f64 - 1.0) * p;
    let base = pos.floor() as usize;
    let rest = pos - base as f64;
    match sorted.get(base + 1) {
        Some(next) => sorted[base] + rest * (next - sorted[base]),
        None => sorted[base],
    }
}

/// Descriptive statistics over a numeric sample. Non-finite values are
/// dropped first; an empty sample yields `None`, which callers must treat
/// as "no data", not as zeros.
pub fn descriptive_stats(values: &[f64]) -> Option<DescriptiveStats> {
    let sorted = finite_sorted(values);
    let n = sorted.len();
    if n == 0 {
        return None;
    }

    let mean = sorted.iter().sum::<f64>() / n as f64;
    let sq_dev = sorted.iter().map(|x| (x - mean).powi(2)).sum::<f64>();
    // Sample (n-1) denominator; a single observation has zero spread.
    let std_dev = (sq_dev / if n > 1 { (n - 1) as f64 } else { 1.0 }).sqrt();
    let q1 = percentile(&sorted, 0.25);
    let median = percentile(&sorted, 0.5);
    let q3 = percentile(&sorted, 0.75);

    Some(DescriptiveStats {
        count: n,
        min: sorted[0],
        max: sorted[n - 1],
        mean,
        median,
        q1,
        q3,
        iqr: q3 - q1,
        std_dev,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Distribution {
    pub counts: BTreeMap<Rank, usize>,
    pub percentages: BTreeMap<Rank, String>,
}

/// Share of a group's own count, one decimal place. An empty group renders
/// every share as the literal "0%" (not "0.0%").
fn format_share(part: usize, total: usize) -> String {
    if total == 0 {
        "0%".to_string()
    } else {
        format!("{:.1}%", part as f64 / total as f64 * 100.0)
    }
}

/// Six-band distribution over a sample. Every band is present in the
/// output, zero counts included, in rank order.
pub fn rank_distribution(values: &[f64]) -> Distribution {
    let mut counts: BTreeMap<Rank, usize> = Rank::ALL.iter().map(|r| (*r, 0)).collect();
    let mut total = 0usize;
    for v in values.iter().copied().filter(|v| v.is_finite()) {
        *counts.entry(rank_of(v)).or_insert(0) += 1;
        total += 1;
    }
    let percentages = counts
        .iter()
        .map(|(r, c)| (*r, format_share(*c, total)))
        .collect();
    Distribution { counts, percentages }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeltaDistribution {
    pub counts: BTreeMap<DeltaGroup, usize>,
    pub percentages: BTreeMap<DeltaGroup, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeltaStats {
    pub name: String,
    pub n: usize,
    #[serde(rename = "meanTX")]
    pub mean_tx: f64,
    #[serde(rename = "meanCK")]
    pub mean_ck: f64,
    pub delta: f64,
    pub distribution: DeltaDistribution,
}

/// A student joins delta analysis only with finite values on both sides;
/// anyone else is excluded outright rather than counted as zero-delta.
fn has_delta_pair(s: &StudentRecord) -> bool {
    s.continuous_average.is_finite() && s.final_score.is_finite()
}

/// Coursework-vs-exam discrepancy for one group (a class or a cohort).
///
/// Δ = mean(TX) − mean(CK): positive means the exam came in under the
/// coursework. The group delta is the difference of the group means, not
/// the mean of per-student deltas. With no valid students the means and
/// delta are 0 and every share is "0%"; callers tolerate that degenerate
/// shape instead of receiving an error.
pub fn delta_stats(students: &[StudentRecord], name: &str) -> DeltaStats {
    let valid: Vec<&StudentRecord> = students.iter().filter(|s| has_delta_pair(s)).collect();
    let n = valid.len();

    let mean_tx = if n > 0 {
        valid.iter().map(|s| s.continuous_average).sum::<f64>() / n as f64
    } else {
        0.0
    };
    let mean_ck = if n > 0 {
        valid.iter().map(|s| s.final_score).sum::<f64>() / n as f64
    } else {
        0.0
    };
    let delta = mean_tx - mean_ck;

    let mut counts: BTreeMap<DeltaGroup, usize> =
        DeltaGroup::ALL.iter().map(|g| (*g, 0)).collect();
    for s in &valid {
        let d = s.continuous_average - s.final_score;
        *counts.entry(delta_group_of(d)).or_insert(0) += 1;
    }
    let percentages = counts
        .iter()
        .map(|(g, c)| (*g, format_share(*c, n)))
        .collect();

    DeltaStats {
        name: name.to_string(),
        n,
        mean_tx,
        mean_ck,
        delta,
        distribution: DeltaDistribution { counts, percentages },
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassScoreStats {
    pub name: String,
    pub scores: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<DescriptiveStats>,
    pub distribution: Distribution,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortScoreStats {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub descriptive: Option<DescriptiveStats>,
    pub distribution: Distribution,
}

/// Per-class statistics over the selected column, class names ascending.
/// A class stays listed even when none of its records carry the selected
/// value (empty sample, absent stats).
pub fn stats_by_class(
    records: &[StudentRecord],
    column: ScoreColumn,
    semester: Semester,
) -> Vec<ClassScoreStats> {
    let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for s in records {
        let entry = groups.entry(s.class_name.clone()).or_default();
        if let Some(v) = score_of(s, column, semester) {
            entry.push(v);
        }
    }
    groups
        .into_iter()
        .map(|(name, scores)| ClassScoreStats {
            stats: descriptive_stats(&scores),
            distribution: rank_distribution(&scores),
            name,
            scores,
        })
        .collect()
}

/// One unpartitioned computation over the whole filtered set.
pub fn overall_stats(
    records: &[StudentRecord],
    column: ScoreColumn,
    semester: Semester,
) -> CohortScoreStats {
    let scores: Vec<f64> = records
        .iter()
        .filter_map(|s| score_of(s, column, semester))
        .collect();
    CohortScoreStats {
        descriptive: descriptive_stats(&scores),
        distribution: rank_distribution(&scores),
    }
}

/// Per-class delta analysis, widest positive gap first. Ties keep the
/// class-name order from the grouping.
pub fn delta_by_class(records: &[StudentRecord]) -> Vec<DeltaStats> {
    let mut groups: BTreeMap<String, Vec<StudentRecord>> = BTreeMap::new();
    for s in records {
        groups.entry(s.class_name.clone()).or_default().push(s.clone());
    }
    let mut out: Vec<DeltaStats> = groups
        .iter()
        .map(|(name, members)| delta_stats(members, name))
        .collect();
    out.sort_by(|a, b| b.delta.partial_cmp(&a.delta).unwrap_or(Ordering::Equal));
    out
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentDelta {
    pub id: String,
    pub name: String,
    pub class_name: String,
    pub continuous_average: f64,
    #[serde(rename = "final")]
    pub final_score: f64,
    pub delta: f64,
    pub group: DeltaGroup,
}

/// Detail rows for the per-student delta table; invalid pairs are left out
/// so renderers need no arithmetic or guards of their own.
pub fn student_deltas(records: &[StudentRecord]) -> Vec<StudentDelta> {
    records
        .iter()
        .filter(|s| has_delta_pair(s))
        .map(|s| {
            let delta = s.continuous_average - s.final_score;
            StudentDelta {
                id: s.id.clone(),
                name: s.name.clone(),
                class_name: s.class_name.clone(),
                continuous_average: s.continuous_average,
                final_score: s.final_score,
                delta,
                group: delta_group_of(delta),
            }
        })
        .collect()
}
