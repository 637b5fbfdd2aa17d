use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::calc::{rank_of, EngineError, Rank};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Semester {
    #[serde(rename = "HK1")]
    First,
    #[serde(rename = "HK2")]
    Second,
    #[serde(rename = "CN")]
    FullYear,
}

impl Semester {
    pub fn parse(s: &str) -> Option<Semester> {
        match s {
            "HK1" => Some(Semester::First),
            "HK2" => Some(Semester::Second),
            "CN" => Some(Semester::FullYear),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Semester::First => "HK1",
            Semester::Second => "HK2",
            Semester::FullYear => "CN",
        }
    }
}

/// Which numeric column general statistics run over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScoreColumn {
    #[serde(rename = "dtb")]
    TermAverage,
    #[serde(rename = "ck")]
    Final,
    #[serde(rename = "avgTX")]
    Continuous,
}

impl ScoreColumn {
    pub fn parse(s: &str) -> Option<ScoreColumn> {
        match s {
            "dtb" => Some(ScoreColumn::TermAverage),
            "ck" => Some(ScoreColumn::Final),
            "avgTX" => Some(ScoreColumn::Continuous),
            _ => None,
        }
    }
}

/// Canonical per-student record for one reporting view (a term, or the
/// merged full year).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRecord {
    pub id: String,
    pub name: String,
    pub class_name: String,
    pub grade: String,
    pub birthday: String,
    pub continuous_average: f64,
    pub midterm: f64,
    #[serde(rename = "final")]
    pub final_score: f64,
    pub term_average: f64,
    pub rank: Rank,
    /// Only set on merged full-year views, and only when the raw
    /// second-term row existed. `Some(0.0)` means "present, scored zero";
    /// `None` means "no data" and is omitted from the serialized record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_year_average: Option<f64>,
    pub is_missing_second_term: bool,
}

fn text_field(raw: &Map<String, Value>, key: &str) -> String {
    match raw.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Missing or non-numeric cells read as 0, never as an error: a report must
/// survive a malformed row.
fn score_field(raw: &Map<String, Value>, key: &str) -> f64 {
    match raw.get(key) {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Grade label is the first digit run of the class name ("10A3" -> "10").
fn leading_digits(class_name: &str) -> String {
    let digits: String = class_name
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.is_empty() {
        "Unknown".to_string()
    } else {
        digits
    }
}

/// Map one raw report-card row to a canonical record for the given term.
///
/// Column names are fixed by the exporter, diacritics included: `ID`,
/// `Họ và tên`, `Lớp`, `Ngày sinh`, `ĐBQtx`, and the term-specific
/// `GK1`/`CK1`/`ĐTBhk1` or `GK2`/`CK2`/`ĐTBhk2`. Unknown columns are
/// ignored; the rank comes straight off the term average.
pub fn normalize_row(raw: &Map<String, Value>, term: Semester) -> StudentRecord {
    let (midterm_col, final_col, average_col) = match term {
        Semester::First => ("GK1", "CK1", "ĐTBhk1"),
        _ => ("GK2", "CK2", "ĐTBhk2"),
    };

    let class_name = text_field(raw, "Lớp");
    let term_average = score_field(raw, average_col);

    StudentRecord {
        id: text_field(raw, "ID"),
        name: text_field(raw, "Họ và tên"),
        grade: leading_digits(&class_name),
        class_name,
        birthday: text_field(raw, "Ngày sinh"),
        continuous_average: score_field(raw, "ĐBQtx"),
        midterm: score_field(raw, midterm_col),
        final_score: score_field(raw, final_col),
        rank: rank_of(term_average),
        term_average,
        full_year_average: None,
        is_missing_second_term: false,
    }
}

/// Build the full-year view, anchored on the first-term roster.
///
/// The year average comes from the raw second-term row because the exporter
/// only emits `TBcn` there. A missing raw row leaves the average out
/// entirely and the first-term rank stands; a present row with a blank cell
/// reads as 0.0 and re-ranks. Students that only appear in the second term
/// are not part of the year-end roster.
pub fn merge_semesters(
    first: &[StudentRecord],
    second: &[StudentRecord],
    raw_second: &[Map<String, Value>],
) -> Vec<StudentRecord> {
    let second_ids: HashSet<&str> = second.iter().map(|s| s.id.as_str()).collect();
    let raw_by_id: HashMap<String, &Map<String, Value>> = raw_second
        .iter()
        .map(|r| (text_field(r, "ID"), r))
        .collect();

    first
        .iter()
        .map(|s1| {
            let mut merged = s1.clone();
            merged.is_missing_second_term = !second_ids.contains(s1.id.as_str());
            if let Some(raw) = raw_by_id.get(&s1.id) {
                let year_average = score_field(raw, "TBcn");
                merged.full_year_average = Some(year_average);
                merged.rank = rank_of(year_average);
            }
            merged
        })
        .collect()
}

/// Imported rows for one grade cohort. Re-imports replace the slot; the raw
/// second-term rows are retained because the merge reads `TBcn` from them.
#[derive(Debug, Default)]
pub struct GradeDataset {
    pub first_term: Vec<StudentRecord>,
    pub second_term: Vec<StudentRecord>,
    pub raw_second_term: Vec<Map<String, Value>>,
    pub imported_at: Option<DateTime<Utc>>,
}

/// Records of one grade slot for the requested reporting view.
pub fn semester_view(data: &GradeDataset, semester: Semester) -> Vec<StudentRecord> {
    match semester {
        Semester::First => data.first_term.clone(),
        Semester::Second => data.second_term.clone(),
        Semester::FullYear => {
            merge_semesters(&data.first_term, &data.second_term, &data.raw_second_term)
        }
    }
}

/// Concatenated view across every grade slot, in grade order.
pub fn cohort_view(cohorts: &BTreeMap<String, GradeDataset>, semester: Semester) -> Vec<StudentRecord> {
    let mut out = Vec::new();
    for data in cohorts.values() {
        out.extend(semester_view(data, semester));
    }
    out
}

/// Active view selection. `None` for grade/class means no filtering.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewFilters {
    pub semester: Semester,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    pub column: ScoreColumn,
}

fn parse_selector(v: Option<&Value>, key: &str) -> Result<Option<String>, EngineError> {
    match v {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => {
            let t = s.trim();
            if t.is_empty() || t.eq_ignore_ascii_case("all") {
                Ok(None)
            } else {
                Ok(Some(t.to_string()))
            }
        }
        Some(_) => Err(EngineError::new(
            "bad_params",
            format!("filters.{} must be a string or null", key),
        )),
    }
}

/// Parse the `filters` request object. `"All"` (any casing) and null mean
/// "no filter", matching the frontend's filter bar; the analysis column
/// defaults to the term average.
pub fn parse_view_filters(raw: Option<&Value>) -> Result<ViewFilters, EngineError> {
    let Some(raw) = raw else {
        return Err(EngineError::new("bad_params", "missing filters"));
    };
    let Some(obj) = raw.as_object() else {
        return Err(EngineError::new("bad_params", "filters must be an object"));
    };

    let semester = match obj.get("semester").and_then(|v| v.as_str()) {
        Some(s) => Semester::parse(s).ok_or_else(|| {
            EngineError::new("bad_params", "filters.semester must be one of: HK1, HK2, CN")
        })?,
        None => return Err(EngineError::new("bad_params", "missing filters.semester")),
    };

    let grade = parse_selector(obj.get("grade"), "grade")?;
    let class_name = parse_selector(obj.get("className"), "className")?;

    let column = match obj.get("column") {
        None | Some(Value::Null) => ScoreColumn::TermAverage,
        Some(v) => match v.as_str().and_then(ScoreColumn::parse) {
            Some(c) => c,
            None => {
                return Err(EngineError::new(
                    "bad_params",
                    "filters.column must be one of: dtb, ck, avgTX",
                ))
            }
        },
    };

    Ok(ViewFilters {
        semester,
        grade,
        class_name,
        column,
    })
}

pub fn apply_filters(records: Vec<StudentRecord>, filters: &ViewFilters) -> Vec<StudentRecord> {
    records
        .into_iter()
        .filter(|s| {
            filters.grade.as_deref().map(|g| s.grade == g).unwrap_or(true)
                && filters
                    .class_name
                    .as_deref()
                    .map(|c| s.class_name == c)
                    .unwrap_or(true)
        })
        .collect()
}

/// Value of the selected analysis column for one record. Under the
/// full-year view the official average is `TBcn`; records that never got
/// one drop out of the sample instead of contributing a zero.
pub fn score_of(record: &StudentRecord, column: ScoreColumn, semester: Semester) -> Option<f64> {
    match (semester, column) {
        (Semester::FullYear, ScoreColumn::TermAverage) => record.full_year_average,
        (_, ScoreColumn::TermAverage) => Some(record.term_average),
        (_, ScoreColumn::Final) => Some(record.final_score),
        (_, ScoreColumn::Continuous) => Some(record.continuous_average),
    }
}

/// Distinct class names, ascending, for the class picker.
pub fn class_names(records: &[StudentRecord]) -> Vec<String> {
    let mut names: Vec<String> = records.iter().map(|s| s.class_name.clone()).collect();
    names.sort();
    names.dedup();
    names
}
