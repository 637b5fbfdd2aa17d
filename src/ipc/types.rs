use std::collections::BTreeMap;

use serde::Deserialize;

use crate::roster::GradeDataset;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// All mutable state: the imported dataset slots, keyed by grade label.
/// Every computation runs over an immutable snapshot assembled from here.
#[derive(Default)]
pub struct AppState {
    pub cohorts: BTreeMap<String, GradeDataset>,
}
