use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use super::ReferenceError;
use crate::core::LocalizedText;

pub const DEFAULT_CLOSEST_PENSIONS: usize = 3;

const PENSION_DATASET: &str = include_str!("../../data/pensions.json");

static BUILTIN_PENSIONS: OnceLock<Result<Vec<PensionBenchmark>, ReferenceError>> =
    OnceLock::new();

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PensionBenchmark {
    pub pension_type: LocalizedText,
    pub annual_pension: f64,
}

pub fn builtin_pensions() -> Result<&'static [PensionBenchmark], ReferenceError> {
    BUILTIN_PENSIONS
        .get_or_init(|| parse_pensions(PENSION_DATASET))
        .as_ref()
        .map(Vec::as_slice)
        .map_err(Clone::clone)
}

pub fn parse_pensions(json: &str) -> Result<Vec<PensionBenchmark>, ReferenceError> {
    let malformed = |reason: String| ReferenceError::MalformedDataset {
        key: "pensions".to_string(),
        reason,
    };

    let benchmarks: Vec<PensionBenchmark> =
        serde_json::from_str(json).map_err(|e| malformed(e.to_string()))?;
    if benchmarks.is_empty() {
        return Err(malformed("no pension benchmarks".to_string()));
    }
    for (idx, benchmark) in benchmarks.iter().enumerate() {
        if benchmark.pension_type.is_blank() {
            return Err(malformed(format!("entry {idx} has no label")));
        }
        if !benchmark.annual_pension.is_finite() || benchmark.annual_pension < 0.0 {
            return Err(malformed(format!("entry {idx} must have a pension >= 0")));
        }
    }
    log::info!("Loaded {} pension benchmarks", benchmarks.len());
    Ok(benchmarks)
}

/// The `count` benchmarks nearest to `annual_level`. Equal distances keep
/// dataset order.
pub fn closest_pensions(
    annual_level: f64,
    benchmarks: &[PensionBenchmark],
    count: usize,
) -> Vec<&PensionBenchmark> {
    let mut ranked = benchmarks.iter().collect::<Vec<_>>();
    ranked.sort_by(|a, b| {
        let da = (a.annual_pension - annual_level).abs();
        let db = (b.annual_pension - annual_level).abs();
        da.total_cmp(&db)
    });
    ranked.truncate(count);
    ranked
}
