//! Fixed result used by the preview route.

use std::collections::BTreeMap;

use crate::model::ProcessingResult;

/// Deterministic result exercising every part of the success document.
#[must_use]
pub fn synthetic_result() -> ProcessingResult {
    let pii_report = [
        ("cpf", "MASKED"),
        ("email", "HASHED"),
        ("full_name", "SUPPRESSED"),
        ("phone", "GENERALIZED"),
    ]
    .into_iter()
    .map(|(field, technique)| (field.to_string(), technique.to_string()))
    .collect::<BTreeMap<_, _>>();

    ProcessingResult {
        output_path: "anonymized_raw_example.csv".to_string(),
        privacy_score: 0.9215,
        utility_score: 0.7840,
        epsilon_used: 1.0,
        singling_out_risk: 0.0120,
        linkability_risk: 0.1250,
        inference_risk: 0.3640,
        status: "Success".to_string(),
        pii_report,
    }
}
