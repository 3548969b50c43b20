//! Presentation model for processing results.

use std::fmt::Write as _;

use serde::Serialize;

use crate::model::ProcessingResult;

/// Route prefix under which stored files are served.
pub const RETRIEVAL_PREFIX: &str = "/data/";

/// Qualitative band for a privacy risk value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    /// Below 0.10.
    Low,
    /// From 0.10 up to (excluding) 0.30.
    Medium,
    /// 0.30 and above, or not a number.
    High,
}

impl RiskTier {
    /// Band for `value`.
    #[must_use]
    pub const fn classify(value: f64) -> Self {
        if value < 0.10 {
            Self::Low
        } else if value < 0.30 {
            Self::Medium
        } else {
            Self::High
        }
    }

    /// Lowercase label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// One risk metric with its band.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskView {
    /// Metric name.
    pub name: &'static str,
    /// Raw value.
    pub value: f64,
    /// Derived band.
    pub tier: RiskTier,
}

/// Field and the anonymization technique applied to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PiiEntry {
    /// Column name.
    pub field: String,
    /// Technique label.
    pub technique: String,
}

/// Everything the success document shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultView {
    /// Status text reported by the collaborator.
    pub status: String,
    /// Artifact location as reported.
    pub output_path: String,
    /// Retrieval link for the artifact.
    pub output_url: String,
    /// Privacy score.
    pub privacy_score: f64,
    /// Utility score.
    pub utility_score: f64,
    /// Epsilon applied by the collaborator.
    pub epsilon_used: f64,
    /// Singling-out, linkability and inference risks in that order.
    pub risks: Vec<RiskView>,
    /// PII handling, sorted by field name.
    pub pii: Vec<PiiEntry>,
}

impl From<&ProcessingResult> for ResultView {
    fn from(result: &ProcessingResult) -> Self {
        let risk = |name, value| RiskView {
            name,
            value,
            tier: RiskTier::classify(value),
        };
        Self {
            status: result.status.clone(),
            output_path: result.output_path.clone(),
            output_url: retrieval_url(&result.output_path),
            privacy_score: result.privacy_score,
            utility_score: result.utility_score,
            epsilon_used: result.epsilon_used,
            risks: vec![
                risk("singling_out", result.singling_out_risk),
                risk("linkability", result.linkability_risk),
                risk("inference", result.inference_risk),
            ],
            pii: result
                .pii_report
                .iter()
                .map(|(field, technique)| PiiEntry {
                    field: field.clone(),
                    technique: technique.clone(),
                })
                .collect(),
        }
    }
}

/// Machine-readable document for either outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub(crate) enum OutcomeView {
    Success { result: ResultView },
    Failure { error: String },
}

pub(crate) fn success_fragment(view: &ResultView) -> String {
    let risks: String = view
        .risks
        .iter()
        .map(|risk| {
            format!(
                "<tr class=\"risk risk--{tier}\"><th>{name}</th><td>{value}</td><td>{tier}</td></tr>",
                tier = risk.tier.label(),
                name = risk.name.replace('_', " "),
                value = risk.value,
            )
        })
        .collect();
    let pii: String = view
        .pii
        .iter()
        .map(|entry| {
            format!(
                "<li><code>{}</code> &rarr; {}</li>",
                escape_html(&entry.field),
                escape_html(&entry.technique)
            )
        })
        .collect();

    format!(
        concat!(
            "<section class=\"result result--success\">",
            "<dl class=\"summary\">",
            "<dt>Status</dt><dd>{status}</dd>",
            "<dt>Output</dt><dd><a href=\"{url}\">{output}</a></dd>",
            "<dt>Privacy score</dt><dd>{privacy}</dd>",
            "<dt>Utility score</dt><dd>{utility}</dd>",
            "<dt>Epsilon used</dt><dd>{epsilon}</dd>",
            "</dl>",
            "<table class=\"risks\"><thead><tr><th>Risk</th><th>Value</th><th>Tier</th></tr></thead>",
            "<tbody>{risks}</tbody></table>",
            "<ul class=\"pii\">{pii}</ul>",
            "</section>"
        ),
        status = escape_html(&view.status),
        url = escape_html(&view.output_url),
        output = escape_html(&view.output_path),
        privacy = view.privacy_score,
        utility = view.utility_score,
        epsilon = view.epsilon_used,
        risks = risks,
        pii = pii,
    )
}

pub(crate) fn failure_fragment(message: &str) -> String {
    format!(
        "<section class=\"result result--failure\"><p class=\"error\">{}</p></section>",
        escape_html(message)
    )
}

pub(crate) fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Link to the stored artifact; only the final path component is used.
fn retrieval_url(output_path: &str) -> String {
    let name = output_path.rsplit(['/', '\\']).next().unwrap_or_default();
    let mut url = String::from(RETRIEVAL_PREFIX);
    for byte in name.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~') {
            url.push(char::from(byte));
        } else {
            let _ = write!(url, "%{byte:02X}");
        }
    }
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::synthetic_result;

    #[test]
    fn tiers_follow_thresholds() {
        assert_eq!(RiskTier::classify(0.0), RiskTier::Low);
        assert_eq!(RiskTier::classify(0.0999), RiskTier::Low);
        assert_eq!(RiskTier::classify(0.10), RiskTier::Medium);
        assert_eq!(RiskTier::classify(0.2999), RiskTier::Medium);
        assert_eq!(RiskTier::classify(0.30), RiskTier::High);
        assert_eq!(RiskTier::classify(f64::NAN), RiskTier::High);
    }

    #[test]
    fn view_sorts_pii_and_links_output() {
        let view = ResultView::from(&synthetic_result());
        let fields: Vec<_> = view.pii.iter().map(|entry| entry.field.as_str()).collect();
        assert_eq!(fields, ["cpf", "email", "full_name", "phone"]);
        assert_eq!(view.output_url, "/data/anonymized_raw_example.csv");
        assert_eq!(view.risks[2].tier, RiskTier::High);
    }

    #[test]
    fn retrieval_url_encodes_and_strips_directories() {
        assert_eq!(retrieval_url("/srv/out/my file.csv"), "/data/my%20file.csv");
    }

    #[test]
    fn fragments_escape_markup() {
        let fragment = failure_fragment("<script>alert('x')</script>");
        assert!(fragment.contains("&lt;script&gt;alert(&#39;x&#39;)&lt;/script&gt;"));
        assert!(!fragment.contains("<script>"));
    }

    #[test]
    fn success_fragment_lists_every_metric() {
        let fragment = success_fragment(&ResultView::from(&synthetic_result()));
        for needle in [
            "<dd>0.9215</dd>",
            "<dd>0.784</dd>",
            "Epsilon used</dt><dd>1</dd>",
            "<td>0.012</td>",
            "<td>0.125</td>",
            "<td>0.364</td>",
            "risk--low",
            "risk--medium",
            "risk--high",
            "<code>full_name</code> &rarr; SUPPRESSED",
            "href=\"/data/anonymized_raw_example.csv\"",
        ] {
            assert!(fragment.contains(needle), "missing {needle}");
        }
    }

    #[test]
    fn collaborator_values_are_shown_unrounded() {
        let mut result = synthetic_result();
        result.epsilon_used = 0.001;
        result.inference_risk = 0.123_456;
        result.privacy_score = 0.912_345_678;
        let fragment = success_fragment(&ResultView::from(&result));

        assert!(fragment.contains("Epsilon used</dt><dd>0.001</dd>"));
        assert!(fragment.contains("<td>0.123456</td>"));
        assert!(fragment.contains("<dd>0.912345678</dd>"));
    }
}
