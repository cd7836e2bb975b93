//! Composition reports.
//!
//! A [`CompositionReport`] is the serializable outcome of one composition:
//! accepted with a fingerprint, or rejected with sorted diagnostics.
//!
//! Diagnostic ids are deterministic: the same failure in the same place
//! always yields the same `d1_` id, so reports can be diffed across runs.

use crate::error::{CompositionError, MergeError};
use crate::name::SubgraphId;
use crate::unified::UnifiedSchema;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const REPORT_SCHEMA: u32 = 1;

/// Number of hex digits kept from the diagnostic hash.
const DIAGNOSTIC_ID_LEN: usize = 16;

/// Feeds diagnostic fields in a stable order into a hash.
struct DiagnosticIdBuilder {
    hasher: Sha256,
}

impl DiagnosticIdBuilder {
    fn new() -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"diagnostic:v1\n");
        Self { hasher }
    }

    fn field(mut self, name: &str, value: &str) -> Self {
        self.hasher.update(name.as_bytes());
        self.hasher.update(b":");
        self.hasher.update(value.as_bytes());
        self.hasher.update(b"\n");
        self
    }

    fn field_opt(self, name: &str, value: Option<&str>) -> Self {
        match value {
            Some(v) => self.field(name, v),
            None => self,
        }
    }

    fn finish(self) -> String {
        let hex = format!("{:x}", self.hasher.finalize());
        format!("d1_{}", &hex[..DIAGNOSTIC_ID_LEN])
    }
}

/// One composition failure, flattened for output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub diagnostic_id: String,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub subgraphs: Vec<SubgraphId>,
    pub message: String,
}

impl Diagnostic {
    pub fn from_error(error: &MergeError) -> Self {
        let code = error.code();
        let type_name = error.type_name().map(|t| t.as_str().to_string());
        let field = error.field().map(str::to_string);
        let subgraphs: Vec<SubgraphId> = error.subgraphs().into_iter().cloned().collect();
        let message = error.to_string();

        let diagnostic_id = DiagnosticIdBuilder::new()
            .field("code", code)
            .field_opt("type", type_name.as_deref())
            .field_opt("field", field.as_deref())
            .field(
                "subgraphs",
                &subgraphs
                    .iter()
                    .map(SubgraphId::as_str)
                    .collect::<Vec<_>>()
                    .join(","),
            )
            .field("message", &message)
            .finish();

        Self {
            diagnostic_id,
            code: code.to_string(),
            type_name,
            field,
            subgraphs,
            message,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Accepted,
    Rejected,
}

/// Serializable summary of one composition run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositionReport {
    pub report_schema: u32,
    pub result: Verdict,
    pub subgraphs: Vec<SubgraphId>,
    pub type_count: usize,
    pub entity_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
    pub diagnostics: Vec<Diagnostic>,
}

impl CompositionReport {
    pub fn accepted(schema: &UnifiedSchema) -> Self {
        Self {
            report_schema: REPORT_SCHEMA,
            result: Verdict::Accepted,
            subgraphs: schema.subgraphs.clone(),
            type_count: schema.types.len(),
            entity_count: schema.entities().count(),
            fingerprint: Some(schema.fingerprint().0),
            diagnostics: Vec::new(),
        }
    }

    /// `subgraphs` are the fragment ids that were submitted.
    pub fn rejected(subgraphs: Vec<SubgraphId>, error: &CompositionError) -> Self {
        let mut diagnostics: Vec<Diagnostic> =
            error.errors.iter().map(Diagnostic::from_error).collect();
        diagnostics.sort_by(|a, b| {
            (a.code.as_str(), &a.type_name, &a.field, &a.diagnostic_id).cmp(&(
                b.code.as_str(),
                &b.type_name,
                &b.field,
                &b.diagnostic_id,
            ))
        });
        Self {
            report_schema: REPORT_SCHEMA,
            result: Verdict::Rejected,
            subgraphs,
            type_count: 0,
            entity_count: 0,
            fingerprint: None,
            diagnostics,
        }
    }

    pub fn from_outcome(
        subgraphs: Vec<SubgraphId>,
        outcome: &Result<UnifiedSchema, CompositionError>,
    ) -> Self {
        match outcome {
            Ok(schema) => Self::accepted(schema),
            Err(error) => Self::rejected(subgraphs, error),
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.result == Verdict::Accepted
    }
}
