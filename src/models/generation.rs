use axum::body::Bytes;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use garde::Validate;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use strum::{Display, EnumString};

/// Field of the worker's response that carries the base64-encoded archive.
pub const ARCHIVE_FIELD: &str = "zip_file_base64";

/// Imaging orientation of the requested chest X-ray.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, EnumString, Display, PartialEq, Eq)]
pub enum View {
    #[serde(alias = "pa")]
    #[strum(serialize = "PA", ascii_case_insensitive)]
    PA,
    #[serde(alias = "ap")]
    #[strum(serialize = "AP", ascii_case_insensitive)]
    AP,
    #[serde(alias = "lateral", alias = "LATERAL")]
    #[strum(serialize = "Lateral", ascii_case_insensitive)]
    Lateral,
}

/// Severity of the requested findings, ordered mild to severe.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, EnumString, Display, PartialEq, Eq, PartialOrd, Ord,
)]
#[strum(ascii_case_insensitive)]
pub enum Severity {
    #[serde(alias = "mild", alias = "MILD")]
    Mild,
    #[serde(alias = "moderate", alias = "MODERATE")]
    Moderate,
    #[serde(alias = "severe", alias = "SEVERE")]
    Severe,
}

impl Severity {
    /// Lower-cased form used inside prompts.
    pub fn as_prompt_str(self) -> &'static str {
        match self {
            Severity::Mild => "mild",
            Severity::Moderate => "moderate",
            Severity::Severe => "severe",
        }
    }
}

/// Operator request for a synthetic dataset (POST /generate_dataset body).
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GenerationRequest {
    #[garde(range(min = 1, max = 120))]
    pub age: u32,

    #[garde(skip)]
    pub view: View,

    /// Clinical finding labels, embedded verbatim in the prompt.
    #[garde(length(min = 1, max = 16), inner(length(min = 1, max = 100)), custom(distinct_findings))]
    pub finding: Vec<String>,

    #[garde(skip)]
    pub severity: Severity,

    #[garde(range(min = 1, max = 100))]
    pub num_images: u32,
}

fn distinct_findings(findings: &Vec<String>, _ctx: &()) -> garde::Result {
    for (i, finding) in findings.iter().enumerate() {
        if findings[..i].contains(finding) {
            return Err(garde::Error::new(format!("duplicate finding '{}'", finding)));
        }
    }
    Ok(())
}

/// Body sent to the remote worker: the structured fields collapsed into a prompt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationPayload {
    pub prompt: String,
    pub num_images: u32,
}

/// Successful worker reply, held as the exact bytes the worker sent so it
/// can be forwarded unchanged. The archive field has already been checked.
#[derive(Debug, Clone)]
pub struct WorkerResponse {
    raw: Bytes,
}

#[derive(Deserialize)]
struct ArchiveEnvelope<'a> {
    #[serde(borrow, rename = "zip_file_base64")]
    archive: Option<Cow<'a, str>>,
}

/// Base64 characters checked per step; a multiple of 4 so each chunk decodes
/// on its own.
const ARCHIVE_CHUNK: usize = 4096;

impl WorkerResponse {
    /// Accept a worker body only if it is a JSON object carrying a non-empty,
    /// base64-decodable archive field.
    pub fn from_bytes(raw: Bytes) -> Result<Self, String> {
        let envelope: ArchiveEnvelope =
            serde_json::from_slice(&raw).map_err(|e| format!("body is not a JSON object: {}", e))?;

        match envelope.archive.as_deref() {
            Some(archive) if !archive.is_empty() && is_base64(archive) => {}
            _ => return Err("worker did not return a dataset archive".to_string()),
        }

        Ok(Self { raw })
    }

    pub fn into_bytes(self) -> Bytes {
        self.raw
    }
}

/// Validate base64 without materializing the decoded archive.
fn is_base64(encoded: &str) -> bool {
    let mut scratch = [0u8; ARCHIVE_CHUNK / 4 * 3];
    encoded
        .as_bytes()
        .chunks(ARCHIVE_CHUNK)
        .all(|chunk| STANDARD.decode_slice(chunk, &mut scratch).is_ok())
}
