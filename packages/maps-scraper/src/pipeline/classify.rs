//! AI enrichment: ask a completion service for an industry classification
//! (KBLI 2020) and fallback administrative divisions per record.

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::{CompletionError, CompletionResult};
use crate::traits::completion::CompletionService;
use crate::types::progress::{ProgressEvent, ProgressObserver, Stage};
use crate::types::record::{is_known, Record, ERROR_MARKER_PREFIX, SENTINEL};

/// System instruction sent with every classification request.
pub const CLASSIFICATION_SYSTEM_PROMPT: &str = "You are a helpful assistant that extracts \
structured business data and identifies official KBLI 2020 categories as defined by the OSS \
(Online Single Submission) Indonesia system. ALWAYS return a valid JSON object.";

const RETURN_FIELDS: &str = r#"Return the following fields:
- kbli: Predict the 5-digit KBLI 2020 code (Indonesian Standard Industrial Classification).
- nama_kbli: The official title (Nama Resmi) for this KBLI code exactly as it appears in the OSS system / KBLI 2020.
- keterangan_kbli: Brief description/scope of the KBLI category based on OSS regulations.
- provinsi: The Province (Provinsi) of the business.
- kabupaten: The Regency/City (Kabupaten/Kota) of the business.
- kecamatan: The District (Kecamatan) of the business.
- kelurahan: The Sub-district/Village (Kelurahan/Desa) of the business.

If a location value is listed under "Resolved location", return it unchanged.
Format the output as a clean JSON object."#;

/// Classify every record in place. Never fails; a record whose request
/// fails gets an error marker in its classification fields.
pub async fn enrich_classification(
    records: &mut [Record],
    service: &dyn CompletionService,
    progress: &dyn ProgressObserver,
) {
    let total = records.len();
    let mut failed = 0usize;

    for (index, record) in records.iter_mut().enumerate() {
        let prompt = build_prompt(record);

        let outcome = match service
            .complete_json(CLASSIFICATION_SYSTEM_PROMPT, &prompt)
            .await
        {
            Ok(content) => apply_response(record, &content),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(()) => debug!(listing = %record.label(), kbli = %record.industry_code, "Classified listing"),
            Err(e) => {
                warn!(listing = %record.label(), error = %e, "Classification failed");
                mark_failure(record, &e);
                failed += 1;
            }
        }

        let event = ProgressEvent::new(Stage::Classifying, index + 1, total);
        info!(current = event.current, total, "{}", event.message);
        progress.on_progress(&event);
    }

    info!(classified = total - failed, failed, total, "AI enrichment finished");
}

/// Natural-language description of what is known about `record`.
pub fn build_prompt(record: &Record) -> String {
    let mut prompt = String::from(
        "Analyze the following business information from Google Maps and provide structured data in JSON format.\n",
    );

    prompt.push_str(&format!("Business Name: {}\n", record.name));
    prompt.push_str(&format!("Address: {}\n", record.address));
    prompt.push_str(&format!("Establishment/Description: {}\n", record.establishment));

    let resolved: Vec<(&str, &str)> = [
        ("provinsi", record.province.as_str()),
        ("kabupaten", record.regency.as_str()),
        ("kecamatan", record.district.as_str()),
        ("kelurahan", record.subdistrict.as_str()),
    ]
    .into_iter()
    .filter(|(_, value)| is_known(value))
    .collect();

    if !resolved.is_empty() {
        prompt.push_str("\nResolved location:\n");
        for (key, value) in resolved {
            prompt.push_str(&format!("- {}: {}\n", key, value));
        }
    }

    prompt.push('\n');
    prompt.push_str(RETURN_FIELDS);
    prompt
}

/// Merge a successful response into `record`.
///
/// The record is untouched unless the whole response parses. Classification
/// fields are always overwritten (missing keys become the sentinel);
/// administrative fields only fill values that are still unknown.
pub fn apply_response(record: &mut Record, content: &str) -> CompletionResult<()> {
    let content = content.trim();
    if content.is_empty() {
        return Err(CompletionError::EmptyResponse);
    }

    let value: Value = serde_json::from_str(content)?;
    let object = match value {
        Value::Object(object) => object,
        other => return Err(CompletionError::NotAnObject(json_kind(&other))),
    };

    record.industry_code = field(&object, "kbli").unwrap_or_else(|| SENTINEL.to_string());
    record.industry_title = field(&object, "nama_kbli").unwrap_or_else(|| SENTINEL.to_string());
    record.industry_description =
        field(&object, "keterangan_kbli").unwrap_or_else(|| SENTINEL.to_string());

    fill_unknown(&mut record.province, field(&object, "provinsi"));
    fill_unknown(&mut record.regency, field(&object, "kabupaten"));
    fill_unknown(&mut record.district, field(&object, "kecamatan"));
    fill_unknown(&mut record.subdistrict, field(&object, "kelurahan"));

    Ok(())
}

/// Write the error marker into the classification fields only.
pub fn mark_failure(record: &mut Record, error: &CompletionError) {
    let marker = error_marker(error);
    record.industry_code = marker.clone();
    record.industry_title = marker.clone();
    record.industry_description = marker;
}

/// `"Error: "` plus the first clause of the error message.
pub fn error_marker(error: &CompletionError) -> String {
    let message = error.to_string();
    let clause = message.split('(').next().unwrap_or_default().trim();
    format!("{}{}", ERROR_MARKER_PREFIX, clause)
}

fn fill_unknown(slot: &mut String, candidate: Option<String>) {
    if is_known(slot) {
        return;
    }
    if let Some(value) = candidate {
        *slot = value;
    }
}

/// String form of a response value. Numbers are kept (codes often come back
/// as integers); null and blank strings count as missing.
fn field(object: &Map<String, Value>, key: &str) -> Option<String> {
    let text = match object.get(key)? {
        Value::Null => return None,
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
