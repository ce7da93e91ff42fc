//! Result shaping: classify a raw query result and pick a rendering
//! strategy. Model narration is the only path where numeric hallucination
//! can occur, so the model is involved only when a result is too large to
//! render deterministically.

use serde_json::Value;
use urbanbot_core::{Envelope, LlmClient, ObjectStore, Record, RouterError};

/// Five or fewer records render deterministically, one flattened line per
/// record, guaranteeing exact-value fidelity.
const SMALL_RESULT_MAX: usize = 5;

/// Domain-specific "no data" message chosen from the original utterance.
pub fn no_data_message(utterance: &str) -> &'static str {
    let lowered = utterance.to_lowercase();

    if lowered.contains("complaint") {
        "No citizen complaints have been raised so far."
    } else if lowered.contains("accident") {
        "No accidents detected so far."
    } else if lowered.contains("traffic") || lowered.contains("congestion") {
        "No high congestion events recorded."
    } else if lowered.contains("crowd") {
        "No crowd activity detected."
    } else if lowered.contains("pothole") {
        "No potholes detected."
    } else if lowered.contains("infrastructure") || lowered.contains("streetlight") {
        "No infrastructure issues reported."
    } else if lowered.contains("alert") {
        "No system alerts generated."
    } else {
        "No records found."
    }
}

/// Non-zero count rendering over the same domain vocabulary, raw
/// `column: value` fallback.
fn count_message(utterance: &str, column: &str, count: i64) -> String {
    let lowered = utterance.to_lowercase();

    if lowered.contains("complaint") {
        format!("{count} citizen complaints recorded so far.")
    } else if lowered.contains("accident") {
        format!("{count} accidents detected so far.")
    } else if lowered.contains("traffic") || lowered.contains("congestion") {
        format!("{count} high congestion events recorded.")
    } else if lowered.contains("crowd") {
        format!("{count} crowd readings recorded.")
    } else if lowered.contains("pothole") {
        format!("{count} potholes detected.")
    } else if lowered.contains("infrastructure") || lowered.contains("streetlight") {
        format!("{count} infrastructure issues reported.")
    } else if lowered.contains("alert") {
        format!("{count} system alerts generated.")
    } else {
        format!("{column}: {count}")
    }
}

fn grounded_narrative_prompt(utterance: &str, serialized_result: &str) -> String {
    format!(
        "Generate a short Smart City insight using ONLY the SQL result.\n\n\
         Rules:\n\
         - Use only the values present\n\
         - Do NOT add new numbers, dates, or assumptions\n\
         - Write 2-3 concise sentences\n\
         - Do NOT interpret missing values\n\
         - Show the numbers exactly as they are\n\n\
         User question:\n{utterance}\n\n\
         SQL result:\n{serialized_result}\n"
    )
}

fn single_count_column(record: &Record) -> Option<(&str, i64)> {
    if record.len() != 1 {
        return None;
    }
    let (column, value) = record.first()?;
    if !column.to_lowercase().contains("count") {
        return None;
    }
    value.as_i64().map(|count| (column, count))
}

fn image_reference(record: &Record) -> Option<String> {
    match record.get("image_url") {
        Some(Value::String(url)) if !url.is_empty() => Some(url.clone()),
        _ => None,
    }
}

fn record_time(record: &Record) -> String {
    record
        .get_text("detected_at")
        .or_else(|| record.get_text("timestamp"))
        .or_else(|| record.get_text("captured_at"))
        .unwrap_or_default()
}

/// Shape a raw result into the response envelope. Decision order: empty,
/// image-bearing singleton, count singleton, small table, grounded
/// narrative.
pub async fn shape(
    llm: &dyn LlmClient,
    storage: &dyn ObjectStore,
    utterance: &str,
    records: &[Record],
) -> Result<Envelope, RouterError> {
    if records.is_empty() {
        return Err(RouterError::NoData(no_data_message(utterance).to_string()));
    }

    if records.len() == 1 {
        let record = &records[0];

        if let Some(stored_reference) = image_reference(record) {
            // Raw storage paths never leave the router.
            let url =
                storage.sign_url(&stored_reference).await.map_err(RouterError::upstream)?;
            return Ok(Envelope::Image {
                url,
                title: "Latest Image".to_string(),
                city: record.get_text("city").unwrap_or_default(),
                time: record_time(record),
                insight: String::new(),
            });
        }

        if let Some((column, count)) = single_count_column(record) {
            if count == 0 {
                return Err(RouterError::NoData(no_data_message(utterance).to_string()));
            }
            return Ok(Envelope::text(count_message(utterance, column, count)));
        }
    }

    if records.len() <= SMALL_RESULT_MAX {
        let lines =
            records.iter().map(Record::flatten).collect::<Vec<_>>().join("\n");
        return Ok(Envelope::text(lines));
    }

    let serialized =
        serde_json::to_string(records).map_err(RouterError::upstream)?;
    let narrative = llm
        .complete(&grounded_narrative_prompt(utterance, &serialized))
        .await
        .map_err(RouterError::upstream)?;
    Ok(Envelope::text(narrative.trim().to_string()))
}
