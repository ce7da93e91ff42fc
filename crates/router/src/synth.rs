//! Query synthesis: natural language to a schema-bound, read-only SQL
//! candidate. Modeled as an explicit three-stage pipeline - generate,
//! sanitize/validate, execute - with a hard gate between the last two
//! stages: a candidate that fails sanitation or validation is discarded,
//! never executed.

use urbanbot_core::{schema, LlmClient, RouterError};

use crate::guard;

fn synthesis_prompt(utterance: &str) -> String {
    format!(
        "You are a SQLite expert.\n\n\
         Return ONLY a valid SQLite SELECT query.\n\
         No explanation. No markdown.\n\n\
         Database: smartcity\n\n\
         Tables:\n\n{tables}\n\n\
         Rules:\n\
         - Use only existing columns\n\
         - If user asks \"latest\" -> ORDER BY the correct time column DESC LIMIT 1\n\
         - If user asks \"today\" -> use DATE(column) = DATE('now')\n\
         - If no limit specified -> LIMIT 10\n\
         - Infrastructure condition -> use road_infra_annotations\n\
         - To get city for infrastructure -> JOIN road_infra_images using image_id\n\
         - To get accident image -> JOIN accident_events.image_id = road_infra_images.image_id\n\n\
         Time columns:\n{time_columns}\n\n\
         User Question:\n{utterance}\n",
        tables = schema::SCHEMA_TABLES,
        time_columns = schema::SCHEMA_TIME_COLUMNS,
    )
}

/// Byte offset of the first case-insensitive `SELECT`, if any. `SELECT` is
/// ASCII, so a matching offset is always a char boundary.
fn find_select(text: &str) -> Option<usize> {
    text.as_bytes().windows(6).position(|window| window.eq_ignore_ascii_case(b"SELECT"))
}

/// Normalize raw model output into a single trimmed statement. Order
/// matters: fences and narration first, then truncation at the first
/// terminator (multi-statement chains lose everything after it). The
/// function is idempotent - sanitizing an already-clean statement returns
/// it unchanged.
pub fn sanitize(raw: &str) -> String {
    let unfenced = raw.replace("```sql", "").replace("```", "");

    let from_select = match find_select(&unfenced) {
        Some(offset) => &unfenced[offset..],
        None => unfenced.trim(),
    };

    let statement = from_select.split(';').next().unwrap_or("").trim();
    format!("{statement};")
}

/// The hard gate: re-apply the destructive-action filter (the generator
/// itself may have been coerced into a mutating statement), then require a
/// SELECT prefix.
pub fn validate(sql: &str) -> Result<(), RouterError> {
    if guard::is_destructive(sql) {
        return Err(RouterError::DestructiveRequestBlocked);
    }

    if !sql.trim_start().get(..6).is_some_and(|prefix| prefix.eq_ignore_ascii_case("SELECT")) {
        return Err(RouterError::SynthesisInvalid(sql.to_string()));
    }

    Ok(())
}

/// Generate, sanitize, and validate a single-use candidate query.
pub async fn synthesize(llm: &dyn LlmClient, utterance: &str) -> Result<String, RouterError> {
    let raw = llm.complete(&synthesis_prompt(utterance)).await.map_err(RouterError::upstream)?;
    let sql = sanitize(&raw);
    validate(&sql)?;
    Ok(sql)
}

#[cfg(test)]
mod tests {
    use urbanbot_core::RouterError;

    use super::{sanitize, synthesis_prompt, validate};

    #[test]
    fn sanitize_is_idempotent_on_clean_statements() {
        let clean = "SELECT city, aqi FROM air_quality_data ORDER BY timestamp DESC LIMIT 10;";
        let once = sanitize(clean);
        assert_eq!(once, clean);
        assert_eq!(sanitize(&once), once);
    }

    #[test]
    fn sanitize_strips_code_fences() {
        let fenced = "```sql\nSELECT COUNT(*) FROM accident_events\n```";
        assert_eq!(sanitize(fenced), "SELECT COUNT(*) FROM accident_events;");
    }

    #[test]
    fn sanitize_strips_explanatory_prefixes() {
        let wrapped = "Here is the query you asked for:\n\
                       SELECT city FROM traffic_data LIMIT 10;";
        assert_eq!(sanitize(wrapped), "SELECT city FROM traffic_data LIMIT 10;");
    }

    #[test]
    fn sanitize_truncates_multi_statement_chains() {
        let chained = "SELECT city FROM traffic_data; DROP TABLE traffic_data;";
        assert_eq!(sanitize(chained), "SELECT city FROM traffic_data;");
    }

    #[test]
    fn validate_blocks_mutating_statements_even_select_wrapped() {
        let laundered = sanitize("SELECT 1; DELETE FROM accident_events;");
        // Truncation already removed the second statement.
        assert_eq!(laundered, "SELECT 1;");
        assert!(validate(&laundered).is_ok());

        assert_eq!(
            validate("DELETE FROM accident_events;"),
            Err(RouterError::DestructiveRequestBlocked)
        );
        assert_eq!(
            validate("SELECT * FROM traffic_data WHERE 1=1; -- then DROP it"),
            Err(RouterError::DestructiveRequestBlocked)
        );
    }

    #[test]
    fn validate_rejects_non_select_output() {
        let error = validate("PRAGMA table_info(traffic_data);").unwrap_err();
        assert!(matches!(error, RouterError::SynthesisInvalid(_)));
        assert!(matches!(validate(";"), Err(RouterError::SynthesisInvalid(_))));
    }

    #[test]
    fn prompt_enumerates_schema_and_temporal_rules() {
        let prompt = synthesis_prompt("how many accidents today");
        assert!(prompt.contains("accident_events"));
        assert!(prompt.contains("DATE(column) = DATE('now')"));
        assert!(prompt.contains("LIMIT 10"));
        assert!(prompt.contains("how many accidents today"));
    }
}
