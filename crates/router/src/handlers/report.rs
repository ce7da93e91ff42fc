//! Operational reports. Section queries are fixed SQL, never
//! synthesized; the model only narrates numbers it was handed.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use urbanbot_core::{DataStore, Envelope, LlmClient, Record, RouterError};

use crate::intent::ADVISORY_TERMS;

use super::Handler;

pub const NO_SECTION_MESSAGE: &str =
    "Please specify which Smart City report you need (traffic, AQI, accidents, \
     crowd, complaints, potholes, infrastructure, or full city report).";

const NO_DATA_MESSAGE: &str = "No data available to generate the city report.";

struct Section {
    heading: &'static str,
    keywords: &'static [&'static str],
    sql: &'static str,
}

/// The seven report sections, in the order a full city report lists them.
const SECTIONS: &[Section] = &[
    Section {
        heading: "TRAFFIC",
        keywords: &["traffic", "congestion", "road"],
        sql: "SELECT city, COUNT(*) AS high_congestion_count \
              FROM traffic_data \
              WHERE congestion_level = 'high' \
              GROUP BY city \
              LIMIT 5",
    },
    Section {
        heading: "AIR QUALITY",
        keywords: &["air", "aqi", "pollution"],
        sql: "SELECT city, aqi, aqi_category \
              FROM air_quality_data \
              ORDER BY timestamp DESC \
              LIMIT 5",
    },
    Section {
        heading: "ACCIDENTS",
        keywords: &["accident", "crash", "collision"],
        sql: "SELECT severity, COUNT(*) AS incident_count \
              FROM accident_events \
              GROUP BY severity",
    },
    Section {
        heading: "CROWD",
        keywords: &["crowd"],
        sql: "SELECT city, location, estimated_count, density_level \
              FROM crowd_density_data \
              ORDER BY timestamp DESC \
              LIMIT 5",
    },
    Section {
        heading: "COMPLAINTS",
        keywords: &["complaint", "grievance", "issue"],
        sql: "SELECT city, category, priority, status \
              FROM citizen_complaints \
              ORDER BY created_at DESC \
              LIMIT 5",
    },
    Section {
        heading: "POTHOLES",
        keywords: &["pothole"],
        sql: "SELECT COUNT(*) AS pothole_count \
              FROM road_infra_annotations \
              WHERE object_class = 'pothole'",
    },
    Section {
        heading: "INFRASTRUCTURE",
        keywords: &["infrastructure", "infra", "streetlight"],
        sql: "SELECT city, COUNT(*) AS defect_count \
              FROM road_infra_images \
              WHERE road_type = 'street_infra' \
              GROUP BY city \
              LIMIT 5",
    },
];

const FULL_REPORT_TERMS: &[&str] = &["full", "overall", "complete", "city status", "city report"];

const DOMAIN_NOUNS: &[&str] = &[
    "traffic", "air", "aqi", "pollution", "accident", "crash", "crowd", "complaint",
    "grievance", "pothole", "infrastructure", "infra", "streetlight",
];

fn wants_full_report(lowered: &str) -> bool {
    let is_full = FULL_REPORT_TERMS.iter().any(|term| lowered.contains(term));
    let has_domain = DOMAIN_NOUNS.iter().any(|noun| lowered.contains(noun));
    is_full && !has_domain
}

fn render_rows(records: &[Record]) -> String {
    if records.is_empty() {
        return "(no rows)".to_string();
    }
    records.iter().map(Record::flatten).collect::<Vec<_>>().join("\n")
}

fn full_report_prompt(data: &str) -> String {
    format!(
        "You are a Smart City Command Center AI assisting city administrators.\n\n\
         Generate a concise multi-section operational city report.\n\n\
         For each section:\n\
         - Use a heading\n\
         - Use bullet points\n\
         - Be factual\n\
         - Add Priority: High / Medium / Low based only on values\n\
         - Add one short Action line (generic and data-driven)\n\
         - No greetings\n\
         - No assumptions\n\n\
         DATA:\n{data}\n"
    )
}

fn section_report_prompt(data: &str, utterance: &str) -> String {
    format!(
        "You are a Smart City Command Center AI assisting city administrators.\n\n\
         Generate a short operational report ONLY for the requested sections.\n\n\
         Rules:\n\
         - Use headings\n\
         - Use bullet points\n\
         - Be factual\n\
         - Do NOT include unrelated sections\n\
         - No greetings\n\
         - No assumptions\n\
         - Add 1-2 short operational insights based ONLY on the given numbers\n\
         - Display values exactly as given\n\n\
         DATA:\n{data}\n\n\
         User Request:\n{utterance}\n"
    )
}

fn strategies_prompt(utterance: &str) -> String {
    format!(
        "You are a Smart City operations expert assisting city administrators.\n\n\
         Provide concise and practical strategies for:\n\n\
         {utterance}\n\n\
         Rules:\n\
         - Use bullet points\n\
         - Operational and implementable measures only\n\
         - No greetings\n\
         - No database references\n\
         - Stay within Smart City domain\n"
    )
}

pub struct ReportHandler {
    llm: Arc<dyn LlmClient>,
    store: Arc<dyn DataStore>,
}

impl ReportHandler {
    pub fn new(llm: Arc<dyn LlmClient>, store: Arc<dyn DataStore>) -> Self {
        Self { llm, store }
    }

    async fn fetch_section(&self, section: &Section) -> Result<Vec<Record>, RouterError> {
        self.store.query(section.sql).await.map_err(RouterError::upstream)
    }

    async fn full_report(&self) -> Result<Envelope, RouterError> {
        let mut blocks = Vec::with_capacity(SECTIONS.len());
        let mut any_rows = false;
        for section in SECTIONS {
            let records = self.fetch_section(section).await?;
            any_rows |= !records.is_empty();
            blocks.push(format!("{}:\n{}", section.heading, render_rows(&records)));
        }

        if !any_rows {
            return Ok(Envelope::text(NO_DATA_MESSAGE));
        }

        let narrative = self
            .llm
            .complete(&full_report_prompt(&blocks.join("\n\n")))
            .await
            .map_err(RouterError::upstream)?;
        Ok(Envelope::text(narrative.trim().to_string()))
    }
}

#[async_trait]
impl Handler for ReportHandler {
    async fn handle(&self, utterance: &str) -> Result<Envelope, RouterError> {
        let lowered = utterance.to_lowercase();

        // Strategy questions never touch the store even when phrased as a
        // report request ("report on how to reduce congestion").
        if ADVISORY_TERMS.iter().any(|term| lowered.contains(term)) {
            let advice = self
                .llm
                .complete(&strategies_prompt(utterance))
                .await
                .map_err(RouterError::upstream)?;
            return Ok(Envelope::text(advice.trim().to_string()));
        }

        if wants_full_report(&lowered) {
            debug!(event_name = "report_full_requested");
            return self.full_report().await;
        }

        let mut blocks = Vec::new();
        for section in SECTIONS {
            if section.keywords.iter().any(|keyword| lowered.contains(keyword)) {
                let records = self.fetch_section(section).await?;
                blocks.push(format!("{}:\n{}", section.heading, render_rows(&records)));
            }
        }

        if blocks.is_empty() {
            return Ok(Envelope::text(NO_SECTION_MESSAGE));
        }
        debug!(event_name = "report_sections_selected", sections = blocks.len());

        let narrative = self
            .llm
            .complete(&section_report_prompt(&blocks.join("\n\n"), utterance))
            .await
            .map_err(RouterError::upstream)?;
        Ok(Envelope::text(narrative.trim().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use anyhow::Result;
    use async_trait::async_trait;
    use serde_json::json;
    use urbanbot_core::{LlmClient, Record};
    use urbanbot_db::memory::InMemoryDataStore;

    use super::{Handler, ReportHandler, NO_SECTION_MESSAGE};

    #[derive(Default)]
    struct RecordingLlm {
        prompts: Mutex<Vec<String>>,
    }

    impl RecordingLlm {
        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().map(|guard| guard.clone()).unwrap_or_default()
        }
    }

    #[async_trait]
    impl LlmClient for RecordingLlm {
        async fn complete(&self, prompt: &str) -> Result<String> {
            if let Ok(mut prompts) = self.prompts.lock() {
                prompts.push(prompt.to_string());
            }
            Ok("SECTION REPORT".to_string())
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![0.0])
        }
    }

    fn traffic_rows() -> Vec<Record> {
        vec![Record::new(vec![
            ("city".to_string(), json!("Salem")),
            ("high_congestion_count".to_string(), json!(12)),
        ])]
    }

    #[tokio::test]
    async fn no_matching_section_returns_the_fixed_prompt_without_queries() {
        let llm = Arc::new(RecordingLlm::default());
        let store = Arc::new(InMemoryDataStore::default());
        let handler = ReportHandler::new(llm.clone(), store.clone());

        let envelope = handler.handle("give me a report").await.expect("routes");

        assert_eq!(envelope.as_text(), Some(NO_SECTION_MESSAGE));
        assert!(store.executed_sql().is_empty());
        assert!(llm.prompts().is_empty());
    }

    #[tokio::test]
    async fn traffic_report_queries_only_the_traffic_section() {
        let llm = Arc::new(RecordingLlm::default());
        let store = Arc::new(InMemoryDataStore::with_responses(vec![traffic_rows()]));
        let handler = ReportHandler::new(llm.clone(), store.clone());

        handler.handle("traffic report for today").await.expect("routes");

        let executed = store.executed_sql();
        assert_eq!(executed.len(), 1);
        assert!(executed[0].contains("FROM traffic_data"));

        let prompts = llm.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("TRAFFIC:"));
        assert!(prompts[0].contains("high_congestion_count: 12"));
        assert!(!prompts[0].contains("AIR QUALITY:"));
    }

    #[tokio::test]
    async fn full_city_report_pulls_all_seven_sections() {
        let llm = Arc::new(RecordingLlm::default());
        let responses = (0..7).map(|_| traffic_rows()).collect();
        let store = Arc::new(InMemoryDataStore::with_responses(responses));
        let handler = ReportHandler::new(llm.clone(), store.clone());

        handler.handle("overall city status").await.expect("routes");

        assert_eq!(store.executed_sql().len(), 7);
        let prompts = llm.prompts();
        assert_eq!(prompts.len(), 1);
        for heading in ["TRAFFIC:", "AIR QUALITY:", "ACCIDENTS:", "CROWD:", "COMPLAINTS:", "POTHOLES:", "INFRASTRUCTURE:"] {
            assert!(prompts[0].contains(heading), "missing {heading}");
        }
    }

    #[tokio::test]
    async fn full_phrase_with_a_domain_noun_stays_a_section_report() {
        let llm = Arc::new(RecordingLlm::default());
        let store = Arc::new(InMemoryDataStore::with_responses(vec![traffic_rows()]));
        let handler = ReportHandler::new(llm, store.clone());

        handler.handle("full traffic report").await.expect("routes");

        assert_eq!(store.executed_sql().len(), 1);
    }

    #[tokio::test]
    async fn empty_full_report_returns_no_data_without_a_model_call() {
        let llm = Arc::new(RecordingLlm::default());
        let responses = (0..7).map(|_| Vec::new()).collect();
        let store = Arc::new(InMemoryDataStore::with_responses(responses));
        let handler = ReportHandler::new(llm.clone(), store);

        let envelope = handler.handle("complete city report").await.expect("routes");

        assert_eq!(envelope.as_text(), Some("No data available to generate the city report."));
        assert!(llm.prompts().is_empty());
    }

    #[tokio::test]
    async fn advisory_phrasing_short_circuits_to_strategies() {
        let llm = Arc::new(RecordingLlm::default());
        let store = Arc::new(InMemoryDataStore::default());
        let handler = ReportHandler::new(llm.clone(), store.clone());

        handler
            .handle("report on how to improve air quality")
            .await
            .expect("routes");

        assert!(store.executed_sql().is_empty(), "advisory mode must not query");
        let prompts = llm.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("practical strategies"));
    }
}
