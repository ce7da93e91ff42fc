//! Monitoring-image retrieval: fixed latest-record query per sub-domain,
//! signed URL, short model caption. The stored reference never leaves
//! the handler unsigned.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use urbanbot_core::{DataStore, Envelope, LlmClient, ObjectStore, Record, RouterError};

use super::Handler;

pub const NO_DOMAIN_MESSAGE: &str =
    "Please specify which monitoring image you need (traffic, pothole, accident, \
     crowd, infrastructure).";

/// Which camera feed the utterance is asking about.
pub fn detect_image_domain(utterance: &str) -> Option<&'static str> {
    let lowered = utterance.to_lowercase();

    if lowered.contains("traffic") {
        return Some("traffic");
    }
    if lowered.contains("pothole") {
        return Some("pothole");
    }
    if lowered.contains("accident") || lowered.contains("crash") {
        return Some("accident");
    }
    if lowered.contains("crowd") || lowered.contains("overcrowd") {
        return Some("crowd");
    }
    if lowered.contains("streetlight") || lowered.contains("infrastructure") {
        return Some("infra");
    }
    None
}

/// Fixed latest-image query per sub-domain. Every query aliases its time
/// column to `captured_at` so extraction is uniform.
fn latest_image_sql(domain: &str) -> Option<&'static str> {
    match domain {
        "traffic" => Some(
            "SELECT image_url, captured_at, city \
             FROM road_infra_images \
             WHERE road_type = 'traffic' \
             ORDER BY captured_at DESC \
             LIMIT 1",
        ),
        "pothole" => Some(
            "SELECT r.image_url, r.captured_at, r.city \
             FROM road_infra_images r \
             JOIN road_infra_annotations a ON r.image_id = a.image_id \
             WHERE a.object_class = 'pothole' \
             ORDER BY r.captured_at DESC \
             LIMIT 1",
        ),
        "accident" => Some(
            "SELECT r.image_url, a.detected_at AS captured_at, r.city \
             FROM accident_events a \
             JOIN road_infra_images r ON a.image_id = r.image_id \
             ORDER BY a.detected_at DESC \
             LIMIT 1",
        ),
        "crowd" => Some(
            "SELECT image_url, timestamp AS captured_at, city \
             FROM crowd_density_data \
             ORDER BY timestamp DESC \
             LIMIT 1",
        ),
        "infra" => Some(
            "SELECT image_url, captured_at, city \
             FROM road_infra_images \
             WHERE road_type = 'street_infra' \
             ORDER BY captured_at DESC \
             LIMIT 1",
        ),
        _ => None,
    }
}

fn caption_prompt(domain: &str, city: &str, time: &str, url: &str) -> String {
    format!(
        "You are a Smart City Monitoring AI.\n\n\
         An image from {domain} surveillance is available.\n\n\
         City: {city}\n\
         Time: {time}\n\n\
         Image URL:\n{url}\n\n\
         Give a short operational insight for city authorities.\n\
         Rules:\n\
         - Do NOT create placeholders like [insert location]\n\
         - Do NOT assume missing values\n\
         - If a value is missing, simply do not mention it\n"
    )
}

pub struct ImageHandler {
    llm: Arc<dyn LlmClient>,
    store: Arc<dyn DataStore>,
    storage: Arc<dyn ObjectStore>,
}

impl ImageHandler {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        store: Arc<dyn DataStore>,
        storage: Arc<dyn ObjectStore>,
    ) -> Self {
        Self { llm, store, storage }
    }
}

#[async_trait]
impl Handler for ImageHandler {
    async fn handle(&self, utterance: &str) -> Result<Envelope, RouterError> {
        let Some(domain) = detect_image_domain(utterance) else {
            return Ok(Envelope::text(NO_DOMAIN_MESSAGE));
        };
        let Some(sql) = latest_image_sql(domain) else {
            return Ok(Envelope::text(NO_DOMAIN_MESSAGE));
        };

        let records = self
            .store
            .query(sql)
            .await
            .map_err(RouterError::upstream)?;
        let Some(record) = records.first() else {
            return Ok(Envelope::text(format!("No {domain} images available.")));
        };

        let stored_reference = match record.get_text("image_url") {
            Some(reference) if !reference.is_empty() => reference,
            _ => return Ok(Envelope::text(format!("No {domain} images available."))),
        };
        let city = record.get_text("city").unwrap_or_default();
        let time = record.get_text("captured_at").unwrap_or_default();

        let url = self
            .storage
            .sign_url(&stored_reference)
            .await
            .map_err(RouterError::upstream)?;
        debug!(event_name = "image_signed", domain, city = %city);

        let insight = self
            .llm
            .complete(&caption_prompt(domain, &city, &time, &url))
            .await
            .map_err(RouterError::upstream)?;

        Ok(Envelope::Image {
            url,
            title: format!("Latest {} Image", domain.to_uppercase()),
            city,
            time,
            insight: insight.trim().to_string(),
        })
    }
}
