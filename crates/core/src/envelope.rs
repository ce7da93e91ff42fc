use serde::{Deserialize, Serialize};

/// The one contract every capability handler produces and the presentation
/// layer consumes. The dispatcher never inspects handler internals, only
/// this envelope.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Envelope {
    Text {
        content: String,
    },
    Image {
        /// Always a signed, time-limited retrieval URL, never a raw
        /// storage reference.
        url: String,
        title: String,
        city: String,
        time: String,
        insight: String,
    },
}

impl Envelope {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text { content: content.into() }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { content } => Some(content),
            Self::Image { .. } => None,
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Self::Image { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::Envelope;

    #[test]
    fn text_envelope_serializes_with_kind_tag() {
        let raw = serde_json::to_string(&Envelope::text("No records found."))
            .expect("envelope serializes");
        assert_eq!(raw, r#"{"kind":"text","content":"No records found."}"#);
    }

    #[test]
    fn image_envelope_round_trips() {
        let envelope = Envelope::Image {
            url: "https://storage.example/road.jpg?expires=1&signature=ab".to_string(),
            title: "Latest TRAFFIC Image".to_string(),
            city: "Madurai".to_string(),
            time: "2026-08-29 10:00:00".to_string(),
            insight: "Heavy congestion on the ring road.".to_string(),
        };
        let raw = serde_json::to_string(&envelope).expect("envelope serializes");
        let parsed: Envelope = serde_json::from_str(&raw).expect("envelope parses");
        assert_eq!(parsed, envelope);
        assert!(parsed.is_image());
    }
}
