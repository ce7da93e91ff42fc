//! The city schema as the query synthesizer describes it to the language
//! model. Kept next to the migration that creates the real tables; the two
//! must not drift.

/// Table/column enumeration injected into the synthesis prompt.
pub const SCHEMA_TABLES: &str = "\
traffic_data(timestamp, city, area, vehicle_count, avg_speed_kmph, congestion_level, is_peak_hour)

air_quality_data(timestamp, city, monitoring_station, aqi, aqi_category, pm25, pm10)

citizen_complaints(complaint_id, created_at, city, category, priority, status)

accident_events(accident_id, detected_at, severity, vehicle_count, latitude, longitude, image_id)

crowd_density_data(crowd_id, timestamp, city, location, estimated_count, density_level, image_url)

road_infra_images(image_id, captured_at, city, latitude, longitude, road_type, image_url)

road_infra_annotations(annotation_id, image_id, object_class)

system_alerts(alert_id, alert_type, generated_at, location, severity, resolved)";

/// The per-table time columns the temporal rules (\"latest\", \"today\")
/// resolve against.
pub const SCHEMA_TIME_COLUMNS: &str = "\
traffic_data.timestamp
air_quality_data.timestamp
crowd_density_data.timestamp
citizen_complaints.created_at
accident_events.detected_at
road_infra_images.captured_at
system_alerts.generated_at";
