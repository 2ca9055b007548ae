//! Decoding and dispatch of inbound change-event envelopes.

use crate::error::{Result, SessionError};
use crate::types::{ChangeEvent, ChangeType, Timestamp};
use serde::Deserialize;
use serde_json::Value;
use tracing::trace;

/// Header key inside the event payload.
const CHANGE_EVENT_HEADER: &str = "ChangeEventHeader";

/// Per-channel consumer of decoded change events. All methods default to
/// no-ops; a listener implements only the change types it cares about.
pub trait ChangeEventListener: Send + Sync {
    fn created(&self, _event: &ChangeEvent) {}
    fn updated(&self, _event: &ChangeEvent) {}
    fn deleted(&self, _event: &ChangeEvent) {}
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangeEventHeader {
    entity_name: String,
    record_ids: Vec<String>,
    commit_timestamp: i64,
    change_type: String,
}

/// Decode a change-event envelope.
///
/// The wire shape is a JSON envelope with `data.payload` holding the
/// changed domain fields plus a `ChangeEventHeader` object. The header is
/// stripped from the returned payload. Partial payloads without the
/// minimum header fields come back as errors; callers drop those.
pub fn decode_change_event(message: &Value) -> Result<ChangeEvent> {
    let payload = message
        .get("data")
        .and_then(|data| data.get("payload"))
        .and_then(Value::as_object)
        .ok_or(SessionError::MissingField("data.payload"))?;

    let mut payload = payload.clone();
    let header = payload
        .remove(CHANGE_EVENT_HEADER)
        .ok_or(SessionError::MissingField(CHANGE_EVENT_HEADER))?;
    let header: ChangeEventHeader = serde_json::from_value(header)?;

    let record_id = header
        .record_ids
        .first()
        .cloned()
        .ok_or(SessionError::EmptyRecordIds)?;
    let change_type = ChangeType::from_wire(&header.change_type)
        .ok_or_else(|| SessionError::UnknownChangeType(header.change_type.clone()))?;

    Ok(ChangeEvent {
        timestamp: Timestamp(header.commit_timestamp),
        entity_name: header.entity_name,
        record_id,
        change_type,
        payload,
    })
}

/// Decode an inbound message and hand it to the channel's listener.
///
/// Malformed envelopes are expected for partial payloads and are dropped
/// without surfacing an error.
pub(crate) fn dispatch_message(channel: &str, listener: &dyn ChangeEventListener, message: &Value) {
    match decode_change_event(message) {
        Ok(event) => {
            trace!(channel, record_id = %event.record_id, change_type = %event.change_type, "dispatching change event");
            match event.change_type {
                ChangeType::Create => listener.created(&event),
                ChangeType::Update => listener.updated(&event),
                ChangeType::Delete => listener.deleted(&event),
            }
        }
        Err(err) => {
            trace!(channel, %err, "dropping malformed change event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::Arc;

    fn envelope(change_type: &str) -> Value {
        json!({
            "channel": "/data/Products",
            "data": {
                "payload": {
                    "ChangeEventHeader": {
                        "entityName": "Product__x",
                        "recordIds": ["p-001", "p-002"],
                        "commitTimestamp": 1700000000000i64,
                        "changeType": change_type,
                    },
                    "Name__c": "Widget",
                    "Stock__c": 41,
                }
            }
        })
    }

    #[test]
    fn test_decode_update_envelope() {
        let event = decode_change_event(&envelope("UPDATE")).unwrap();

        assert_eq!(event.change_type, ChangeType::Update);
        assert_eq!(event.entity_name, "Product__x");
        assert_eq!(event.record_id, "p-001");
        assert_eq!(event.timestamp, Timestamp(1700000000000));
        // Header stripped, domain fields kept.
        assert!(!event.payload.contains_key(CHANGE_EVENT_HEADER));
        assert_eq!(event.payload["Name__c"], json!("Widget"));
        assert_eq!(event.payload["Stock__c"], json!(41));
    }

    #[test]
    fn test_decode_missing_header() {
        let message = json!({"data": {"payload": {"Name__c": "Widget"}}});
        assert!(matches!(
            decode_change_event(&message),
            Err(SessionError::MissingField(CHANGE_EVENT_HEADER))
        ));
    }

    #[test]
    fn test_decode_missing_payload() {
        let message = json!({"data": {}});
        assert!(decode_change_event(&message).is_err());
        assert!(decode_change_event(&json!({})).is_err());
    }

    #[test]
    fn test_decode_empty_record_ids() {
        let message = json!({
            "data": {"payload": {"ChangeEventHeader": {
                "entityName": "Product__x",
                "recordIds": [],
                "commitTimestamp": 1,
                "changeType": "CREATE",
            }}}
        });
        assert!(matches!(
            decode_change_event(&message),
            Err(SessionError::EmptyRecordIds)
        ));
    }

    #[test]
    fn test_decode_unknown_change_type() {
        let message = json!({
            "data": {"payload": {"ChangeEventHeader": {
                "entityName": "Product__x",
                "recordIds": ["p-001"],
                "commitTimestamp": 1,
                "changeType": "UNDELETE",
            }}}
        });
        assert!(matches!(
            decode_change_event(&message),
            Err(SessionError::UnknownChangeType(_))
        ));
    }

    #[derive(Default)]
    struct Recording {
        calls: Arc<Mutex<Vec<(ChangeType, String)>>>,
    }

    impl ChangeEventListener for Recording {
        fn created(&self, event: &ChangeEvent) {
            self.calls.lock().push((ChangeType::Create, event.record_id.clone()));
        }
        fn updated(&self, event: &ChangeEvent) {
            self.calls.lock().push((ChangeType::Update, event.record_id.clone()));
        }
        fn deleted(&self, event: &ChangeEvent) {
            self.calls.lock().push((ChangeType::Delete, event.record_id.clone()));
        }
    }

    #[test]
    fn test_dispatch_routes_by_change_type() {
        let listener = Recording::default();
        let calls = Arc::clone(&listener.calls);

        dispatch_message("/data/Products", &listener, &envelope("CREATE"));
        dispatch_message("/data/Products", &listener, &envelope("DELETE"));
        dispatch_message("/data/Products", &listener, &envelope("UPDATE"));

        assert_eq!(
            *calls.lock(),
            vec![
                (ChangeType::Create, "p-001".to_string()),
                (ChangeType::Delete, "p-001".to_string()),
                (ChangeType::Update, "p-001".to_string()),
            ]
        );
    }

    #[test]
    fn test_dispatch_drops_malformed_silently() {
        let listener = Recording::default();
        let calls = Arc::clone(&listener.calls);

        dispatch_message("/data/Products", &listener, &json!({"data": {}}));
        dispatch_message("/data/Products", &listener, &envelope("GAP_CREATE"));

        assert!(calls.lock().is_empty());
    }
}
