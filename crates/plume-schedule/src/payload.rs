use chrono::{DateTime, Utc};
use plume_types::{Coordinate, LogicalId, PublicKey, SignedEvent, Tag, Timestamp};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ScheduleError};

/// Decrypted content of a schedule request, in either wire shape.
///
/// The shape is decided once, when the JSON is decoded: an object with an
/// `event` field is [`SchedulePayload::Current`], an array of tags is
/// [`SchedulePayload::Legacy`]. Anything else fails to decode.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchedulePayload {
    Current {
        event: SignedEvent,
        #[serde(default)]
        relays: Vec<String>,
    },
    /// `["i", <event json>, "text"]` carries the event,
    /// `["param", "relays", <url>...]` the relays.
    Legacy(Vec<Tag>),
}

impl SchedulePayload {
    pub fn decode(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| ScheduleError::Malformed(e.to_string()))
    }

    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| ScheduleError::Malformed(e.to_string()))
    }

    /// The publication this payload describes. The inner event must carry a
    /// valid id and signature; its `created_at` is the publish time.
    pub fn into_publication(self) -> Result<ScheduledPublication> {
        let (event, relays) = match self {
            Self::Current { event, relays } => (event, relays),
            Self::Legacy(tags) => legacy_parts(&tags)?,
        };
        plume_crypto::verify_event(&event)
            .map_err(|e| ScheduleError::Malformed(format!("inner event: {e}")))?;
        Ok(ScheduledPublication {
            publish_at: event.created_at,
            event,
            relays,
        })
    }
}

fn legacy_parts(tags: &[Tag]) -> Result<(SignedEvent, Vec<String>)> {
    let raw = tags
        .iter()
        .find(|t| t.name() == Some("i"))
        .and_then(Tag::value)
        .ok_or_else(|| ScheduleError::Malformed("legacy payload has no `i` tag".into()))?;
    let event: SignedEvent =
        serde_json::from_str(raw).map_err(|e| ScheduleError::Malformed(e.to_string()))?;

    let relays = tags
        .iter()
        .filter(|t| t.name() == Some("param") && t.value() == Some("relays"))
        .flat_map(|t| t.as_slice().iter().skip(2).cloned())
        .collect();
    Ok((event, relays))
}

/// A signed event waiting to be published by the scheduler service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledPublication {
    pub event: SignedEvent,
    pub publish_at: Timestamp,
    pub relays: Vec<String>,
}

impl ScheduledPublication {
    pub fn publish_time(&self) -> DateTime<Utc> {
        self.publish_at.to_datetime()
    }

    /// Identity of the scheduled post under `owner`: the inner event's
    /// `kind:author:d` coordinate when it is addressable, its id otherwise.
    /// Rescheduling the same article therefore replaces the earlier request.
    pub fn logical_id(&self, owner: PublicKey) -> LogicalId {
        schedule_logical_id(owner, &self.event)
    }
}

pub(crate) fn schedule_logical_id(owner: PublicKey, inner: &SignedEvent) -> LogicalId {
    let identifier = match inner.tag_value("d") {
        Some(d) if inner.kind.is_addressable() => {
            Coordinate::new(inner.kind, inner.pubkey, d).to_string()
        }
        _ => inner.id.to_hex(),
    };
    LogicalId::new(owner, identifier)
}
