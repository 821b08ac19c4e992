//! JSON-RPC 2.0 notification envelopes
//!
//! ```text
//! {"jsonrpc": "2.0", "method": "notifications/progress", "params": {...}}
//! ```
//!
//! [`JsonRpcNotification`] is the untyped base with a free `method`.
//! [`Envelope<N>`] fixes the method to `N::METHOD` and rejects anything else
//! on parse. [`AnyNotification`] picks the typed notification by method name.

use crate::{
    CancellationNotification, EnvelopeError, ErrorNotification, NotifyResult, ProgressNotification,
    StateChangeNotification,
};
use optrack_core::OperationId;
use serde::de::{self, DeserializeOwned};
use serde::ser::{self, SerializeStruct};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

pub const JSONRPC_VERSION: &str = "2.0";

pub const METHOD_PROGRESS: &str = "notifications/progress";
pub const METHOD_CANCELLED: &str = "notifications/cancelled";
pub const METHOD_ERROR: &str = "notifications/error";
pub const METHOD_STATE_CHANGE: &str = "notifications/state_change";

// ============================================================================
// NOTIFICATION TRAIT
// ============================================================================

/// A notification kind with a fixed JSON-RPC method.
pub trait Notification: Serialize + DeserializeOwned {
    const METHOD: &'static str;

    fn operation_id(&self) -> &OperationId;
}

impl Notification for ProgressNotification {
    const METHOD: &'static str = METHOD_PROGRESS;

    fn operation_id(&self) -> &OperationId {
        &self.operation_id
    }
}

impl Notification for CancellationNotification {
    const METHOD: &'static str = METHOD_CANCELLED;

    fn operation_id(&self) -> &OperationId {
        &self.operation_id
    }
}

impl Notification for ErrorNotification {
    const METHOD: &'static str = METHOD_ERROR;

    fn operation_id(&self) -> &OperationId {
        &self.operation_id
    }
}

impl Notification for StateChangeNotification {
    const METHOD: &'static str = METHOD_STATE_CHANGE;

    fn operation_id(&self) -> &OperationId {
        StateChangeNotification::operation_id(self)
    }
}

// ============================================================================
// VERSION TAG
// ============================================================================

/// The literal `"2.0"`. Any other value fails to parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct JsonRpcVersion;

impl Serialize for JsonRpcVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(JSONRPC_VERSION)
    }
}

impl<'de> Deserialize<'de> for JsonRpcVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let version = String::deserialize(deserializer)?;
        if version == JSONRPC_VERSION {
            Ok(JsonRpcVersion)
        } else {
            Err(de::Error::custom(EnvelopeError::UnsupportedVersion(version)))
        }
    }
}

// ============================================================================
// UNTYPED ENVELOPE
// ============================================================================

/// Base JSON-RPC notification: no id, no response expected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    #[serde(default)]
    pub jsonrpc: JsonRpcVersion,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Map<String, Value>>,
}

impl JsonRpcNotification {
    pub fn new(method: impl Into<String>, params: Option<Map<String, Value>>) -> Self {
        Self {
            jsonrpc: JsonRpcVersion,
            method: method.into(),
            params,
        }
    }
}

// ============================================================================
// TYPED ENVELOPE
// ============================================================================

/// Envelope whose method is fixed by the notification type.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope<N> {
    params: N,
}

impl<N: Notification> Envelope<N> {
    pub fn new(params: N) -> Self {
        Self { params }
    }

    pub fn method(&self) -> &'static str {
        N::METHOD
    }

    pub fn params(&self) -> &N {
        &self.params
    }

    pub fn into_params(self) -> N {
        self.params
    }

    /// Serialize the params into an untyped envelope.
    pub fn to_untyped(&self) -> NotifyResult<JsonRpcNotification> {
        match serde_json::to_value(&self.params)? {
            Value::Object(params) => Ok(JsonRpcNotification::new(N::METHOD, Some(params))),
            other => Err(EnvelopeError::InvalidParams {
                method: N::METHOD.to_string(),
                reason: format!("params must be an object, got {other}"),
            }
            .into()),
        }
    }

    /// Check the method and decode the params.
    pub fn from_untyped(raw: JsonRpcNotification) -> NotifyResult<Self> {
        if raw.method != N::METHOD {
            return Err(EnvelopeError::MethodMismatch {
                expected: N::METHOD,
                actual: raw.method,
            }
            .into());
        }
        let params = raw.params.ok_or_else(|| EnvelopeError::MissingParams {
            method: raw.method.clone(),
        })?;
        let params = serde_json::from_value(Value::Object(params)).map_err(|err| {
            EnvelopeError::InvalidParams {
                method: raw.method.clone(),
                reason: err.to_string(),
            }
        })?;
        Ok(Self { params })
    }
}

impl<N: Notification> Serialize for Envelope<N> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Envelope", 3)?;
        state.serialize_field("jsonrpc", &JsonRpcVersion)?;
        state.serialize_field("method", N::METHOD)?;
        state.serialize_field("params", &self.params)?;
        state.end()
    }
}

/// Inbound shape of a typed envelope: the method may be left out.
#[derive(Deserialize)]
struct TypedEnvelopeWire {
    #[serde(default)]
    jsonrpc: JsonRpcVersion,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    params: Option<Map<String, Value>>,
}

/// A missing `method` defaults to `N::METHOD`; a different one is rejected.
impl<'de, N: Notification> Deserialize<'de> for Envelope<N> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = TypedEnvelopeWire::deserialize(deserializer)?;
        let raw = JsonRpcNotification {
            jsonrpc: wire.jsonrpc,
            method: wire.method.unwrap_or_else(|| N::METHOD.to_string()),
            params: wire.params,
        };
        Self::from_untyped(raw).map_err(de::Error::custom)
    }
}

// ============================================================================
// ANY NOTIFICATION
// ============================================================================

/// Any of the four notification kinds, selected by method.
#[derive(Debug, Clone, PartialEq)]
pub enum AnyNotification {
    Progress(ProgressNotification),
    Cancelled(CancellationNotification),
    Error(ErrorNotification),
    StateChange(StateChangeNotification),
}

impl AnyNotification {
    pub fn method(&self) -> &'static str {
        match self {
            AnyNotification::Progress(_) => METHOD_PROGRESS,
            AnyNotification::Cancelled(_) => METHOD_CANCELLED,
            AnyNotification::Error(_) => METHOD_ERROR,
            AnyNotification::StateChange(_) => METHOD_STATE_CHANGE,
        }
    }

    pub fn operation_id(&self) -> &OperationId {
        match self {
            AnyNotification::Progress(n) => Notification::operation_id(n),
            AnyNotification::Cancelled(n) => Notification::operation_id(n),
            AnyNotification::Error(n) => Notification::operation_id(n),
            AnyNotification::StateChange(n) => Notification::operation_id(n),
        }
    }

    pub fn from_untyped(raw: JsonRpcNotification) -> NotifyResult<Self> {
        match raw.method.as_str() {
            METHOD_PROGRESS => Envelope::from_untyped(raw).map(|e| Self::Progress(e.into_params())),
            METHOD_CANCELLED => {
                Envelope::from_untyped(raw).map(|e| Self::Cancelled(e.into_params()))
            }
            METHOD_ERROR => Envelope::from_untyped(raw).map(|e| Self::Error(e.into_params())),
            METHOD_STATE_CHANGE => {
                Envelope::from_untyped(raw).map(|e| Self::StateChange(e.into_params()))
            }
            other => Err(EnvelopeError::UnknownMethod(other.to_string()).into()),
        }
    }

    pub fn to_untyped(&self) -> NotifyResult<JsonRpcNotification> {
        match self {
            AnyNotification::Progress(n) => Envelope::new(n.clone()).to_untyped(),
            AnyNotification::Cancelled(n) => Envelope::new(n.clone()).to_untyped(),
            AnyNotification::Error(n) => Envelope::new(n.clone()).to_untyped(),
            AnyNotification::StateChange(n) => Envelope::new(n.clone()).to_untyped(),
        }
    }

    /// Parse a JSON envelope.
    pub fn parse(json: &str) -> NotifyResult<Self> {
        let raw: JsonRpcNotification = serde_json::from_str(json)?;
        Self::from_untyped(raw)
    }
}

impl Serialize for AnyNotification {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_untyped()
            .map_err(ser::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for AnyNotification {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = JsonRpcNotification::deserialize(deserializer)?;
        Self::from_untyped(raw).map_err(de::Error::custom)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NotifyError;
    use optrack_core::{ErrorResponse, LifecycleStatus, ProgressMetrics, ProgressToken, Timestamp};
    use serde_json::json;

    const OP_ID: &str = "op-123e4567-e89b-12d3-a456-426614174000";
    const PT_ID: &str = "pt-123e4567-e89b-12d3-a456-426614174000";
    const TS: &str = "2025-01-15T10:30:00Z";

    fn ts() -> Timestamp {
        Timestamp::parse(TS).unwrap()
    }

    fn state_change() -> StateChangeNotification {
        StateChangeNotification::new(
            OperationId::parse(OP_ID).unwrap(),
            LifecycleStatus::Created,
            LifecycleStatus::Running,
            ts(),
        )
        .unwrap()
    }

    #[test]
    fn test_envelope_shape() {
        let envelope = Envelope::new(state_change());
        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({
                "jsonrpc": "2.0",
                "method": "notifications/state_change",
                "params": {
                    "operationId": OP_ID,
                    "oldState": "created",
                    "newState": "running",
                    "timestamp": TS
                }
            })
        );
    }

    #[test]
    fn test_methods_per_kind() {
        assert_eq!(ProgressNotification::METHOD, "notifications/progress");
        assert_eq!(CancellationNotification::METHOD, "notifications/cancelled");
        assert_eq!(ErrorNotification::METHOD, "notifications/error");
        assert_eq!(StateChangeNotification::METHOD, "notifications/state_change");
    }

    #[test]
    fn test_typed_envelope_rejects_wrong_method() {
        let wire = json!({
            "jsonrpc": "2.0",
            "method": "notifications/error",
            "params": serde_json::to_value(state_change()).unwrap()
        });
        let result: Result<Envelope<StateChangeNotification>, _> = serde_json::from_value(wire);
        assert!(result.is_err());

        let raw = JsonRpcNotification::new("notifications/error", None);
        assert_eq!(
            Envelope::<StateChangeNotification>::from_untyped(raw).unwrap_err(),
            NotifyError::Envelope(EnvelopeError::MethodMismatch {
                expected: METHOD_STATE_CHANGE,
                actual: "notifications/error".to_string(),
            })
        );
    }

    #[test]
    fn test_typed_envelope_defaults_missing_method() {
        let params = serde_json::to_value(state_change()).unwrap();
        let parsed: Envelope<StateChangeNotification> =
            serde_json::from_value(json!({"jsonrpc": "2.0", "params": params})).unwrap();
        assert_eq!(parsed.method(), METHOD_STATE_CHANGE);
        assert_eq!(parsed.into_params(), state_change());

        // The untyped form still needs a method to pick the kind.
        assert!(serde_json::from_value::<AnyNotification>(json!({"jsonrpc": "2.0", "params": {}}))
            .is_err());
    }

    #[test]
    fn test_wrong_version_rejected() {
        let result: Result<JsonRpcNotification, _> = serde_json::from_value(json!({
            "jsonrpc": "1.0",
            "method": "notifications/progress"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_version_defaults() {
        let raw: JsonRpcNotification =
            serde_json::from_value(json!({"method": "ping"})).unwrap();
        assert_eq!(raw.jsonrpc, JsonRpcVersion);
        assert_eq!(
            serde_json::to_value(&raw).unwrap(),
            json!({"jsonrpc": "2.0", "method": "ping"})
        );
    }

    #[test]
    fn test_missing_params_rejected() {
        let raw = JsonRpcNotification::new(METHOD_PROGRESS, None);
        assert!(matches!(
            AnyNotification::from_untyped(raw),
            Err(NotifyError::Envelope(EnvelopeError::MissingParams { .. }))
        ));
    }

    #[test]
    fn test_illegal_state_change_params_rejected() {
        let json = json!({
            "jsonrpc": "2.0",
            "method": "notifications/state_change",
            "params": {
                "operationId": OP_ID,
                "oldState": "completed",
                "newState": "running",
                "timestamp": TS
            }
        })
        .to_string();
        assert!(matches!(
            AnyNotification::parse(&json),
            Err(NotifyError::Envelope(EnvelopeError::InvalidParams { .. }))
        ));
    }

    #[test]
    fn test_any_notification_dispatch() {
        let progress = ProgressNotification::new(
            OperationId::parse(OP_ID).unwrap(),
            ProgressToken::parse(PT_ID).unwrap(),
            "scan",
            ProgressMetrics::zero(),
            ts(),
        );
        let error = ErrorNotification::new(
            OperationId::parse(OP_ID).unwrap(),
            ErrorResponse::new(4001, "bad row", ts()).unwrap(),
            ts(),
        );
        for any in [
            AnyNotification::Progress(progress),
            AnyNotification::Error(error),
            AnyNotification::StateChange(state_change()),
        ] {
            let text = serde_json::to_string(&any).unwrap();
            let back = AnyNotification::parse(&text).unwrap();
            assert_eq!(back.method(), any.method());
            assert_eq!(back.operation_id().as_str(), OP_ID);
            assert_eq!(back, any);
        }
    }

    #[test]
    fn test_unknown_method() {
        let raw = JsonRpcNotification::new("notifications/unknown", Some(Map::new()));
        assert_eq!(
            AnyNotification::from_untyped(raw).unwrap_err(),
            NotifyError::Envelope(EnvelopeError::UnknownMethod(
                "notifications/unknown".to_string()
            ))
        );
    }
}
