//! Structured error records
//!
//! An [`ErrorResponse`] is data attached to a failed operation, not a raised
//! fault. Codes are partitioned by [`ErrorDomain`]; three specializations
//! narrow the code range and add one more required field:
//!
//! | Type              | Codes     | Extra requirement     |
//! |-------------------|-----------|-----------------------|
//! | `ConnectionError` | 1000-1999 | `context.operation`   |
//! | `AuthError`       | 2000-2999 | `suggestion`          |
//! | `QueryError`      | 3000-3999 | `context.operation`   |
//!
//! Validation runs the base checks (against the narrower range) first and the
//! extra requirement second.

use crate::validation::{ValidateNonEmpty, ValidateRange};
use crate::{OptrackError, OptrackResult, Timestamp, ValidationError};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::ops::{Deref, RangeInclusive};

/// Every valid error code.
pub const ERROR_CODE_RANGE: RangeInclusive<i32> = 1000..=6999;

// ============================================================================
// ERROR DOMAIN
// ============================================================================

/// Domain an error code belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum ErrorDomain {
    Connection,
    Auth,
    Query,
    Data,
    System,
    Operation,
}

impl ErrorDomain {
    pub const ALL: [ErrorDomain; 6] = [
        ErrorDomain::Connection,
        ErrorDomain::Auth,
        ErrorDomain::Query,
        ErrorDomain::Data,
        ErrorDomain::System,
        ErrorDomain::Operation,
    ];

    /// Inclusive code range owned by this domain.
    pub const fn code_range(&self) -> RangeInclusive<i32> {
        match self {
            ErrorDomain::Connection => 1000..=1999,
            ErrorDomain::Auth => 2000..=2999,
            ErrorDomain::Query => 3000..=3999,
            ErrorDomain::Data => 4000..=4999,
            ErrorDomain::System => 5000..=5999,
            ErrorDomain::Operation => 6000..=6999,
        }
    }

    /// Domain of `code`, or `None` outside 1000-6999.
    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|domain| domain.code_range().contains(&code))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorDomain::Connection => "connection",
            ErrorDomain::Auth => "auth",
            ErrorDomain::Query => "query",
            ErrorDomain::Data => "data",
            ErrorDomain::System => "system",
            ErrorDomain::Operation => "operation",
        }
    }
}

impl fmt::Display for ErrorDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// ERROR CONTEXT
// ============================================================================

/// Context about where an error happened.
///
/// Keys other than the three known ones are kept in `extra` and written back
/// unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct ErrorContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    #[serde(
        default,
        alias = "retries_attempted",
        skip_serializing_if = "Option::is_none"
    )]
    pub retries_attempted: Option<u64>,
    #[serde(flatten)]
    #[cfg_attr(feature = "openapi", schema(value_type = Object))]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = Some(stage.into());
        self
    }

    pub fn with_retries(mut self, retries: u64) -> Self {
        self.retries_attempted = Some(retries);
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

// ============================================================================
// ERROR RESPONSE
// ============================================================================

/// Structured error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(try_from = "ErrorResponseParts")]
pub struct ErrorResponse {
    code: i32,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<ErrorContext>,
    #[serde(skip_serializing_if = "Option::is_none")]
    suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    trace: Option<Vec<String>>,
    timestamp: Timestamp,
}

/// Unvalidated form of an error record; also the inbound wire shape for
/// [`ErrorResponse`] and its specializations.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ErrorResponseParts {
    pub code: i32,
    pub message: String,
    #[serde(default)]
    pub context: Option<ErrorContext>,
    #[serde(default)]
    pub suggestion: Option<String>,
    #[serde(default)]
    pub trace: Option<Vec<String>>,
    pub timestamp: Timestamp,
}

impl ErrorResponse {
    /// Start building an error record.
    pub fn builder(
        code: i32,
        message: impl Into<String>,
        timestamp: Timestamp,
    ) -> ErrorResponseBuilder {
        ErrorResponseBuilder {
            parts: ErrorResponseParts {
                code,
                message: message.into(),
                context: None,
                suggestion: None,
                trace: None,
                timestamp,
            },
        }
    }

    /// A record with only the required fields.
    pub fn new(code: i32, message: impl Into<String>, timestamp: Timestamp) -> OptrackResult<Self> {
        Self::builder(code, message, timestamp).build()
    }

    pub fn from_parts(parts: ErrorResponseParts) -> OptrackResult<Self> {
        validate_error_parts(&parts, ERROR_CODE_RANGE)?;
        Ok(Self::from_validated(parts))
    }

    fn from_validated(parts: ErrorResponseParts) -> Self {
        Self {
            code: parts.code,
            message: parts.message,
            context: parts.context,
            suggestion: parts.suggestion,
            trace: parts.trace,
            timestamp: parts.timestamp,
        }
    }

    pub fn into_parts(self) -> ErrorResponseParts {
        ErrorResponseParts {
            code: self.code,
            message: self.message,
            context: self.context,
            suggestion: self.suggestion,
            trace: self.trace,
            timestamp: self.timestamp,
        }
    }

    pub fn code(&self) -> i32 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn context(&self) -> Option<&ErrorContext> {
        self.context.as_ref()
    }

    pub fn suggestion(&self) -> Option<&str> {
        self.suggestion.as_deref()
    }

    pub fn trace(&self) -> Option<&[String]> {
        self.trace.as_deref()
    }

    pub fn timestamp(&self) -> &Timestamp {
        &self.timestamp
    }

    /// Domain of the code.
    pub fn domain(&self) -> ErrorDomain {
        // Construction keeps the code inside ERROR_CODE_RANGE.
        ErrorDomain::from_code(self.code).unwrap_or(ErrorDomain::Operation)
    }
}

impl TryFrom<ErrorResponseParts> for ErrorResponse {
    type Error = OptrackError;

    fn try_from(parts: ErrorResponseParts) -> Result<Self, Self::Error> {
        Self::from_parts(parts)
    }
}

/// Builder for error records and their specializations.
#[derive(Debug, Clone)]
pub struct ErrorResponseBuilder {
    parts: ErrorResponseParts,
}

impl ErrorResponseBuilder {
    pub fn context(mut self, context: ErrorContext) -> Self {
        self.parts.context = Some(context);
        self
    }

    /// Set `context.operation`, creating the context if needed.
    pub fn operation(mut self, operation: impl Into<String>) -> Self {
        let context = self.parts.context.take().unwrap_or_default();
        self.parts.context = Some(context.with_operation(operation));
        self
    }

    pub fn suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.parts.suggestion = Some(suggestion.into());
        self
    }

    pub fn trace(mut self, trace: Vec<String>) -> Self {
        self.parts.trace = Some(trace);
        self
    }

    /// Append one trace frame.
    pub fn frame(mut self, frame: impl Into<String>) -> Self {
        self.parts
            .trace
            .get_or_insert_with(Vec::new)
            .push(frame.into());
        self
    }

    pub fn build(self) -> OptrackResult<ErrorResponse> {
        self.build_as()
    }

    /// Build any error type that validates from raw parts, e.g. `AuthError`.
    pub fn build_as<T>(self) -> OptrackResult<T>
    where
        T: TryFrom<ErrorResponseParts, Error = OptrackError>,
    {
        T::try_from(self.parts)
    }
}

fn validate_error_parts(
    parts: &ErrorResponseParts,
    range: RangeInclusive<i32>,
) -> Result<(), ValidationError> {
    parts
        .code
        .validate_range("code", *range.start(), *range.end())?;
    parts.message.validate_non_empty("message")?;
    if let Some(trace) = &parts.trace {
        trace.validate_non_empty("trace")?;
    }
    Ok(())
}

fn require_context_operation(
    parts: &ErrorResponseParts,
    kind: &'static str,
) -> Result<(), ValidationError> {
    let has_operation = parts
        .context
        .as_ref()
        .and_then(|context| context.operation.as_ref())
        .is_some();
    if !has_operation {
        return Err(ValidationError::RequiredFieldMissing {
            fields: vec!["context.operation"],
            reason: format!("{kind} requires context.operation"),
        });
    }
    Ok(())
}

fn require_suggestion(
    parts: &ErrorResponseParts,
    kind: &'static str,
) -> Result<(), ValidationError> {
    if parts.suggestion.is_none() {
        return Err(ValidationError::RequiredFieldMissing {
            fields: vec!["suggestion"],
            reason: format!("{kind} requires a suggestion"),
        });
    }
    Ok(())
}

// ============================================================================
// SPECIALIZATIONS
// ============================================================================

macro_rules! specialized_error {
    ($(#[$meta:meta])* $name:ident, domain = $domain:expr, requires = $check:path) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
        #[serde(try_from = "ErrorResponseParts")]
        pub struct $name(ErrorResponse);

        impl $name {
            pub const DOMAIN: ErrorDomain = $domain;

            pub fn from_parts(parts: ErrorResponseParts) -> OptrackResult<Self> {
                validate_error_parts(&parts, Self::DOMAIN.code_range())?;
                $check(&parts, stringify!($name))?;
                Ok(Self(ErrorResponse::from_validated(parts)))
            }

            pub fn as_response(&self) -> &ErrorResponse {
                &self.0
            }

            pub fn into_response(self) -> ErrorResponse {
                self.0
            }
        }

        impl Deref for $name {
            type Target = ErrorResponse;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                self.0.serialize(serializer)
            }
        }

        impl TryFrom<ErrorResponseParts> for $name {
            type Error = OptrackError;

            fn try_from(parts: ErrorResponseParts) -> Result<Self, Self::Error> {
                Self::from_parts(parts)
            }
        }

        impl TryFrom<ErrorResponse> for $name {
            type Error = OptrackError;

            fn try_from(response: ErrorResponse) -> Result<Self, Self::Error> {
                Self::from_parts(response.into_parts())
            }
        }

        impl From<$name> for ErrorResponse {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

specialized_error!(
    /// Connection failure. Must name the operation that was connecting.
    ConnectionError,
    domain = ErrorDomain::Connection,
    requires = require_context_operation
);

specialized_error!(
    /// Authentication failure. Must tell the caller what to do about it.
    AuthError,
    domain = ErrorDomain::Auth,
    requires = require_suggestion
);

specialized_error!(
    /// Query failure. Must name the operation that issued the query.
    QueryError,
    domain = ErrorDomain::Query,
    requires = require_context_operation
);

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ts() -> Timestamp {
        Timestamp::parse("2025-01-15T10:30:00Z").unwrap()
    }

    #[test]
    fn test_code_range_bounds() {
        assert_eq!(ErrorResponse::new(1000, "test", ts()).unwrap().code(), 1000);
        assert_eq!(ErrorResponse::new(6999, "test", ts()).unwrap().code(), 6999);
        for code in [999, 7000, 0, -1] {
            assert!(matches!(
                ErrorResponse::new(code, "test", ts()),
                Err(OptrackError::Validation(ValidationError::OutOfRange { field: "code", .. }))
            ));
        }
    }

    #[test]
    fn test_empty_message_rejected() {
        assert!(matches!(
            ErrorResponse::new(1001, "", ts()),
            Err(OptrackError::Validation(ValidationError::Empty { field: "message" }))
        ));
    }

    #[test]
    fn test_trace_must_be_non_empty_when_present() {
        let empty = ErrorResponse::builder(1001, "err", ts()).trace(vec![]).build();
        assert!(matches!(
            empty,
            Err(OptrackError::Validation(ValidationError::Empty { field: "trace" }))
        ));
        let populated = ErrorResponse::builder(1001, "err", ts())
            .frame("frame1")
            .build()
            .unwrap();
        assert_eq!(populated.trace(), Some(&["frame1".to_string()][..]));
    }

    #[test]
    fn test_domain_classification() {
        assert_eq!(ErrorDomain::from_code(1500), Some(ErrorDomain::Connection));
        assert_eq!(ErrorDomain::from_code(2999), Some(ErrorDomain::Auth));
        assert_eq!(ErrorDomain::from_code(3000), Some(ErrorDomain::Query));
        assert_eq!(ErrorDomain::from_code(4321), Some(ErrorDomain::Data));
        assert_eq!(ErrorDomain::from_code(5001), Some(ErrorDomain::System));
        assert_eq!(ErrorDomain::from_code(6999), Some(ErrorDomain::Operation));
        assert_eq!(ErrorDomain::from_code(7000), None);
        assert_eq!(
            ErrorResponse::new(5001, "boom", ts()).unwrap().domain(),
            ErrorDomain::System
        );
    }

    #[test]
    fn test_context_extra_keys_round_trip() {
        let value = json!({
            "operation": "connect",
            "retriesAttempted": 3,
            "custom_field": "value",
            "another": 42
        });
        let ctx: ErrorContext = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(ctx.operation.as_deref(), Some("connect"));
        assert_eq!(ctx.retries_attempted, Some(3));
        assert_eq!(ctx.extra.get("custom_field"), Some(&json!("value")));
        assert_eq!(ctx.extra.get("another"), Some(&json!(42)));
        assert_eq!(serde_json::to_value(&ctx).unwrap(), value);
    }

    #[test]
    fn test_context_accepts_snake_case_retries() {
        let ctx: ErrorContext =
            serde_json::from_value(json!({"retries_attempted": 5})).unwrap();
        assert_eq!(ctx.retries_attempted, Some(5));
        assert!(ctx.extra.is_empty());
        let out = serde_json::to_value(&ctx).unwrap();
        assert_eq!(out, json!({"retriesAttempted": 5}));
    }

    #[test]
    fn test_context_rejects_negative_retries() {
        assert!(serde_json::from_value::<ErrorContext>(json!({"retriesAttempted": -1})).is_err());
    }

    #[test]
    fn test_connection_error_requires_operation() {
        let missing = ErrorResponse::builder(1001, "err", ts())
            .context(ErrorContext::new())
            .build_as::<ConnectionError>();
        assert!(matches!(
            missing,
            Err(OptrackError::Validation(ValidationError::RequiredFieldMissing { ref fields, .. }))
                if fields == &vec!["context.operation"]
        ));

        let ok = ErrorResponse::builder(1001, "Failed to connect to database", ts())
            .context(ErrorContext::new().with_operation("connect").with_retries(3))
            .build_as::<ConnectionError>()
            .unwrap();
        assert_eq!(ok.code(), 1001);
    }

    #[test]
    fn test_connection_error_code_range() {
        let wrong = ErrorResponse::builder(2000, "err", ts())
            .operation("test")
            .build_as::<ConnectionError>();
        assert!(matches!(
            wrong,
            Err(OptrackError::Validation(ValidationError::OutOfRange { field: "code", .. }))
        ));
    }

    #[test]
    fn test_range_checked_before_extra_requirement() {
        // Both wrong: the range failure is reported first.
        let err = ErrorResponse::builder(1000, "err", ts())
            .build_as::<AuthError>()
            .unwrap_err();
        assert!(matches!(
            err,
            OptrackError::Validation(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_auth_error_lifecycle() {
        assert!(ErrorResponse::builder(1000, "err", ts())
            .suggestion("try again")
            .build_as::<AuthError>()
            .is_err());
        assert!(ErrorResponse::builder(2001, "err", ts())
            .build_as::<AuthError>()
            .is_err());

        let auth = ErrorResponse::builder(2001, "Invalid credentials provided", ts())
            .suggestion("Verify your username and password are correct")
            .build_as::<AuthError>()
            .unwrap();
        let wire = serde_json::to_string(&auth).unwrap();
        let back: AuthError = serde_json::from_str(&wire).unwrap();
        assert_eq!(back, auth);
    }

    #[test]
    fn test_query_error_from_fixture() {
        let value = json!({
            "code": 3001,
            "message": "SQL syntax error in query",
            "context": {"operation": "executeQuery", "stage": "parsing"},
            "suggestion": "Check your SQL syntax",
            "timestamp": "2025-01-15T10:30:00.000Z"
        });
        let err: QueryError = serde_json::from_value(value.clone()).unwrap();
        assert_eq!(
            err.context().and_then(|c| c.operation.as_deref()),
            Some("executeQuery")
        );
        assert_eq!(serde_json::to_value(&err).unwrap(), value);

        let missing: Result<QueryError, _> = serde_json::from_value(json!({
            "code": 3001,
            "message": "err",
            "context": {},
            "timestamp": "2025-01-15T10:30:00Z"
        }));
        assert!(missing.is_err());
    }

    #[test]
    fn test_specialization_into_base() {
        let conn = ErrorResponse::builder(1002, "refused", ts())
            .operation("connect")
            .build_as::<ConnectionError>()
            .unwrap();
        let base: ErrorResponse = conn.clone().into();
        assert_eq!(base.domain(), ErrorDomain::Connection);
        assert_eq!(ConnectionError::try_from(base).unwrap(), conn);
    }

    #[test]
    fn test_base_parse_validates() {
        let result: Result<ErrorResponse, _> = serde_json::from_value(json!({
            "code": 7000,
            "message": "err",
            "timestamp": "2025-01-15T10:30:00Z"
        }));
        assert!(result.is_err());
    }
}
