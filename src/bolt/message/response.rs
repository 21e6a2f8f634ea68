//! Bolt protocol response messages.
//!
//! Response messages are sent from the server to the client.

use super::{decode_message, signature};
use crate::bolt::packstream::{PackStreamError, PackStreamMap, PackStreamStructure, PackStreamValue};

/// All Bolt response messages.
#[derive(Debug, Clone, PartialEq)]
pub enum BoltResponse {
    /// SUCCESS - Operation completed successfully
    Success(SuccessMessage),
    /// RECORD - Query result record
    Record(RecordMessage),
    /// FAILURE - Operation failed
    Failure(FailureMessage),
    /// IGNORED - Message was ignored (connection in FAILED state)
    Ignored,
}

impl BoltResponse {
    /// Decode an unframed response payload.
    pub fn decode(payload: &[u8]) -> Result<Self, PackStreamError> {
        Self::from_structure(&decode_message(payload)?)
    }

    /// Get the message signature.
    pub fn tag(&self) -> u8 {
        match self {
            BoltResponse::Success(_) => signature::SUCCESS,
            BoltResponse::Record(_) => signature::RECORD,
            BoltResponse::Failure(_) => signature::FAILURE,
            BoltResponse::Ignored => signature::IGNORED,
        }
    }

    /// Get message name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            BoltResponse::Success(_) => "SUCCESS",
            BoltResponse::Record(_) => "RECORD",
            BoltResponse::Failure(_) => "FAILURE",
            BoltResponse::Ignored => "IGNORED",
        }
    }

    /// Check if this is a success response.
    pub fn is_success(&self) -> bool {
        matches!(self, BoltResponse::Success(_))
    }

    /// Check if this is a failure response.
    pub fn is_failure(&self) -> bool {
        matches!(self, BoltResponse::Failure(_))
    }

    /// Check if this is a record response.
    pub fn is_record(&self) -> bool {
        matches!(self, BoltResponse::Record(_))
    }

    /// Convert to PackStream structure.
    pub fn to_structure(&self) -> PackStreamStructure {
        match self {
            BoltResponse::Success(msg) => msg.to_structure(),
            BoltResponse::Record(msg) => msg.to_structure(),
            BoltResponse::Failure(msg) => msg.to_structure(),
            BoltResponse::Ignored => PackStreamStructure::new(signature::IGNORED, vec![]),
        }
    }

    /// Parse from PackStream structure.
    pub fn from_structure(s: &PackStreamStructure) -> Result<Self, PackStreamError> {
        match s.signature {
            signature::SUCCESS => Ok(BoltResponse::Success(SuccessMessage::from_structure(s)?)),
            signature::RECORD => Ok(BoltResponse::Record(RecordMessage::from_structure(s)?)),
            signature::FAILURE => Ok(BoltResponse::Failure(FailureMessage::from_structure(s)?)),
            signature::IGNORED => Ok(BoltResponse::Ignored),
            _ => Err(PackStreamError::InvalidStructure(format!(
                "Unknown response message signature: 0x{:02X}",
                s.signature
            ))),
        }
    }
}

/// SUCCESS message - Operation completed successfully.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SuccessMessage {
    /// Response metadata
    pub metadata: PackStreamMap,
}

impl SuccessMessage {
    /// Create a SUCCESS message with empty metadata.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a SUCCESS message with metadata.
    pub fn with_metadata(metadata: PackStreamMap) -> Self {
        Self { metadata }
    }

    /// Add metadata entry.
    pub fn add(&mut self, key: &str, value: impl Into<PackStreamValue>) {
        self.metadata.insert(key, value);
    }

    /// Get metadata entry.
    pub fn get(&self, key: &str) -> Option<&PackStreamValue> {
        self.metadata.get(key)
    }

    /// Get server name (INIT success).
    pub fn server(&self) -> Option<&str> {
        self.get("server").and_then(|v| v.as_str())
    }

    /// Get field names (RUN success).
    pub fn fields(&self) -> Option<Vec<String>> {
        self.get("fields").and_then(|v| v.as_list()).map(|list| {
            list.iter()
                .filter_map(|item| item.as_str().map(|s| s.to_string()))
                .collect()
        })
    }

    /// Milliseconds until the first record was available (RUN success).
    pub fn result_available_after(&self) -> Option<i64> {
        self.get("result_available_after").and_then(|v| v.as_int())
    }

    /// Milliseconds until the last record was consumed (stream end).
    pub fn result_consumed_after(&self) -> Option<i64> {
        self.get("result_consumed_after").and_then(|v| v.as_int())
    }

    /// Query type code: `r`, `w`, `rw` or `s` (stream end).
    pub fn query_type(&self) -> Option<&str> {
        self.get("type").and_then(|v| v.as_str())
    }

    /// Get query statistics (stream end).
    pub fn stats(&self) -> Option<&PackStreamMap> {
        self.get("stats").and_then(|v| v.as_map())
    }

    /// Get notifications (stream end).
    pub fn notifications(&self) -> Option<&[PackStreamValue]> {
        self.get("notifications").and_then(|v| v.as_list())
    }

    /// Create an INIT success response.
    pub fn init_success(server: &str) -> Self {
        let mut msg = Self::empty();
        msg.add("server", server);
        msg
    }

    /// Create a RUN success response.
    pub fn run_success<S: Into<String>>(fields: impl IntoIterator<Item = S>) -> Self {
        let field_list: Vec<PackStreamValue> = fields
            .into_iter()
            .map(|f| PackStreamValue::String(f.into()))
            .collect();
        let mut msg = Self::empty();
        msg.add("fields", field_list);
        msg
    }

    /// Create a stream-terminating success response.
    pub fn summary_success(query_type: &str) -> Self {
        let mut msg = Self::empty();
        msg.add("type", query_type);
        msg
    }

    /// Convert to PackStream structure.
    pub fn to_structure(&self) -> PackStreamStructure {
        PackStreamStructure::new(
            signature::SUCCESS,
            vec![PackStreamValue::Map(self.metadata.clone())],
        )
    }

    /// Parse from PackStream structure.
    pub fn from_structure(s: &PackStreamStructure) -> Result<Self, PackStreamError> {
        if s.signature != signature::SUCCESS {
            return Err(PackStreamError::InvalidStructure("Expected SUCCESS signature".to_string()));
        }

        let metadata = match s.fields.first() {
            None => PackStreamMap::new(),
            Some(PackStreamValue::Map(map)) => map.clone(),
            Some(_) => {
                return Err(PackStreamError::InvalidStructure(
                    "SUCCESS metadata must be map".to_string(),
                ))
            }
        };

        Ok(Self { metadata })
    }
}

/// RECORD message - Query result record.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordMessage {
    /// Field values
    pub fields: Vec<PackStreamValue>,
}

impl RecordMessage {
    /// Create a new RECORD message.
    pub fn new(fields: Vec<PackStreamValue>) -> Self {
        Self { fields }
    }

    /// Get field count.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if record is empty.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Get field at index.
    pub fn get(&self, index: usize) -> Option<&PackStreamValue> {
        self.fields.get(index)
    }

    /// Convert to PackStream structure.
    pub fn to_structure(&self) -> PackStreamStructure {
        PackStreamStructure::new(
            signature::RECORD,
            vec![PackStreamValue::List(self.fields.clone())],
        )
    }

    /// Parse from PackStream structure.
    pub fn from_structure(s: &PackStreamStructure) -> Result<Self, PackStreamError> {
        if s.signature != signature::RECORD {
            return Err(PackStreamError::InvalidStructure("Expected RECORD signature".to_string()));
        }

        match s.fields.first() {
            Some(PackStreamValue::List(list)) => Ok(Self { fields: list.clone() }),
            _ => Err(PackStreamError::InvalidStructure(
                "RECORD fields must be list".to_string(),
            )),
        }
    }
}

/// FAILURE message - Operation failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureMessage {
    /// Server error code, e.g. `Neo.ClientError.Statement.SyntaxError`
    pub code: String,
    /// Error message
    pub message: String,
}

impl FailureMessage {
    /// Create a new FAILURE message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Get error classification from code (`ClientError`, `TransientError`, ...).
    pub fn classification(&self) -> &str {
        self.code.split('.').nth(1).unwrap_or("Unknown")
    }

    /// Get error category from code (`Statement`, `Security`, ...).
    pub fn category(&self) -> &str {
        self.code.split('.').nth(2).unwrap_or("Unknown")
    }

    /// Check if this is a client error.
    pub fn is_client_error(&self) -> bool {
        self.classification() == "ClientError"
    }

    /// Check if this is a transient error.
    pub fn is_transient(&self) -> bool {
        self.classification() == "TransientError"
    }

    /// Check if this is a database error.
    pub fn is_database_error(&self) -> bool {
        self.classification() == "DatabaseError"
    }

    /// Convert to PackStream structure.
    pub fn to_structure(&self) -> PackStreamStructure {
        let mut metadata = PackStreamMap::with_capacity(2);
        metadata.insert("code", self.code.as_str());
        metadata.insert("message", self.message.as_str());

        PackStreamStructure::new(signature::FAILURE, vec![PackStreamValue::Map(metadata)])
    }

    /// Parse from PackStream structure.
    pub fn from_structure(s: &PackStreamStructure) -> Result<Self, PackStreamError> {
        if s.signature != signature::FAILURE {
            return Err(PackStreamError::InvalidStructure("Expected FAILURE signature".to_string()));
        }

        let metadata = s
            .fields
            .first()
            .and_then(|v| v.as_map())
            .ok_or_else(|| PackStreamError::InvalidStructure("FAILURE requires metadata map".to_string()))?;

        let code = metadata
            .get("code")
            .and_then(|v| v.as_str())
            .ok_or_else(|| PackStreamError::InvalidStructure("FAILURE requires code".to_string()))?
            .to_string();

        let message = metadata
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        Ok(Self { code, message })
    }
}

impl std::fmt::Display for FailureMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}
