//! Bolt protocol request messages.
//!
//! Request messages are sent from the client to the server.

use super::signature;
use crate::bolt::packstream::{PackStreamError, PackStreamMap, PackStreamStructure, PackStreamValue};

/// All Bolt v1 request messages.
#[derive(Debug, Clone, PartialEq)]
pub enum BoltRequest {
    /// INIT - Authenticate and initialize the connection
    Init(InitMessage),
    /// RUN - Execute a query
    Run(RunMessage),
    /// PULL_ALL - Stream every remaining record
    PullAll,
    /// DISCARD_ALL - Drop every remaining record
    DiscardAll,
    /// ACK_FAILURE - Acknowledge a failure and clear the failed state
    AckFailure,
    /// RESET - Abandon pending work and return to a clean state
    Reset,
}

impl BoltRequest {
    /// Get the message signature.
    pub fn tag(&self) -> u8 {
        match self {
            BoltRequest::Init(_) => signature::INIT,
            BoltRequest::Run(_) => signature::RUN,
            BoltRequest::PullAll => signature::PULL_ALL,
            BoltRequest::DiscardAll => signature::DISCARD_ALL,
            BoltRequest::AckFailure => signature::ACK_FAILURE,
            BoltRequest::Reset => signature::RESET,
        }
    }

    /// Get message name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            BoltRequest::Init(_) => "INIT",
            BoltRequest::Run(_) => "RUN",
            BoltRequest::PullAll => "PULL_ALL",
            BoltRequest::DiscardAll => "DISCARD_ALL",
            BoltRequest::AckFailure => "ACK_FAILURE",
            BoltRequest::Reset => "RESET",
        }
    }

    /// Convert to PackStream structure.
    pub fn to_structure(&self) -> PackStreamStructure {
        match self {
            BoltRequest::Init(msg) => msg.to_structure(),
            BoltRequest::Run(msg) => msg.to_structure(),
            other => PackStreamStructure::new(other.tag(), vec![]),
        }
    }

    /// Parse from PackStream structure.
    pub fn from_structure(s: &PackStreamStructure) -> Result<Self, PackStreamError> {
        match s.signature {
            signature::INIT => Ok(BoltRequest::Init(InitMessage::from_structure(s)?)),
            signature::RUN => Ok(BoltRequest::Run(RunMessage::from_structure(s)?)),
            signature::PULL_ALL => Ok(BoltRequest::PullAll),
            signature::DISCARD_ALL => Ok(BoltRequest::DiscardAll),
            signature::ACK_FAILURE => Ok(BoltRequest::AckFailure),
            signature::RESET => Ok(BoltRequest::Reset),
            _ => Err(PackStreamError::InvalidStructure(format!(
                "Unknown request message signature: 0x{:02X}",
                s.signature
            ))),
        }
    }
}

/// INIT message - Initialize connection.
///
/// Carries the client name and the authentication map exactly as the
/// caller built it.
#[derive(Debug, Clone, PartialEq)]
pub struct InitMessage {
    /// User agent string
    pub user_agent: String,
    /// Authentication token (`scheme`, `principal`, `credentials`, ...)
    pub auth: PackStreamMap,
}

impl InitMessage {
    /// Create a new INIT message.
    pub fn new(user_agent: impl Into<String>, auth: PackStreamMap) -> Self {
        Self {
            user_agent: user_agent.into(),
            auth,
        }
    }

    /// Authentication scheme, if present.
    pub fn scheme(&self) -> Option<&str> {
        self.auth.get("scheme").and_then(|v| v.as_str())
    }

    /// Convert to PackStream structure.
    pub fn to_structure(&self) -> PackStreamStructure {
        PackStreamStructure::new(
            signature::INIT,
            vec![
                PackStreamValue::String(self.user_agent.clone()),
                PackStreamValue::Map(self.auth.clone()),
            ],
        )
    }

    /// Parse from PackStream structure.
    pub fn from_structure(s: &PackStreamStructure) -> Result<Self, PackStreamError> {
        if s.signature != signature::INIT {
            return Err(PackStreamError::InvalidStructure("Expected INIT signature".to_string()));
        }

        let user_agent = s
            .fields
            .first()
            .and_then(|v| v.as_str())
            .ok_or_else(|| PackStreamError::InvalidStructure("INIT requires user agent".to_string()))?
            .to_string();

        let auth = s
            .fields
            .get(1)
            .and_then(|v| v.as_map())
            .cloned()
            .ok_or_else(|| PackStreamError::InvalidStructure("INIT requires auth map".to_string()))?;

        Ok(Self { user_agent, auth })
    }
}

/// RUN message - Execute a query.
#[derive(Debug, Clone, PartialEq)]
pub struct RunMessage {
    /// Query string
    pub query: String,
    /// Query parameters
    pub parameters: PackStreamMap,
}

impl RunMessage {
    /// Create a new RUN message without parameters.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            parameters: PackStreamMap::new(),
        }
    }

    /// Set query parameters.
    pub fn with_parameters(mut self, parameters: PackStreamMap) -> Self {
        self.parameters = parameters;
        self
    }

    /// Convert to PackStream structure.
    pub fn to_structure(&self) -> PackStreamStructure {
        PackStreamStructure::new(
            signature::RUN,
            vec![
                PackStreamValue::String(self.query.clone()),
                PackStreamValue::Map(self.parameters.clone()),
            ],
        )
    }

    /// Parse from PackStream structure.
    pub fn from_structure(s: &PackStreamStructure) -> Result<Self, PackStreamError> {
        if s.signature != signature::RUN {
            return Err(PackStreamError::InvalidStructure("Expected RUN signature".to_string()));
        }

        let query = s
            .fields
            .first()
            .and_then(|v| v.as_str())
            .ok_or_else(|| PackStreamError::InvalidStructure("RUN requires query string".to_string()))?
            .to_string();

        // Parameters may be omitted by lenient peers
        let parameters = match s.fields.get(1) {
            None => PackStreamMap::new(),
            Some(PackStreamValue::Map(map)) => map.clone(),
            Some(_) => {
                return Err(PackStreamError::InvalidStructure(
                    "RUN parameters must be map".to_string(),
                ))
            }
        };

        Ok(Self { query, parameters })
    }
}
