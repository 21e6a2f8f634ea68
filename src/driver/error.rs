//! Driver Error Types
//!
//! 드라이버 에러 정의

use thiserror::Error;

use crate::bolt::error::{BoltError, FramingError, HandshakeError, TransportError};
use crate::bolt::handshake::BoltVersion;
use crate::bolt::message::FailureMessage;
use crate::bolt::packstream::PackStreamError;

// ============================================================================
// DriverError - 드라이버 에러
// ============================================================================

/// 드라이버 에러
///
/// 전송/코덱/프레이밍 계열 에러는 연결을 더 이상 쓸 수 없게 만들고,
/// 서버가 보낸 FAILURE는 ACK_FAILURE 또는 RESET으로 복구할 수 있습니다.
#[derive(Error, Debug)]
pub enum DriverError {
    /// 전송 계층 에러 (소켓 연결/읽기/쓰기)
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// 핸드셰이크 에러
    #[error("Handshake error: {0}")]
    Handshake(#[from] HandshakeError),

    /// PackStream 인코딩/디코딩 에러
    #[error("Codec error: {0}")]
    Codec(#[from] PackStreamError),

    /// 청크 프레이밍 에러
    #[error("Framing error: {0}")]
    Framing(#[from] FramingError),

    /// 서버가 요청에 FAILURE로 응답
    #[error("Server failure: {0}")]
    Failure(FailureMessage),

    /// INIT 단계의 FAILURE (인증 실패)
    #[error("Authentication error: {0}")]
    Authentication(FailureMessage),

    /// 협상된 버전을 처리할 세션 구현이 없음
    #[error("Unsupported protocol version: {0}")]
    UnsupportedVersion(BoltVersion),

    /// 세션이 이미 실패 상태여서 서버가 요청을 무시함
    #[error("Request ignored: session is in a failed state")]
    Ignored,

    /// 세션 에러 (잘못된 상태에서의 호출 등)
    #[error("Session error: {0}")]
    Session(String),

    /// 프로토콜 에러 (예상하지 못한 메시지)
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// 라우팅 에러
    #[error("Routing error: {0}")]
    Routing(String),

    /// 설정 에러
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// 타입 변환 에러
    #[error("Type conversion error: {0}")]
    TypeConversion(String),
}

impl DriverError {
    /// 세션 에러 생성
    pub fn session(msg: impl Into<String>) -> Self {
        Self::Session(msg.into())
    }

    /// 프로토콜 에러 생성
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// 라우팅 에러 생성
    pub fn routing(msg: impl Into<String>) -> Self {
        Self::Routing(msg.into())
    }

    /// 설정 에러 생성
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// 타입 변환 에러 생성
    pub fn type_conversion(msg: impl Into<String>) -> Self {
        Self::TypeConversion(msg.into())
    }

    /// 연결을 버려야 하는 에러인지 여부
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Transport(_)
                | Self::Handshake(_)
                | Self::Codec(_)
                | Self::Framing(_)
                | Self::Authentication(_)
                | Self::UnsupportedVersion(_)
                | Self::Protocol(_)
        )
    }

    /// 서버 실패 메시지 (있으면)
    pub fn failure(&self) -> Option<&FailureMessage> {
        match self {
            Self::Failure(f) | Self::Authentication(f) => Some(f),
            _ => None,
        }
    }

    /// 재시도 가능 여부
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Failure(f) => f.is_transient(),
            _ => false,
        }
    }

    /// 클라이언트 에러 여부
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::Failure(f) => f.is_client_error(),
            Self::Authentication(_) | Self::Configuration(_) | Self::TypeConversion(_) => true,
            _ => false,
        }
    }
}

impl From<BoltError> for DriverError {
    fn from(err: BoltError) -> Self {
        match err {
            BoltError::Transport(e) => Self::Transport(e),
            BoltError::Framing(e) => Self::Framing(e),
            BoltError::PackStream(e) => Self::Codec(e),
            BoltError::Handshake(e) => Self::Handshake(e),
            BoltError::Protocol(msg) => Self::Protocol(msg),
        }
    }
}

// ============================================================================
// Result Type
// ============================================================================

/// 드라이버 결과 타입
pub type DriverResult<T> = Result<T, DriverError>;

// ============================================================================
// Tests
// ============================================================================
