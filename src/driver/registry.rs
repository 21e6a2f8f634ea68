//! Session Registry
//!
//! 협상된 프로토콜 버전에 맞는 세션 구현을 고르고, 연결당 세션을
//! 하나만 유지합니다.

use tracing::{debug, trace};

use super::driver::AuthToken;
use super::error::{DriverError, DriverResult};
use super::session::Session;
use crate::bolt::codec::ChunkFramer;
use crate::bolt::handshake::BoltVersion;
use crate::bolt::transport::Transport;

// ============================================================================
// SessionProvider - 세션 구현
// ============================================================================

/// 특정 프로토콜 버전의 세션을 여는 구현
pub trait SessionProvider: Send + Sync {
    /// 구현 이름 (로그용)
    fn name(&self) -> &'static str;

    /// 이 버전을 처리할 수 있는지 여부
    fn supports(&self, version: BoltVersion) -> bool;

    /// 전송 계층을 넘겨받아 세션을 연다
    fn open(
        &self,
        transport: Box<dyn Transport>,
        version: BoltVersion,
        auth: &AuthToken,
        user_agent: &str,
        framer: ChunkFramer,
    ) -> DriverResult<Session>;
}

/// Bolt v1 세션 구현
#[derive(Debug, Clone, Copy, Default)]
pub struct V1SessionProvider;

impl SessionProvider for V1SessionProvider {
    fn name(&self) -> &'static str {
        "bolt-v1"
    }

    fn supports(&self, version: BoltVersion) -> bool {
        version.major() == 1
    }

    fn open(
        &self,
        transport: Box<dyn Transport>,
        version: BoltVersion,
        auth: &AuthToken,
        user_agent: &str,
        framer: ChunkFramer,
    ) -> DriverResult<Session> {
        Session::open(transport, version, auth, user_agent, framer)
    }
}

// ============================================================================
// SessionRegistry - 세션 레지스트리
// ============================================================================

/// 연결 하나에 대한 세션 레지스트리
///
/// 첫 [`get_session`](Self::get_session) 호출이 전송 계층의 소유권을
/// 세션으로 옮기고, 이후 호출은 같은 세션을 돌려줍니다.
pub struct SessionRegistry {
    transport: Option<Box<dyn Transport>>,
    providers: Vec<Box<dyn SessionProvider>>,
    session: Option<Session>,
    framer: ChunkFramer,
}

impl SessionRegistry {
    /// 새 레지스트리 생성 (등록된 구현 없음)
    pub fn new(transport: Box<dyn Transport>, framer: ChunkFramer) -> Self {
        Self {
            transport: Some(transport),
            providers: Vec::new(),
            session: None,
            framer,
        }
    }

    /// 세션 구현 등록
    ///
    /// 먼저 등록된 구현이 우선합니다.
    pub fn register_session(&mut self, provider: Box<dyn SessionProvider>) {
        debug!(provider = provider.name(), "Registered session provider");
        self.providers.push(provider);
    }

    /// 등록된 구현 수
    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    /// 세션이 이미 열렸는지 여부
    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    /// 전송 계층 (세션이 열렸으면 세션의 것)
    pub fn transport_mut(&mut self) -> Option<&mut dyn Transport> {
        if let Some(session) = self.session.as_mut() {
            return Some(session.transport_mut());
        }
        match self.transport.as_mut() {
            Some(transport) => {
                let transport: &mut dyn Transport = transport.as_mut();
                Some(transport)
            }
            None => None,
        }
    }

    /// 세션 가져오기 (없으면 INIT으로 생성)
    pub fn get_session(
        &mut self,
        version: BoltVersion,
        auth: &AuthToken,
        user_agent: &str,
    ) -> DriverResult<&mut Session> {
        if self.session.is_none() {
            let provider = self
                .providers
                .iter()
                .find(|p| p.supports(version))
                .ok_or(DriverError::UnsupportedVersion(version))?;
            let transport = self
                .transport
                .take()
                .ok_or_else(|| DriverError::session("Connection was lost during session setup"))?;

            let session = provider.open(transport, version, auth, user_agent, self.framer)?;
            debug!(provider = provider.name(), version = %version, "Session opened");
            self.session = Some(session);
        } else {
            trace!("Reusing session");
        }

        self.session
            .as_mut()
            .ok_or_else(|| DriverError::session("Session unavailable"))
    }

    /// 열린 세션 (있으면)
    pub fn session_mut(&mut self) -> Option<&mut Session> {
        self.session.as_mut()
    }

    /// 세션과 전송 계층 닫기
    pub fn close(&mut self) -> DriverResult<()> {
        if let Some(session) = self.session.as_mut() {
            return session.close();
        }
        if let Some(transport) = self.transport.as_mut() {
            if transport.is_connected() {
                transport.close()?;
            }
        }
        Ok(())
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let providers: Vec<&str> = self.providers.iter().map(|p| p.name()).collect();
        f.debug_struct("SessionRegistry")
            .field("providers", &providers)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
