//! Driver
//!
//! 드라이버 인스턴스 및 설정

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::bolt::{user_agent, TcpTransportFactory, TransportFactory, DEFAULT_PORT};
use super::error::{DriverError, DriverResult};
use super::events::{ConnectionEvent, ConnectionListener, EventHub};
use super::registry::{SessionRegistry, V1SessionProvider};
use super::routing::{ClusterTopology, RandomSelector, ServerSelector};
use super::session::Session;
use crate::bolt::codec::{ChunkFramer, DEFAULT_MAX_MESSAGE_SIZE, MAX_CHUNK_SIZE};
use crate::bolt::handshake::{BoltVersion, Handshake, DEFAULT_PROPOSALS};
use crate::bolt::packstream::PackStreamMap;
use crate::bolt::transport::Transport;

// ============================================================================
// AuthToken - 인증 토큰
// ============================================================================

/// 인증 토큰
///
/// INIT 메시지의 인증 맵으로 그대로 전달됩니다.
#[derive(Clone, PartialEq, Default)]
pub enum AuthToken {
    /// 인증 없음
    #[default]
    None,
    /// Basic 인증 (사용자명/비밀번호)
    Basic {
        /// 사용자명
        username: String,
        /// 비밀번호
        password: String,
        /// 인증 영역
        realm: Option<String>,
    },
    /// 커스텀 인증
    Custom {
        /// 주체
        principal: String,
        /// 자격 증명
        credentials: String,
        /// 인증 영역
        realm: String,
        /// 인증 스킴
        scheme: String,
        /// 추가 파라미터
        parameters: Option<PackStreamMap>,
    },
}

impl AuthToken {
    /// Basic 인증 토큰 생성
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: password.into(),
            realm: None,
        }
    }

    /// Basic 인증 토큰 생성 (realm 포함)
    pub fn basic_with_realm(
        username: impl Into<String>,
        password: impl Into<String>,
        realm: impl Into<String>,
    ) -> Self {
        Self::Basic {
            username: username.into(),
            password: password.into(),
            realm: Some(realm.into()),
        }
    }

    /// 커스텀 토큰 생성
    pub fn custom(
        principal: impl Into<String>,
        credentials: impl Into<String>,
        realm: impl Into<String>,
        scheme: impl Into<String>,
        parameters: Option<PackStreamMap>,
    ) -> Self {
        Self::Custom {
            principal: principal.into(),
            credentials: credentials.into(),
            realm: realm.into(),
            scheme: scheme.into(),
            parameters,
        }
    }

    /// 인증 없음
    pub fn none() -> Self {
        Self::None
    }

    /// 인증 스킴
    pub fn scheme(&self) -> &str {
        match self {
            Self::None => "none",
            Self::Basic { .. } => "basic",
            Self::Custom { scheme, .. } => scheme,
        }
    }

    /// INIT 인증 맵으로 변환
    pub fn to_map(&self) -> PackStreamMap {
        let mut map = PackStreamMap::new();
        map.insert("scheme", self.scheme());
        match self {
            Self::None => {}
            Self::Basic {
                username,
                password,
                realm,
            } => {
                map.insert("principal", username.as_str());
                map.insert("credentials", password.as_str());
                if let Some(realm) = realm {
                    map.insert("realm", realm.as_str());
                }
            }
            Self::Custom {
                principal,
                credentials,
                realm,
                parameters,
                ..
            } => {
                map.insert("principal", principal.as_str());
                map.insert("credentials", credentials.as_str());
                if !realm.is_empty() {
                    map.insert("realm", realm.as_str());
                }
                if let Some(parameters) = parameters {
                    map.insert("parameters", parameters.clone());
                }
            }
        }
        map
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 자격 증명은 출력하지 않음
        match self {
            Self::None => f.write_str("None"),
            Self::Basic { username, realm, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("realm", realm)
                .finish_non_exhaustive(),
            Self::Custom {
                principal,
                realm,
                scheme,
                ..
            } => f
                .debug_struct("Custom")
                .field("principal", principal)
                .field("realm", realm)
                .field("scheme", scheme)
                .finish_non_exhaustive(),
        }
    }
}

// ============================================================================
// ServerAddress - 서버 주소
// ============================================================================

/// 서버 주소
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServerAddress {
    /// 호스트
    pub host: String,
    /// 포트
    pub port: u16,
}

impl ServerAddress {
    /// 새 서버 주소 생성
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// URI에서 파싱
    ///
    /// `bolt://host:port`, `host:port`, `host`, `[IPv6]:port` 형식을 받습니다.
    /// 포트가 없으면 7687을 사용합니다.
    pub fn from_uri(uri: &str) -> DriverResult<Self> {
        let rest = match uri.trim().split_once("://") {
            Some(("bolt", rest)) => rest,
            Some((scheme, _)) => {
                return Err(DriverError::configuration(format!(
                    "Unsupported URI scheme '{}'",
                    scheme
                )))
            }
            None => uri.trim(),
        };

        // 경로는 무시
        let authority = rest.split('/').next().unwrap_or_default();
        let (host, port) = match authority.strip_prefix('[') {
            // IPv6: [addr] 또는 [addr]:port
            Some(bracketed) => {
                let (host, tail) = bracketed.split_once(']').ok_or_else(|| {
                    DriverError::configuration(format!("Unclosed '[' in '{}'", uri))
                })?;
                match tail {
                    "" => (host, None),
                    _ => match tail.strip_prefix(':') {
                        Some(port) => (host, Some(port)),
                        None => {
                            return Err(DriverError::configuration(format!(
                                "Unexpected '{}' after IPv6 host",
                                tail
                            )))
                        }
                    },
                }
            }
            None => match authority.split_once(':') {
                Some((_, port)) if port.contains(':') => {
                    return Err(DriverError::configuration(format!(
                        "IPv6 host must be bracketed in '{}'",
                        uri
                    )))
                }
                Some((host, port)) => (host, Some(port)),
                None => (authority, None),
            },
        };
        let port = match port {
            Some(port) => port
                .parse()
                .map_err(|_| DriverError::configuration(format!("Invalid port '{}'", port)))?,
            None => DEFAULT_PORT,
        };

        if host.is_empty() {
            return Err(DriverError::configuration(format!(
                "Missing host in '{}'",
                uri
            )));
        }
        Ok(Self::new(host, port))
    }

    /// 소켓 주소로 변환
    pub fn to_socket_addr(&self) -> String {
        self.to_string()
    }
}

impl FromStr for ServerAddress {
    type Err = DriverError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_uri(s)
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

impl Default for ServerAddress {
    fn default() -> Self {
        Self::new("localhost", DEFAULT_PORT)
    }
}

// ============================================================================
// DriverConfig - 드라이버 설정
// ============================================================================

/// 드라이버 설정
#[derive(Clone)]
pub struct DriverConfig {
    /// 서버 주소
    pub address: ServerAddress,
    /// 인증 토큰
    pub auth: AuthToken,
    /// User Agent
    pub user_agent: String,
    /// 연결 타임아웃
    pub connection_timeout: Duration,
    /// 소켓 읽기/쓰기 타임아웃 (`None`이면 무제한)
    pub socket_timeout: Option<Duration>,
    /// 최대 청크 크기
    pub max_chunk_size: usize,
    /// 최대 메시지 크기
    pub max_message_size: usize,
    /// 핸드셰이크 버전 제안 (선호 순)
    pub protocol_versions: [u32; 4],
    /// 클러스터 탐색 여부
    pub cluster_discovery: bool,
    /// 쓰기 서버 선택 전략
    pub server_selector: Arc<dyn ServerSelector>,
    /// 연결 이벤트 리스너
    pub listeners: Vec<Arc<dyn ConnectionListener>>,
}

impl DriverConfig {
    /// 새 설정 생성
    pub fn new(uri: &str, auth: AuthToken) -> DriverResult<Self> {
        Ok(Self {
            address: ServerAddress::from_uri(uri)?,
            auth,
            ..Self::default()
        })
    }

    /// 빌더 시작
    pub fn builder(uri: &str, auth: AuthToken) -> DriverResult<DriverConfigBuilder> {
        let config = Self::new(uri, auth)?;
        Ok(DriverConfigBuilder { config })
    }

    /// 설정된 한도로 청크 프레이머 생성
    pub fn framer(&self) -> DriverResult<ChunkFramer> {
        ChunkFramer::with_limits(self.max_chunk_size, self.max_message_size)
            .map_err(|e| DriverError::configuration(e.to_string()))
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            address: ServerAddress::default(),
            auth: AuthToken::default(),
            user_agent: user_agent(),
            connection_timeout: Duration::from_secs(30),
            socket_timeout: None,
            max_chunk_size: MAX_CHUNK_SIZE,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            protocol_versions: DEFAULT_PROPOSALS,
            cluster_discovery: true,
            server_selector: Arc::new(RandomSelector),
            listeners: Vec::new(),
        }
    }
}

impl fmt::Debug for DriverConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverConfig")
            .field("address", &self.address)
            .field("auth", &self.auth)
            .field("user_agent", &self.user_agent)
            .field("connection_timeout", &self.connection_timeout)
            .field("socket_timeout", &self.socket_timeout)
            .field("max_chunk_size", &self.max_chunk_size)
            .field("max_message_size", &self.max_message_size)
            .field("protocol_versions", &self.protocol_versions)
            .field("cluster_discovery", &self.cluster_discovery)
            .field("server_selector", &self.server_selector)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

// ============================================================================
// DriverConfigBuilder - 설정 빌더
// ============================================================================

/// 드라이버 설정 빌더
pub struct DriverConfigBuilder {
    config: DriverConfig,
}

impl DriverConfigBuilder {
    /// User Agent 설정
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// 연결 타임아웃 설정
    pub fn with_connection_timeout(mut self, timeout: Duration) -> Self {
        self.config.connection_timeout = timeout;
        self
    }

    /// 소켓 타임아웃 설정
    pub fn with_socket_timeout(mut self, timeout: Duration) -> Self {
        self.config.socket_timeout = Some(timeout);
        self
    }

    /// 최대 청크 크기 설정
    pub fn with_max_chunk_size(mut self, size: usize) -> Self {
        self.config.max_chunk_size = size;
        self
    }

    /// 최대 메시지 크기 설정
    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.config.max_message_size = size;
        self
    }

    /// 핸드셰이크 버전 제안 설정
    pub fn with_protocol_versions(mut self, versions: [u32; 4]) -> Self {
        self.config.protocol_versions = versions;
        self
    }

    /// 클러스터 탐색 설정
    pub fn with_cluster_discovery(mut self, enabled: bool) -> Self {
        self.config.cluster_discovery = enabled;
        self
    }

    /// 쓰기 서버 선택 전략 설정
    pub fn with_server_selector(mut self, selector: impl ServerSelector + 'static) -> Self {
        self.config.server_selector = Arc::new(selector);
        self
    }

    /// 연결 이벤트 리스너 추가
    pub fn with_listener(mut self, listener: impl ConnectionListener + 'static) -> Self {
        self.config.listeners.push(Arc::new(listener));
        self
    }

    /// 빌드
    pub fn build(self) -> DriverConfig {
        self.config
    }
}

// ============================================================================
// Endpoint - 서버 하나에 대한 연결
// ============================================================================

struct Endpoint {
    address: ServerAddress,
    registry: SessionRegistry,
    version: Option<BoltVersion>,
}

impl Endpoint {
    fn new(address: ServerAddress, transport: Box<dyn Transport>, framer: ChunkFramer) -> Self {
        let mut registry = SessionRegistry::new(transport, framer);
        registry.register_session(Box::new(V1SessionProvider));
        Self {
            address,
            registry,
            version: None,
        }
    }

    fn close(&mut self, events: &EventHub) -> DriverResult<()> {
        let result = self.registry.close();
        events.publish(ConnectionEvent::Closed {
            address: self.address.clone(),
        });
        result
    }
}

// ============================================================================
// Driver - 드라이버
// ============================================================================

/// 그래프 데이터베이스 드라이버
///
/// 기본 연결 하나와, 클러스터로 확인되면 리더 연결 하나를 가집니다.
/// 생성 시에는 I/O를 하지 않으며 핸드셰이크와 INIT은 첫 사용 때
/// 수행됩니다.
pub struct Driver {
    /// 설정
    config: DriverConfig,
    /// 청크 프레이머
    framer: ChunkFramer,
    /// 전송 계층 팩토리
    factory: Box<dyn TransportFactory>,
    /// 이벤트 리스너
    events: EventHub,
    /// 기본 연결
    default: Endpoint,
    /// 리더 연결
    leader: Option<Endpoint>,
    /// 탐색된 토폴로지 (None이면 아직 탐색 전)
    topology: Option<ClusterTopology>,
    /// 종료 여부
    closed: bool,
}

impl Driver {
    /// 새 드라이버 생성
    pub fn new(uri: &str, auth: AuthToken) -> DriverResult<Self> {
        let config = DriverConfig::new(uri, auth)?;
        Self::with_config(config)
    }

    /// 설정으로 드라이버 생성 (TCP)
    pub fn with_config(config: DriverConfig) -> DriverResult<Self> {
        let factory = TcpTransportFactory::from_config(&config);
        Self::with_transport_factory(config, factory)
    }

    /// 설정과 전송 계층 팩토리로 드라이버 생성
    pub fn with_transport_factory(
        config: DriverConfig,
        factory: impl TransportFactory + 'static,
    ) -> DriverResult<Self> {
        let framer = config.framer()?;
        let events = EventHub::with_listeners(config.listeners.clone());
        let transport = factory.create(&config.address)?;
        let default = Endpoint::new(config.address.clone(), transport, framer);

        debug!(address = %config.address, user_agent = %config.user_agent, "Driver created");

        Ok(Self {
            config,
            framer,
            factory: Box::new(factory),
            events,
            default,
            leader: None,
            topology: None,
            closed: false,
        })
    }

    /// User Agent
    pub fn user_agent(&self) -> &str {
        &self.config.user_agent
    }

    /// 드라이버 설정
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// 기본 연결의 버전 협상
    ///
    /// 협상은 연결당 한 번만 이루어지며 이후에는 합의된 버전을 돌려줍니다.
    pub fn handshake(&mut self) -> DriverResult<BoltVersion> {
        self.ensure_open()?;
        Self::negotiate(&mut self.default, &self.config, &self.events)
    }

    /// 기본(읽기) 세션
    pub fn session(&mut self) -> DriverResult<&mut Session> {
        self.ensure_open()?;
        Self::open_session(&mut self.default, &self.config, &self.events)
    }

    /// 쓰기 세션
    ///
    /// 클러스터가 아니면 [`session`](Self::session)과 같은 세션입니다.
    /// 클러스터면 리더 연결에서 핸드셰이크와 INIT을 수행한 세션입니다.
    pub fn write_session(&mut self) -> DriverResult<&mut Session> {
        if !self.is_causal_cluster()? {
            return self.session();
        }
        self.ensure_open()?;
        match self.leader.as_mut() {
            Some(leader) => Self::open_session(leader, &self.config, &self.events),
            None => Err(DriverError::routing("Cluster reported no write servers")),
        }
    }

    /// 인과적 클러스터 여부 (첫 호출에서 탐색 후 기억)
    pub fn is_causal_cluster(&mut self) -> DriverResult<bool> {
        if let Some(topology) = &self.topology {
            return Ok(topology.is_causal_cluster());
        }
        self.ensure_open()?;

        let topology = if self.config.cluster_discovery {
            let session = Self::open_session(&mut self.default, &self.config, &self.events)?;
            ClusterTopology::discover(session)?
        } else {
            debug!("Cluster discovery disabled");
            ClusterTopology::new()
        };

        // 리더 연결을 만든 뒤에만 기억: 실패하면 다음 호출에서 다시 탐색
        let clustered = topology.is_causal_cluster();
        if clustered {
            self.select_leader(&topology)?;
        }
        self.topology = Some(topology);
        Ok(clustered)
    }

    /// 탐색된 토폴로지
    pub fn topology(&self) -> Option<&ClusterTopology> {
        self.topology.as_ref()
    }

    /// 선택된 리더 주소
    pub fn leader_address(&self) -> Option<&ServerAddress> {
        self.leader.as_ref().map(|leader| &leader.address)
    }

    /// 드라이버 종료 (모든 연결 닫기)
    pub fn close(&mut self) -> DriverResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let default = self.default.close(&self.events);
        let leader = match self.leader.as_mut() {
            Some(leader) => leader.close(&self.events),
            None => Ok(()),
        };
        info!("Driver closed");
        default.and(leader)
    }

    /// 종료 여부
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn ensure_open(&self) -> DriverResult<()> {
        if self.closed {
            return Err(DriverError::session("Driver is closed"));
        }
        Ok(())
    }

    fn select_leader(&mut self, topology: &ClusterTopology) -> DriverResult<()> {
        let address = self
            .config
            .server_selector
            .select(topology.write_servers())
            .cloned();

        self.events.publish(ConnectionEvent::ClusterDiscovered {
            writers: topology.write_servers().to_vec(),
            readers: topology.read_servers().to_vec(),
            leader: address.clone(),
        });

        match address {
            Some(address) => {
                info!(leader = %address, "Selected write server");
                let transport = self.factory.create(&address)?;
                self.leader = Some(Endpoint::new(address, transport, self.framer));
            }
            None => warn!("Cluster reported no write servers"),
        }
        Ok(())
    }

    fn negotiate(
        endpoint: &mut Endpoint,
        config: &DriverConfig,
        events: &EventHub,
    ) -> DriverResult<BoltVersion> {
        if let Some(version) = endpoint.version {
            return Ok(version);
        }

        events.publish(ConnectionEvent::Connecting {
            address: endpoint.address.clone(),
        });
        let transport = endpoint
            .registry
            .transport_mut()
            .ok_or_else(|| DriverError::session("Connection is no longer available"))?;

        // 연결 실패는 TransportError로 전파
        if !transport.is_connected() {
            transport.connect()?;
        }

        let version = match Handshake::with_proposals(config.protocol_versions).negotiate(transport)
        {
            Ok(version) => version,
            Err(err) => {
                if let Err(close_err) = transport.close() {
                    warn!(error = %close_err, "Failed to close transport after handshake error");
                }
                return Err(err.into());
            }
        };

        info!(address = %endpoint.address, version = %version, "Protocol version agreed");
        endpoint.version = Some(version);
        events.publish(ConnectionEvent::Negotiated {
            address: endpoint.address.clone(),
            version,
        });
        Ok(version)
    }

    fn open_session<'a>(
        endpoint: &'a mut Endpoint,
        config: &DriverConfig,
        events: &EventHub,
    ) -> DriverResult<&'a mut Session> {
        let version = Self::negotiate(endpoint, config, events)?;
        let existing = endpoint.registry.has_session();
        let session = endpoint
            .registry
            .get_session(version, &config.auth, &config.user_agent)?;

        if !existing {
            events.publish(ConnectionEvent::SessionOpened {
                address: endpoint.address.clone(),
                server: session.server().map(str::to_string),
            });
        }
        Ok(session)
    }
}

impl fmt::Debug for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Driver")
            .field("address", &self.default.address)
            .field("leader", &self.leader_address())
            .field("topology", &self.topology)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl Drop for Driver {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!(error = %err, "Failed to close driver connections");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
