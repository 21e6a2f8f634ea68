//! 클러스터 토폴로지
//!
//! 클러스터 라우팅 프로시저로 서버 역할별 목록을 조회합니다.

use std::time::Duration;

use tracing::{debug, info, warn};

use super::super::driver::ServerAddress;
use super::super::error::{DriverError, DriverResult};
use super::super::record::Record;
use super::super::session::Session;
use crate::bolt::packstream::PackStreamValue as Value;

/// 라우팅 프로시저 존재 여부 확인 쿼리
pub const PROCEDURE_LOOKUP_QUERY: &str =
    "CALL dbms.procedures() YIELD name WHERE name=\"dbms.cluster.routing.getServers\" RETURN name";

/// 라우팅 정보 조회 쿼리
pub const ROUTING_QUERY: &str = "CALL dbms.cluster.routing.getServers()";

/// 서버 역할
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerRole {
    /// 라우팅 테이블 제공자
    Route,
    /// 쓰기 트랜잭션 처리 (리더)
    Write,
    /// 읽기 트랜잭션 처리 (팔로워)
    Read,
}

impl ServerRole {
    /// 문자열에서 역할 파싱
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "ROUTE" => Some(Self::Route),
            "WRITE" => Some(Self::Write),
            "READ" => Some(Self::Read),
            _ => None,
        }
    }

    /// 역할을 문자열로 변환
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Route => "ROUTE",
            Self::Write => "WRITE",
            Self::Read => "READ",
        }
    }
}

/// 클러스터 토폴로지
///
/// 비어 있으면 단일 서버(비클러스터) 모드입니다.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterTopology {
    write_servers: Vec<ServerAddress>,
    read_servers: Vec<ServerAddress>,
    route_servers: Vec<ServerAddress>,
    ttl: Option<Duration>,
}

impl ClusterTopology {
    /// 빈 토폴로지
    pub fn new() -> Self {
        Self::default()
    }

    /// 쓰기 서버 목록
    pub fn write_servers(&self) -> &[ServerAddress] {
        &self.write_servers
    }

    /// 읽기 서버 목록
    pub fn read_servers(&self) -> &[ServerAddress] {
        &self.read_servers
    }

    /// 라우터 목록
    pub fn route_servers(&self) -> &[ServerAddress] {
        &self.route_servers
    }

    /// 서버가 알려준 TTL
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// 인과적 클러스터 여부
    pub fn is_causal_cluster(&self) -> bool {
        !self.write_servers.is_empty() || !self.read_servers.is_empty()
    }

    /// 역할별 서버 추가 (중복 무시)
    pub fn add_server(&mut self, role: ServerRole, address: ServerAddress) {
        let servers = match role {
            ServerRole::Route => &mut self.route_servers,
            ServerRole::Write => &mut self.write_servers,
            ServerRole::Read => &mut self.read_servers,
        };
        if !servers.contains(&address) {
            servers.push(address);
        }
    }

    /// `getServers` 결과 레코드 해석
    ///
    /// `servers`는 `{role, addresses}` 맵의 목록입니다. 알 수 없는 역할과
    /// 해석할 수 없는 주소는 건너뜁니다.
    pub fn from_record(record: &Record) -> Self {
        let mut topology = Self::new();

        topology.ttl = record
            .get_optional::<i64>("ttl")
            .ok()
            .flatten()
            .and_then(|secs| u64::try_from(secs).ok())
            .map(Duration::from_secs);

        let servers = record.get_list("servers").unwrap_or_default();
        for entry in servers.iter().filter_map(Value::as_map) {
            let Some(role) = entry
                .get("role")
                .and_then(Value::as_str)
                .and_then(ServerRole::parse)
            else {
                continue;
            };

            let addresses = entry.get("addresses").and_then(Value::as_list).unwrap_or_default();
            for address in addresses.iter().filter_map(Value::as_str) {
                match ServerAddress::from_uri(address) {
                    Ok(parsed) => topology.add_server(role, parsed),
                    Err(err) => warn!(address, error = %err, "Skipping unparsable server address"),
                }
            }
        }

        topology
    }

    /// 세션으로 클러스터 토폴로지 탐색
    ///
    /// 라우팅 프로시저가 없으면 빈 토폴로지를 반환합니다. 프로시저는 있지만
    /// 조회가 FAILURE/IGNORED로 끝나면 세션을 RESET하고 역시 빈 토폴로지로
    /// 대체합니다. 전송 계층 오류는 그대로 전파됩니다.
    pub fn discover(session: &mut Session) -> DriverResult<Self> {
        let procedures = match fetch(session, PROCEDURE_LOOKUP_QUERY) {
            Ok(records) => records,
            Err(err) => return fallback(session, err),
        };
        if procedures.is_empty() {
            debug!("Routing procedure not available, assuming a single server");
            return Ok(Self::new());
        }

        let records = match fetch(session, ROUTING_QUERY) {
            Ok(records) => records,
            Err(err) => return fallback(session, err),
        };

        let topology = match records.first() {
            Some(record) if record.has_value("servers") => Self::from_record(record),
            _ => Self::new(),
        };

        info!(
            writers = topology.write_servers.len(),
            readers = topology.read_servers.len(),
            routers = topology.route_servers.len(),
            causal_cluster = topology.is_causal_cluster(),
            "Cluster discovery finished"
        );
        Ok(topology)
    }
}

fn fetch(session: &mut Session, query: &str) -> DriverResult<Vec<Record>> {
    session.run(query, None)?.list()
}

fn fallback(session: &mut Session, err: DriverError) -> DriverResult<ClusterTopology> {
    match err {
        DriverError::Failure(_) | DriverError::Ignored => {
            warn!(error = %err, "Cluster discovery failed, assuming a single server");
            session.reset()?;
            Ok(ClusterTopology::new())
        }
        other => Err(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bolt::codec::ChunkFramer;
    use crate::bolt::handshake::BoltVersion;
    use crate::bolt::message::{
        BoltRequest, BoltResponse, FailureMessage, RecordMessage, SuccessMessage,
    };
    use crate::bolt::packstream::PackStreamMap;
    use crate::bolt::transport::MemoryTransport;
    use crate::driver::driver::AuthToken;

    fn server_entry(role: &str, addresses: &[&str]) -> Value {
        let mut map = PackStreamMap::new();
        map.insert("role", role);
        map.insert(
            "addresses",
            addresses.iter().map(|a| Value::from(*a)).collect::<Vec<_>>(),
        );
        Value::Map(map)
    }

    fn open_session(server: &MemoryTransport) -> Session {
        server
            .feed_response(&BoltResponse::Success(SuccessMessage::init_success("core")))
            .unwrap();
        let session = Session::open(
            Box::new(server.clone()),
            BoltVersion::V1,
            &AuthToken::none(),
            "agent",
            ChunkFramer::new(),
        )
        .unwrap();
        server.clear_written();
        session
    }

    fn procedure_found() -> Vec<BoltResponse> {
        vec![
            BoltResponse::Success(SuccessMessage::run_success(["name"])),
            BoltResponse::Record(RecordMessage::new(vec![
                "dbms.cluster.routing.getServers".into(),
            ])),
            BoltResponse::Success(SuccessMessage::empty()),
        ]
    }

    #[test]
    fn test_server_role_parse() {
        assert_eq!(ServerRole::parse("ROUTE"), Some(ServerRole::Route));
        assert_eq!(ServerRole::parse("write"), Some(ServerRole::Write));
        assert_eq!(ServerRole::parse("READ"), Some(ServerRole::Read));
        assert_eq!(ServerRole::parse("UNKNOWN"), None);
        assert_eq!(ServerRole::Write.as_str(), "WRITE");
    }

    #[test]
    fn test_add_server_no_duplicates() {
        let mut topology = ClusterTopology::new();
        assert!(!topology.is_causal_cluster());

        let addr = ServerAddress::new("server1", 7687);
        topology.add_server(ServerRole::Read, addr.clone());
        topology.add_server(ServerRole::Read, addr);

        assert_eq!(topology.read_servers().len(), 1);
        assert!(topology.is_causal_cluster());
    }

    #[test]
    fn test_from_record() {
        let record = Record::new(
            vec!["ttl".into(), "servers".into()],
            vec![
                Value::Integer(300),
                Value::List(vec![
                    server_entry("WRITE", &["a:7687"]),
                    server_entry("READ", &["b:7687", "c:7688"]),
                    server_entry("ROUTE", &["a:7687", "b:7687", "c:7688"]),
                    server_entry("ARBITER", &["d:7687"]),
                ]),
            ],
        );

        let topology = ClusterTopology::from_record(&record);
        assert_eq!(topology.write_servers(), &[ServerAddress::new("a", 7687)]);
        assert_eq!(
            topology.read_servers(),
            &[ServerAddress::new("b", 7687), ServerAddress::new("c", 7688)]
        );
        assert_eq!(topology.route_servers().len(), 3);
        assert_eq!(topology.ttl(), Some(Duration::from_secs(300)));
    }

    #[test]
    fn test_from_record_skips_bad_addresses() {
        let record = Record::new(
            vec!["servers".into()],
            vec![Value::List(vec![server_entry("READ", &["b:notaport", "c:7687"])])],
        );

        let topology = ClusterTopology::from_record(&record);
        assert_eq!(topology.read_servers(), &[ServerAddress::new("c", 7687)]);
        assert_eq!(topology.ttl(), None);
    }

    #[test]
    fn test_discover_cluster() {
        let server = MemoryTransport::connected();
        let mut session = open_session(&server);

        let mut responses = procedure_found();
        responses.extend([
            BoltResponse::Success(SuccessMessage::run_success(["ttl", "servers"])),
            BoltResponse::Record(RecordMessage::new(vec![
                Value::Integer(300),
                Value::List(vec![
                    server_entry("WRITE", &["a:7687"]),
                    server_entry("READ", &["b:7687", "c:7687"]),
                ]),
            ])),
            BoltResponse::Success(SuccessMessage::empty()),
        ]);
        server.feed_responses(&responses).unwrap();

        let topology = ClusterTopology::discover(&mut session).unwrap();
        assert!(topology.is_causal_cluster());
        assert_eq!(topology.write_servers(), &[ServerAddress::new("a", 7687)]);
        assert_eq!(topology.read_servers().len(), 2);

        let queries: Vec<String> = server
            .written_requests()
            .unwrap()
            .into_iter()
            .filter_map(|r| match r {
                BoltRequest::Run(run) => Some(run.query),
                _ => None,
            })
            .collect();
        assert_eq!(queries, vec![PROCEDURE_LOOKUP_QUERY, ROUTING_QUERY]);
    }

    #[test]
    fn test_discover_without_procedure() {
        let server = MemoryTransport::connected();
        let mut session = open_session(&server);
        server
            .feed_responses(&[
                BoltResponse::Success(SuccessMessage::run_success(["name"])),
                BoltResponse::Success(SuccessMessage::empty()),
            ])
            .unwrap();

        let topology = ClusterTopology::discover(&mut session).unwrap();
        assert!(!topology.is_causal_cluster());
        assert!(session.is_ready());
        // routing procedure never called
        assert_eq!(server.written_requests().unwrap().len(), 2);
    }

    #[test]
    fn test_discover_empty_routing_result() {
        let server = MemoryTransport::connected();
        let mut session = open_session(&server);

        let mut responses = procedure_found();
        responses.extend([
            BoltResponse::Success(SuccessMessage::run_success(["ttl", "servers"])),
            BoltResponse::Success(SuccessMessage::empty()),
        ]);
        server.feed_responses(&responses).unwrap();

        let topology = ClusterTopology::discover(&mut session).unwrap();
        assert_eq!(topology, ClusterTopology::new());
    }

    #[test]
    fn test_discover_routing_failure_falls_back() {
        let server = MemoryTransport::connected();
        let mut session = open_session(&server);

        let mut responses = procedure_found();
        responses.extend([
            BoltResponse::Failure(FailureMessage::new(
                "Neo.ClientError.Procedure.ProcedureCallFailed",
                "not a cluster member",
            )),
            // RESET
            BoltResponse::Success(SuccessMessage::empty()),
        ]);
        server.feed_responses(&responses).unwrap();

        let topology = ClusterTopology::discover(&mut session).unwrap();
        assert!(!topology.is_causal_cluster());
        assert!(session.is_ready());

        let last = server.written_requests().unwrap().pop();
        assert_eq!(last, Some(BoltRequest::Reset));
    }

    #[test]
    fn test_discover_transport_error_propagates() {
        let server = MemoryTransport::connected();
        let mut session = open_session(&server);
        // no response to the lookup query
        let err = ClusterTopology::discover(&mut session).unwrap_err();
        assert!(err.is_fatal());
    }
}
