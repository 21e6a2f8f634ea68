//! Session Management
//!
//! 연결 하나에 묶인 Bolt v1 요청/응답 상태 머신.
//!
//! 세션은 한 번에 하나의 요청만 처리합니다. [`QueryResult`]가 세션을
//! 가변 대여하므로 결과를 소비하는 동안에는 다음 `run`을 호출할 수 없고,
//! 다 읽지 않은 결과 핸들을 버리면 다음 `run`/`reset`이 먼저 남은 스트림을
//! DISCARD_ALL로 비웁니다.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, trace, warn};

use super::driver::AuthToken;
use super::error::{DriverError, DriverResult};
use super::record::Record;
use crate::bolt::codec::ChunkFramer;
use crate::bolt::handshake::BoltVersion;
use crate::bolt::message::{
    encode_message, BoltRequest, BoltResponse, InitMessage, RunMessage, SuccessMessage,
};
use crate::bolt::packstream::{PackStreamMap, PackStreamValue as Value};
use crate::bolt::transport::Transport;

// ============================================================================
// SessionState - 세션 상태
// ============================================================================

/// 세션 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// 전송 계층이 닫힘
    Disconnected,
    /// INIT 응답 대기 중
    Negotiating,
    /// 요청 가능
    Ready,
    /// RUN 응답 대기 중
    AwaitingResponse,
    /// RUN 성공, 아직 PULL_ALL/DISCARD_ALL을 보내지 않음
    ResultAvailable,
    /// PULL_ALL/DISCARD_ALL 응답 스트림 수신 중
    Streaming,
    /// 서버 FAILURE 수신, ACK_FAILURE 또는 RESET 필요
    Failed,
    /// 전송/코덱/프레이밍 오류로 연결을 더 이상 쓸 수 없음
    Defunct,
}

impl SessionState {
    /// 결과 스트림이 열려 있는지 여부
    pub fn has_pending_result(self) -> bool {
        matches!(self, Self::ResultAvailable | Self::Streaming)
    }
}

// ============================================================================
// Session - 세션
// ============================================================================

/// Bolt v1 세션
pub struct Session {
    transport: Box<dyn Transport>,
    framer: ChunkFramer,
    version: BoltVersion,
    state: SessionState,
    server: Option<String>,
}

impl Session {
    /// INIT을 보내고 세션을 연다
    ///
    /// 서버가 FAILURE로 응답하면 전송 계층을 닫고
    /// [`DriverError::Authentication`]을 반환합니다.
    pub fn open(
        transport: Box<dyn Transport>,
        version: BoltVersion,
        auth: &AuthToken,
        user_agent: &str,
        framer: ChunkFramer,
    ) -> DriverResult<Self> {
        let mut session = Self {
            transport,
            framer,
            version,
            state: SessionState::Negotiating,
            server: None,
        };

        let init = InitMessage::new(user_agent, auth.to_map());
        debug!(
            version = %version,
            user_agent,
            scheme = auth.scheme(),
            "Initializing session"
        );
        session.send(&BoltRequest::Init(init))?;

        match session.receive()? {
            BoltResponse::Success(success) => {
                session.server = success.server().map(str::to_string);
                session.state = SessionState::Ready;
                debug!(server = ?session.server, "Session initialized");
                Ok(session)
            }
            BoltResponse::Failure(failure) => {
                warn!(code = %failure.code, "Authentication failed");
                Err(session.defunct(DriverError::Authentication(failure)))
            }
            other => Err(session.defunct(DriverError::protocol(format!(
                "Unexpected {} in response to INIT",
                other.name()
            )))),
        }
    }

    /// 현재 상태
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// 협상된 프로토콜 버전
    pub fn version(&self) -> BoltVersion {
        self.version
    }

    /// INIT 응답의 서버 에이전트 문자열
    pub fn server(&self) -> Option<&str> {
        self.server.as_deref()
    }

    /// 새 요청을 보낼 수 있는 상태인지 여부
    pub fn is_ready(&self) -> bool {
        self.state == SessionState::Ready
    }

    /// 연결이 아직 살아 있는지 여부
    pub fn is_open(&self) -> bool {
        !matches!(
            self.state,
            SessionState::Disconnected | SessionState::Defunct
        )
    }

    /// 쿼리 실행
    ///
    /// 이전 결과가 남아 있으면 먼저 버리고 RUN을 보냅니다. 반환된
    /// [`QueryResult`]는 세션을 대여하므로 결과를 다 쓰거나 버릴 때까지
    /// 다른 요청을 보낼 수 없습니다.
    pub fn run(
        &mut self,
        query: &str,
        parameters: Option<PackStreamMap>,
    ) -> DriverResult<QueryResult<'_>> {
        self.discard_pending()?;
        self.ensure_ready()?;

        debug!(query, "Running query");
        let message = RunMessage::new(query).with_parameters(parameters.unwrap_or_default());
        self.send(&BoltRequest::Run(message))?;
        self.state = SessionState::AwaitingResponse;

        match self.receive()? {
            BoltResponse::Success(success) => {
                self.state = SessionState::ResultAvailable;
                let keys = success.fields().unwrap_or_default();
                Ok(QueryResult::new(self, query, keys, success))
            }
            BoltResponse::Failure(failure) => {
                debug!(code = %failure.code, "Query failed");
                self.state = SessionState::Failed;
                Err(DriverError::Failure(failure))
            }
            BoltResponse::Ignored => {
                self.state = SessionState::Failed;
                Err(DriverError::Ignored)
            }
            BoltResponse::Record(_) => Err(self.defunct(DriverError::protocol(
                "RECORD received before RUN was acknowledged",
            ))),
        }
    }

    /// ACK_FAILURE 전송 (`Failed -> Ready`)
    pub fn ack_failure(&mut self) -> DriverResult<()> {
        if self.state != SessionState::Failed {
            return Err(DriverError::session(format!(
                "No failure to acknowledge in state {:?}",
                self.state
            )));
        }

        self.send(&BoltRequest::AckFailure)?;
        match self.receive()? {
            BoltResponse::Success(_) => {
                debug!("Failure acknowledged");
                self.state = SessionState::Ready;
                Ok(())
            }
            BoltResponse::Ignored => Err(DriverError::Ignored),
            BoltResponse::Failure(failure) => Err(self.defunct(DriverError::Failure(failure))),
            BoltResponse::Record(_) => Err(self.defunct(DriverError::protocol(
                "RECORD received in response to ACK_FAILURE",
            ))),
        }
    }

    /// RESET 전송
    ///
    /// 진행 중인 스트림을 먼저 비운 뒤 RESET을 보냅니다.
    /// `Failed`와 `Ready` 모두 `Ready`로 돌아갑니다.
    pub fn reset(&mut self) -> DriverResult<()> {
        match self.state {
            SessionState::Disconnected | SessionState::Defunct => {
                return Err(self.unusable());
            }
            SessionState::Streaming => {
                // 스트림 중 FAILURE는 RESET이 정리한다
                if let Err(err) = self.finish_stream() {
                    if err.is_fatal() {
                        return Err(err);
                    }
                }
            }
            _ => {}
        }

        self.send(&BoltRequest::Reset)?;
        match self.receive()? {
            BoltResponse::Success(_) => {
                debug!("Session reset");
                self.state = SessionState::Ready;
                Ok(())
            }
            BoltResponse::Failure(failure) => Err(self.defunct(DriverError::Failure(failure))),
            other => Err(self.defunct(DriverError::protocol(format!(
                "Unexpected {} in response to RESET",
                other.name()
            )))),
        }
    }

    /// 세션 종료 (전송 계층 닫기)
    pub fn close(&mut self) -> DriverResult<()> {
        if self.state == SessionState::Disconnected {
            return Ok(());
        }
        self.state = SessionState::Disconnected;
        self.transport.close()?;
        debug!("Session closed");
        Ok(())
    }

    pub(crate) fn transport_mut(&mut self) -> &mut dyn Transport {
        self.transport.as_mut()
    }

    // ------------------------------------------------------------------------
    // 내부 I/O
    // ------------------------------------------------------------------------

    fn send(&mut self, request: &BoltRequest) -> DriverResult<()> {
        let result = self.try_send(request);
        result.map_err(|err| self.defunct(err))
    }

    fn try_send(&mut self, request: &BoltRequest) -> DriverResult<()> {
        trace!(message = request.name(), "C:");
        let payload = encode_message(&request.to_structure())?;
        self.framer.send(&payload, self.transport.as_mut())?;
        Ok(())
    }

    fn receive(&mut self) -> DriverResult<BoltResponse> {
        let result = self.try_receive();
        result.map_err(|err| self.defunct(err))
    }

    fn try_receive(&mut self) -> DriverResult<BoltResponse> {
        loop {
            let payload = self.framer.receive(self.transport.as_mut())?;
            if payload.is_empty() {
                trace!("S: NOOP");
                continue;
            }
            let response = BoltResponse::decode(&payload)?;
            trace!(message = response.name(), "S:");
            return Ok(response);
        }
    }

    /// 치명적 오류: 연결을 닫고 `Defunct`로 전환
    fn defunct(&mut self, err: DriverError) -> DriverError {
        if self.state != SessionState::Defunct {
            warn!(error = %err, "Session is defunct");
            self.state = SessionState::Defunct;
            if let Err(close_err) = self.transport.close() {
                warn!(error = %close_err, "Failed to close transport");
            }
        }
        err
    }

    fn unusable(&self) -> DriverError {
        match self.state {
            SessionState::Disconnected => DriverError::session("Session is closed"),
            _ => DriverError::session("Session is defunct"),
        }
    }

    fn ensure_ready(&self) -> DriverResult<()> {
        match self.state {
            SessionState::Ready => Ok(()),
            SessionState::Failed => Err(DriverError::session(
                "Session has an unacknowledged failure; call ack_failure() or reset()",
            )),
            SessionState::Disconnected | SessionState::Defunct => Err(self.unusable()),
            other => Err(DriverError::session(format!(
                "Session is busy in state {:?}",
                other
            ))),
        }
    }

    /// 버려진 결과 핸들의 남은 스트림 정리
    fn discard_pending(&mut self) -> DriverResult<()> {
        match self.state {
            SessionState::ResultAvailable => {
                debug!("Discarding unconsumed result");
                self.send(&BoltRequest::DiscardAll)?;
                self.state = SessionState::Streaming;
            }
            SessionState::Streaming => debug!("Draining abandoned result stream"),
            _ => return Ok(()),
        }
        self.finish_stream().map(|_| ())
    }

    /// 스트림 종료 메시지까지 읽고 레코드는 버린다
    ///
    /// SUCCESS면 메타데이터, IGNORED면 `None`을 반환합니다.
    fn finish_stream(&mut self) -> DriverResult<Option<SuccessMessage>> {
        let mut skipped = 0usize;
        loop {
            match self.receive()? {
                BoltResponse::Record(_) => skipped += 1,
                BoltResponse::Success(success) => {
                    trace!(skipped, "Stream finished");
                    self.state = SessionState::Ready;
                    return Ok(Some(success));
                }
                BoltResponse::Failure(failure) => {
                    self.state = SessionState::Failed;
                    return Err(DriverError::Failure(failure));
                }
                BoltResponse::Ignored => {
                    self.state = SessionState::Failed;
                    return Ok(None);
                }
            }
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("version", &self.version)
            .field("state", &self.state)
            .field("server", &self.server)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// QueryResult - 쿼리 결과
// ============================================================================

/// 세션을 대여한 결과 스트림
///
/// 첫 [`next_record`](Self::next_record) 호출 때 PULL_ALL을 보냅니다.
/// 레코드를 읽지 않고 요약만 필요하면 [`consume`](Self::consume)이
/// DISCARD_ALL을 사용합니다.
#[derive(Debug)]
pub struct QueryResult<'a> {
    session: &'a mut Session,
    query: String,
    keys: Arc<[String]>,
    run_metadata: SuccessMessage,
    summary: Option<ResultSummary>,
    done: bool,
}

impl<'a> QueryResult<'a> {
    fn new(
        session: &'a mut Session,
        query: &str,
        keys: Vec<String>,
        run_metadata: SuccessMessage,
    ) -> Self {
        Self {
            session,
            query: query.to_string(),
            keys: keys.into(),
            run_metadata,
            summary: None,
            done: false,
        }
    }

    /// 컬럼 키 (RUN 응답의 `fields`)
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// 결과 요약 (스트림이 끝난 뒤에만 존재)
    pub fn summary(&self) -> Option<&ResultSummary> {
        self.summary.as_ref()
    }

    /// 다음 레코드
    ///
    /// 스트림이 끝나면 `Ok(None)`을 반환합니다.
    pub fn next_record(&mut self) -> DriverResult<Option<Record>> {
        if self.done {
            return Ok(None);
        }
        let result = self.pull_next();
        if result.is_err() {
            self.done = true;
        }
        result
    }

    /// 남은 레코드를 모두 읽는다
    pub fn list(mut self) -> DriverResult<Vec<Record>> {
        let mut records = Vec::new();
        while let Some(record) = self.next_record()? {
            records.push(record);
        }
        Ok(records)
    }

    /// 남은 레코드를 버리고 요약을 반환
    pub fn consume(mut self) -> DriverResult<ResultSummary> {
        if !self.done {
            self.done = true;
            if self.session.state == SessionState::ResultAvailable {
                self.session.send(&BoltRequest::DiscardAll)?;
                self.session.state = SessionState::Streaming;
            }
            if self.session.state == SessionState::Streaming {
                if let Some(end) = self.session.finish_stream()? {
                    self.finish(&end);
                }
            }
        }
        self.summary.take().ok_or(DriverError::Ignored)
    }

    fn pull_next(&mut self) -> DriverResult<Option<Record>> {
        match self.session.state {
            SessionState::ResultAvailable => {
                self.session.send(&BoltRequest::PullAll)?;
                self.session.state = SessionState::Streaming;
            }
            SessionState::Streaming => {}
            _ => {
                self.done = true;
                return Ok(None);
            }
        }

        match self.session.receive()? {
            BoltResponse::Record(record) => {
                if record.len() != self.keys.len() {
                    let err = DriverError::protocol(format!(
                        "RECORD has {} fields but the result declares {} keys",
                        record.len(),
                        self.keys.len()
                    ));
                    return Err(self.session.defunct(err));
                }
                Ok(Some(Record::with_shared_keys(
                    self.keys.clone(),
                    record.fields,
                )))
            }
            BoltResponse::Success(end) => {
                self.session.state = SessionState::Ready;
                self.done = true;
                self.finish(&end);
                Ok(None)
            }
            BoltResponse::Failure(failure) => {
                self.session.state = SessionState::Failed;
                Err(DriverError::Failure(failure))
            }
            BoltResponse::Ignored => {
                self.session.state = SessionState::Failed;
                self.done = true;
                Ok(None)
            }
        }
    }

    fn finish(&mut self, end: &SuccessMessage) {
        let summary = ResultSummary::from_metadata(
            &self.query,
            &self.run_metadata,
            end,
            self.session.server.clone(),
        );
        trace!(query_type = ?summary.query_type, "Result summary");
        self.summary = Some(summary);
    }
}

impl Iterator for QueryResult<'_> {
    type Item = DriverResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}

// ============================================================================
// ResultSummary - 결과 요약
// ============================================================================

/// 결과 요약
#[derive(Debug, Clone, Serialize)]
pub struct ResultSummary {
    /// 쿼리
    pub query: String,
    /// 쿼리 타입
    pub query_type: QueryType,
    /// 카운터
    pub counters: Counters,
    /// 결과 대기 시간
    pub result_available_after: Option<Duration>,
    /// 결과 소비 시간
    pub result_consumed_after: Option<Duration>,
    /// 서버 정보
    pub server: Option<String>,
    /// 알림
    pub notifications: Vec<Notification>,
    /// 스트림 종료 SUCCESS의 원본 메타데이터
    pub metadata: PackStreamMap,
}

impl ResultSummary {
    /// RUN 응답과 스트림 종료 응답의 메타데이터로 생성
    pub fn from_metadata(
        query: &str,
        run: &SuccessMessage,
        end: &SuccessMessage,
        server: Option<String>,
    ) -> Self {
        let millis = |value: Option<i64>| {
            value
                .and_then(|ms| u64::try_from(ms).ok())
                .map(Duration::from_millis)
        };

        Self {
            query: query.to_string(),
            query_type: end
                .query_type()
                .and_then(QueryType::from_code)
                .unwrap_or_default(),
            counters: end.stats().map(Counters::from_stats).unwrap_or_default(),
            result_available_after: millis(run.result_available_after()),
            result_consumed_after: millis(end.result_consumed_after()),
            server,
            notifications: end
                .notifications()
                .unwrap_or_default()
                .iter()
                .filter_map(Notification::from_value)
                .collect(),
            metadata: end.metadata.clone(),
        }
    }
}

/// 쿼리 타입
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum QueryType {
    /// 읽기 전용
    #[default]
    ReadOnly,
    /// 읽기/쓰기
    ReadWrite,
    /// 쓰기 전용
    WriteOnly,
    /// 스키마 변경
    SchemaWrite,
}

impl QueryType {
    /// 서버의 `type` 코드 해석 (`r`, `rw`, `w`, `s`)
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "r" => Some(Self::ReadOnly),
            "rw" => Some(Self::ReadWrite),
            "w" => Some(Self::WriteOnly),
            "s" => Some(Self::SchemaWrite),
            _ => None,
        }
    }

    /// 서버 코드
    pub fn code(self) -> &'static str {
        match self {
            Self::ReadOnly => "r",
            Self::ReadWrite => "rw",
            Self::WriteOnly => "w",
            Self::SchemaWrite => "s",
        }
    }
}

/// 카운터
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Counters {
    /// 생성된 노드 수
    pub nodes_created: i64,
    /// 삭제된 노드 수
    pub nodes_deleted: i64,
    /// 생성된 관계 수
    pub relationships_created: i64,
    /// 삭제된 관계 수
    pub relationships_deleted: i64,
    /// 설정된 속성 수
    pub properties_set: i64,
    /// 추가된 레이블 수
    pub labels_added: i64,
    /// 제거된 레이블 수
    pub labels_removed: i64,
    /// 생성된 인덱스 수
    pub indexes_added: i64,
    /// 제거된 인덱스 수
    pub indexes_removed: i64,
    /// 추가된 제약조건 수
    pub constraints_added: i64,
    /// 제거된 제약조건 수
    pub constraints_removed: i64,
}

impl Counters {
    /// `stats` 맵에서 생성 (키는 `nodes-created` 형식)
    pub fn from_stats(stats: &PackStreamMap) -> Self {
        let count = |key: &str| stats.get(key).and_then(Value::as_int).unwrap_or(0);
        Self {
            nodes_created: count("nodes-created"),
            nodes_deleted: count("nodes-deleted"),
            relationships_created: count("relationships-created"),
            relationships_deleted: count("relationships-deleted"),
            properties_set: count("properties-set"),
            labels_added: count("labels-added"),
            labels_removed: count("labels-removed"),
            indexes_added: count("indexes-added"),
            indexes_removed: count("indexes-removed"),
            constraints_added: count("constraints-added"),
            constraints_removed: count("constraints-removed"),
        }
    }

    /// 변경 사항 존재 여부
    pub fn contains_updates(&self) -> bool {
        self.nodes_created > 0
            || self.nodes_deleted > 0
            || self.relationships_created > 0
            || self.relationships_deleted > 0
            || self.properties_set > 0
            || self.labels_added > 0
            || self.labels_removed > 0
    }

    /// 스키마 변경 존재 여부
    pub fn contains_system_updates(&self) -> bool {
        self.indexes_added > 0
            || self.indexes_removed > 0
            || self.constraints_added > 0
            || self.constraints_removed > 0
    }
}

/// 알림
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    /// 코드
    pub code: String,
    /// 제목
    pub title: String,
    /// 설명
    pub description: String,
    /// 심각도
    pub severity: String,
    /// 위치
    pub position: Option<InputPosition>,
}

impl Notification {
    /// `notifications` 목록의 항목 하나를 해석
    pub fn from_value(value: &Value) -> Option<Self> {
        let map = value.as_map()?;
        let text = |key: &str| {
            map.get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        let position = map.get("position").and_then(Value::as_map).map(|pos| {
            let field = |key: &str| pos.get(key).and_then(Value::as_int).unwrap_or(0);
            InputPosition {
                offset: field("offset"),
                line: field("line"),
                column: field("column"),
            }
        });

        Some(Self {
            code: text("code"),
            title: text("title"),
            description: text("description"),
            severity: text("severity"),
            position,
        })
    }
}

/// 입력 위치
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InputPosition {
    /// 오프셋
    pub offset: i64,
    /// 라인
    pub line: i64,
    /// 컬럼
    pub column: i64,
}

// ============================================================================
// Tests
// ============================================================================
