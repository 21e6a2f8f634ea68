//! Connection Events
//!
//! 연결 생명주기 이벤트와 리스너.
//!
//! 프로토콜 로직은 리스너가 있든 없든 똑같이 동작하며, 이벤트는
//! 드라이버가 동기적으로 전달합니다.

use std::fmt;
use std::sync::Arc;

use crate::bolt::handshake::BoltVersion;

use super::driver::ServerAddress;

// ============================================================================
// ConnectionEvent - 연결 이벤트
// ============================================================================

/// 연결 이벤트
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// 핸드셰이크 시작
    Connecting {
        /// 대상 서버
        address: ServerAddress,
    },
    /// 버전 협상 완료
    Negotiated {
        /// 대상 서버
        address: ServerAddress,
        /// 협상된 버전
        version: BoltVersion,
    },
    /// INIT 성공
    SessionOpened {
        /// 대상 서버
        address: ServerAddress,
        /// 서버 에이전트
        server: Option<String>,
    },
    /// 클러스터 탐색 완료
    ClusterDiscovered {
        /// 쓰기 서버 목록
        writers: Vec<ServerAddress>,
        /// 읽기 서버 목록
        readers: Vec<ServerAddress>,
        /// 선택된 리더
        leader: Option<ServerAddress>,
    },
    /// 연결 종료
    Closed {
        /// 대상 서버
        address: ServerAddress,
    },
}

impl ConnectionEvent {
    /// 이벤트 이름
    pub fn name(&self) -> &'static str {
        match self {
            Self::Connecting { .. } => "connecting",
            Self::Negotiated { .. } => "negotiated",
            Self::SessionOpened { .. } => "session_opened",
            Self::ClusterDiscovered { .. } => "cluster_discovered",
            Self::Closed { .. } => "closed",
        }
    }
}

// ============================================================================
// ConnectionListener - 리스너
// ============================================================================

/// 연결 이벤트 리스너
pub trait ConnectionListener: Send + Sync {
    /// 이벤트 수신
    fn on_event(&self, event: &ConnectionEvent);
}

impl<F> ConnectionListener for F
where
    F: Fn(&ConnectionEvent) + Send + Sync,
{
    fn on_event(&self, event: &ConnectionEvent) {
        self(event)
    }
}

/// 리스너 모음
#[derive(Clone, Default)]
pub struct EventHub {
    listeners: Vec<Arc<dyn ConnectionListener>>,
}

impl EventHub {
    /// 빈 허브
    pub fn new() -> Self {
        Self::default()
    }

    /// 리스너 목록으로 생성
    pub fn with_listeners(listeners: Vec<Arc<dyn ConnectionListener>>) -> Self {
        Self { listeners }
    }

    /// 리스너 추가
    pub fn subscribe(&mut self, listener: Arc<dyn ConnectionListener>) {
        self.listeners.push(listener);
    }

    /// 리스너 수
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// 리스너가 없는지 여부
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// 모든 리스너에 이벤트 전달
    pub fn publish(&self, event: ConnectionEvent) {
        for listener in &self.listeners {
            listener.on_event(&event);
        }
    }
}

impl fmt::Debug for EventHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHub")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_publish_to_closure_listener() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();

        let mut hub = EventHub::new();
        assert!(hub.is_empty());
        hub.subscribe(Arc::new(move |event: &ConnectionEvent| {
            sink.lock().push(event.name());
        }));

        let address = ServerAddress::new("localhost", 7687);
        hub.publish(ConnectionEvent::Connecting {
            address: address.clone(),
        });
        hub.publish(ConnectionEvent::Negotiated {
            address,
            version: BoltVersion::V1,
        });

        assert_eq!(hub.len(), 1);
        assert_eq!(*seen.lock(), vec!["connecting", "negotiated"]);
    }

    #[test]
    fn test_publish_without_listeners() {
        let hub = EventHub::new();
        hub.publish(ConnectionEvent::Closed {
            address: ServerAddress::default(),
        });
    }
}
