//! 라우팅 정책
//!
//! 쓰기 서버(리더) 선택 전략을 정의합니다.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use rand::Rng;

use super::super::driver::ServerAddress;

/// 서버 선택기
///
/// 클러스터 탐색 후 리더 연결을 열 주소 하나를 고릅니다. 선택은 한 번만
/// 이루어지며, 고른 주소에 연결하지 못해도 다른 주소로 재시도하지 않습니다.
pub trait ServerSelector: Send + Sync + fmt::Debug {
    /// 서버 목록에서 하나 선택 (빈 목록이면 `None`)
    fn select<'a>(&self, servers: &'a [ServerAddress]) -> Option<&'a ServerAddress>;
}

/// 균등 랜덤 선택 (기본값)
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomSelector;

impl ServerSelector for RandomSelector {
    fn select<'a>(&self, servers: &'a [ServerAddress]) -> Option<&'a ServerAddress> {
        if servers.is_empty() {
            return None;
        }
        let index = rand::thread_rng().gen_range(0..servers.len());
        servers.get(index)
    }
}

/// 라운드 로빈 선택
#[derive(Debug, Default)]
pub struct RoundRobinSelector {
    index: AtomicUsize,
}

impl RoundRobinSelector {
    /// 새 선택기 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 인덱스 리셋
    pub fn reset(&self) {
        self.index.store(0, Ordering::Relaxed);
    }
}

impl ServerSelector for RoundRobinSelector {
    fn select<'a>(&self, servers: &'a [ServerAddress]) -> Option<&'a ServerAddress> {
        if servers.is_empty() {
            return None;
        }
        let index = self.index.fetch_add(1, Ordering::Relaxed);
        servers.get(index % servers.len())
    }
}

/// 항상 첫 번째 서버 선택
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstSelector;

impl ServerSelector for FirstSelector {
    fn select<'a>(&self, servers: &'a [ServerAddress]) -> Option<&'a ServerAddress> {
        servers.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn servers() -> Vec<ServerAddress> {
        vec![
            ServerAddress::new("server1", 7687),
            ServerAddress::new("server2", 7687),
            ServerAddress::new("server3", 7687),
        ]
    }

    #[test]
    fn test_round_robin_selection() {
        let selector = RoundRobinSelector::new();
        let servers = servers();

        let hosts: Vec<&str> = (0..4)
            .map(|_| selector.select(&servers).unwrap().host.as_str())
            .collect();
        // 다시 처음으로
        assert_eq!(hosts, vec!["server1", "server2", "server3", "server1"]);
    }

    #[test]
    fn test_round_robin_reset() {
        let selector = RoundRobinSelector::new();
        let servers = servers();

        selector.select(&servers);
        selector.select(&servers);
        selector.reset();

        assert_eq!(selector.select(&servers).unwrap().host, "server1");
    }

    #[test]
    fn test_empty_servers() {
        let servers: Vec<ServerAddress> = vec![];
        assert!(RandomSelector.select(&servers).is_none());
        assert!(RoundRobinSelector::new().select(&servers).is_none());
        assert!(FirstSelector.select(&servers).is_none());
    }

    #[test]
    fn test_random_selection() {
        let servers = servers();

        // 랜덤 선택이 유효한 서버를 반환하는지 확인
        for _ in 0..20 {
            let selected = RandomSelector.select(&servers).unwrap();
            assert!(servers.contains(selected));
        }
    }

    #[test]
    fn test_single_server() {
        let servers = vec![ServerAddress::new("leader", 7687)];
        assert_eq!(RandomSelector.select(&servers), Some(&servers[0]));
        assert_eq!(FirstSelector.select(&servers), Some(&servers[0]));
    }
}
