//! Driver Module
//!
//! 클라이언트 SDK (동기 Bolt v1 드라이버)
//!
//! # 구성
//!
//! - [`Driver`], [`DriverConfig`], [`AuthToken`] - 드라이버와 설정
//! - [`Session`], [`QueryResult`], [`ResultSummary`] - 세션 상태 머신
//! - [`SessionRegistry`] - 버전별 세션 구현 선택
//! - [`routing`] - 클러스터 탐색과 리더 선택
//! - [`bolt`] - TCP 전송 계층
//!
//! # Example
//!
//! ```no_run
//! use bolt_driver::driver::{AuthToken, Driver};
//! use bolt_driver::params;
//!
//! # fn main() -> Result<(), bolt_driver::driver::DriverError> {
//! let mut driver = Driver::new("bolt://localhost:7687", AuthToken::basic("neo4j", "password"))?;
//!
//! // 쿼리 실행
//! let session = driver.session()?;
//! let result = session.run(
//!     "MATCH (n:Person) WHERE n.age > $age RETURN n.name AS name",
//!     Some(params! {"age" => 30}),
//! )?;
//! for record in result {
//!     println!("{}", record?.get_string("name")?);
//! }
//!
//! // 쓰기는 리더로 (클러스터가 아니면 같은 세션)
//! driver
//!     .write_session()?
//!     .run("CREATE (n:Person {name: $name})", Some(params! {"name" => "Alice"}))?
//!     .consume()?;
//!
//! driver.close()?;
//! # Ok(())
//! # }
//! ```

pub mod bolt;
pub mod events;
pub mod routing;
#[allow(clippy::module_inception)]
mod driver;
mod error;
mod record;
mod registry;
mod session;

// Re-exports
pub use driver::{AuthToken, Driver, DriverConfig, DriverConfigBuilder, ServerAddress};
pub use error::{DriverError, DriverResult};
pub use events::{ConnectionEvent, ConnectionListener, EventHub};
pub use record::Record;
pub use registry::{SessionProvider, SessionRegistry, V1SessionProvider};
pub use session::{
    Counters, InputPosition, Notification, QueryResult, QueryType, ResultSummary, Session,
    SessionState,
};

pub use crate::bolt::packstream::{PackStreamMap, PackStreamValue as Value};

/// 파라미터 맵 생성 매크로
#[macro_export]
macro_rules! params {
    () => {
        $crate::driver::PackStreamMap::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::driver::PackStreamMap::new();
        $(
            map.insert($key, $crate::driver::Value::from($value));
        )+
        map
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_macro() {
        let empty: PackStreamMap = crate::params!();
        assert!(empty.is_empty());

        let map = crate::params! {
            "name" => "Alice",
            "age" => 30i64,
            "tags" => vec![Value::from("a")],
        };
        let keys: Vec<&str> = map.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["name", "age", "tags"]);
        assert_eq!(map.get("age"), Some(&Value::Integer(30)));
    }
}
