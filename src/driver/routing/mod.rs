//! 라우팅 모듈
//!
//! 인과적 클러스터 탐색과 쓰기 서버 선택.
//!
//! # 개요
//!
//! 드라이버는 기본 연결의 세션으로 `dbms.cluster.routing.getServers`
//! 프로시저를 조회해 클러스터 여부를 판단합니다. 클러스터면 쓰기 서버 중
//! 하나를 [`ServerSelector`]로 골라 리더 연결을 만들고, 쓰기 세션은 그
//! 연결로 라우팅됩니다. 읽기 세션은 계속 기본 연결을 사용합니다.
//!
//! # 예시
//!
//! ```no_run
//! use bolt_driver::driver::routing::RoundRobinSelector;
//! use bolt_driver::{AuthToken, Driver, DriverConfig};
//!
//! # fn main() -> Result<(), bolt_driver::DriverError> {
//! let config = DriverConfig::builder("bolt://core1:7687", AuthToken::basic("neo4j", "password"))?
//!     .with_server_selector(RoundRobinSelector::new())
//!     .build();
//! let mut driver = Driver::with_config(config)?;
//!
//! if driver.is_causal_cluster()? {
//!     // 리더로 라우팅
//!     driver.write_session()?.run("CREATE (:Person {name: 'Alice'})", None)?.consume()?;
//! }
//! # Ok(())
//! # }
//! ```

mod policy;
mod table;

pub use policy::{FirstSelector, RandomSelector, RoundRobinSelector, ServerSelector};
pub use table::{ClusterTopology, ServerRole, PROCEDURE_LOOKUP_QUERY, ROUTING_QUERY};
