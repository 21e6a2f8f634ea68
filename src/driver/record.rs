//! Record - 쿼리 결과 레코드
//!
//! 같은 결과의 레코드들은 RUN 응답의 `fields` 목록 하나를 공유합니다.

use std::fmt;
use std::sync::Arc;

use serde::ser::{Serialize, SerializeMap, Serializer};

use super::error::{DriverError, DriverResult};
use crate::bolt::packstream::{PackStreamMap, PackStreamValue as Value};

// ============================================================================
// Record - 단일 레코드
// ============================================================================

/// 쿼리 결과 레코드
///
/// 값의 순서는 키 순서와 같습니다. 컬럼 수가 적으므로 키 조회는 선형
/// 탐색입니다.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    keys: Arc<[String]>,
    values: Vec<Value>,
}

impl Record {
    /// 새 레코드 생성
    pub fn new(keys: Vec<String>, values: Vec<Value>) -> Self {
        Self::with_shared_keys(keys.into(), values)
    }

    /// 결과 스트림의 키 목록을 공유하는 레코드
    pub(crate) fn with_shared_keys(keys: Arc<[String]>, values: Vec<Value>) -> Self {
        Self { keys, values }
    }

    /// 키 목록
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// 값 목록
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// 값 목록으로 변환
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// 컬럼 수
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// 컬럼이 없는지 여부
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 키의 위치
    pub fn index_of(&self, key: &str) -> Option<usize> {
        self.keys.iter().position(|k| k == key)
    }

    /// 키 존재 여부
    pub fn contains_key(&self, key: &str) -> bool {
        self.index_of(key).is_some()
    }

    /// 키로 값 가져오기
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.index_of(key).and_then(|i| self.values.get(i))
    }

    /// 위치로 값 가져오기
    pub fn get_by_index(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// 키가 있고 값이 Null이 아닌지 여부
    pub fn has_value(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| !v.is_null())
    }

    /// 타입 변환된 값
    pub fn get_as<T>(&self, key: &str) -> DriverResult<T>
    where
        T: TryFrom<Value, Error = DriverError>,
    {
        let value = self
            .get(key)
            .ok_or_else(|| DriverError::type_conversion(format!("No column named '{}'", key)))?;
        T::try_from(value.clone())
    }

    /// Null 또는 없는 키는 `None`
    pub fn get_optional<T>(&self, key: &str) -> DriverResult<Option<T>>
    where
        T: TryFrom<Value, Error = DriverError>,
    {
        match self.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => T::try_from(value.clone()).map(Some),
        }
    }

    /// Boolean 값
    pub fn get_bool(&self, key: &str) -> DriverResult<bool> {
        self.get_as(key)
    }

    /// Integer 값
    pub fn get_int(&self, key: &str) -> DriverResult<i64> {
        self.get_as(key)
    }

    /// Float 값 (Integer도 허용)
    pub fn get_float(&self, key: &str) -> DriverResult<f64> {
        self.get_as(key)
    }

    /// String 값
    pub fn get_string(&self, key: &str) -> DriverResult<String> {
        self.get_as(key)
    }

    /// List 값
    pub fn get_list(&self, key: &str) -> DriverResult<Vec<Value>> {
        self.get_as(key)
    }

    /// Map 값
    pub fn get_map(&self, key: &str) -> DriverResult<PackStreamMap> {
        self.get_as(key)
    }

    /// 키 순서를 유지한 Map으로 변환
    pub fn to_map(&self) -> PackStreamMap {
        self.into_iter()
            .map(|(k, v)| (k.as_str(), v.clone()))
            .collect()
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (key, value)) in self.into_iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", key, value)?;
        }
        f.write_str("}")
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = (&'a String, &'a Value);
    type IntoIter = std::iter::Zip<std::slice::Iter<'a, String>, std::slice::Iter<'a, Value>>;

    fn into_iter(self) -> Self::IntoIter {
        self.keys.iter().zip(self.values.iter())
    }
}

// ============================================================================
// Value 변환
// ============================================================================

macro_rules! value_conversion {
    ($target:ty, $name:literal, $($pattern:pat => $out:expr),+ $(,)?) => {
        impl TryFrom<Value> for $target {
            type Error = DriverError;

            fn try_from(value: Value) -> Result<Self, Self::Error> {
                match value {
                    $($pattern => Ok($out),)+
                    other => Err(DriverError::type_conversion(format!(
                        "Cannot convert {} to {}",
                        other.type_name(),
                        $name
                    ))),
                }
            }
        }
    };
}

value_conversion!(bool, "bool", Value::Boolean(b) => b);
value_conversion!(i64, "i64", Value::Integer(i) => i);
value_conversion!(f64, "f64", Value::Float(f) => f, Value::Integer(i) => i as f64);
value_conversion!(String, "String", Value::String(s) => s);
value_conversion!(Vec<Value>, "List", Value::List(l) => l);
value_conversion!(PackStreamMap, "Map", Value::Map(m) => m);

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn person() -> Record {
        Record::new(
            vec!["name".into(), "age".into(), "active".into()],
            vec![Value::from("Alice"), Value::Integer(30), Value::Boolean(true)],
        )
    }

    #[test]
    fn test_lookup_by_key_and_index() {
        let record = person();
        assert_eq!(record.len(), 3);
        assert_eq!(record.keys(), &["name", "age", "active"]);
        assert_eq!(record.index_of("age"), Some(1));
        assert_eq!(record.get("name"), Some(&Value::from("Alice")));
        assert_eq!(record.get("missing"), None);
        assert_eq!(record.get_by_index(2), Some(&Value::Boolean(true)));
        assert_eq!(record.get_by_index(3), None);
    }

    #[test]
    fn test_typed_getters() {
        let record = person();
        assert_eq!(record.get_string("name").unwrap(), "Alice");
        assert_eq!(record.get_int("age").unwrap(), 30);
        assert_eq!(record.get_float("age").unwrap(), 30.0);
        assert!(record.get_bool("active").unwrap());

        assert!(matches!(
            record.get_int("name"),
            Err(DriverError::TypeConversion(msg)) if msg.contains("String to i64")
        ));
        assert!(record.get_list("age").is_err());
        assert!(matches!(
            record.get_string("missing"),
            Err(DriverError::TypeConversion(msg)) if msg.contains("missing")
        ));
    }

    #[test]
    fn test_optional_and_null() {
        let record = Record::new(
            vec!["set".into(), "unset".into()],
            vec![Value::Integer(0), Value::Null],
        );
        assert_eq!(record.get_optional::<i64>("set").unwrap(), Some(0));
        assert_eq!(record.get_optional::<i64>("unset").unwrap(), None);
        assert_eq!(record.get_optional::<i64>("missing").unwrap(), None);
        assert!(record.has_value("set"));
        assert!(!record.has_value("unset"));
        assert!(record.contains_key("unset"));
    }

    #[test]
    fn test_shared_keys() {
        let keys: Arc<[String]> = vec!["n".to_string()].into();
        let a = Record::with_shared_keys(keys.clone(), vec![Value::Integer(1)]);
        let b = Record::with_shared_keys(keys.clone(), vec![Value::Integer(2)]);
        assert_eq!(Arc::strong_count(&keys), 3);
        assert_eq!(a.keys(), b.keys());
        assert_eq!(b.into_values(), vec![Value::Integer(2)]);
    }

    #[test]
    fn test_nested_values() {
        let mut meta = PackStreamMap::new();
        meta.insert("role", "WRITE");
        let record = Record::new(
            vec!["addresses".into(), "meta".into()],
            vec![Value::List(vec!["a:7687".into(), "b:7687".into()]), Value::Map(meta)],
        );

        assert_eq!(record.get_list("addresses").unwrap().len(), 2);
        assert_eq!(
            record.get_map("meta").unwrap().get("role").and_then(|v| v.as_str()),
            Some("WRITE")
        );
    }

    #[test]
    fn test_to_map_keeps_order() {
        let map = person().to_map();
        let keys: Vec<&str> = map.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["name", "age", "active"]);
    }

    #[test]
    fn test_display_and_serialize() {
        let record = person();
        assert_eq!(record.to_string(), "{name: \"Alice\", age: 30, active: true}");
        assert_eq!(
            serde_json::to_string(&record).unwrap(),
            r#"{"name":"Alice","age":30,"active":true}"#
        );
    }
}
