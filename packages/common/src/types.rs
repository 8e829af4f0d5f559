// 通用类型定义

use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

type Serializer = dyn Fn() -> serde_json::Result<Value> + Send + Sync;

/// 日志字段值
///
/// 保存任意可序列化的值，JSON 转换推迟到格式化时进行。
/// 克隆只复制引用，值本身不可变。
#[derive(Clone)]
pub struct FieldValue(Arc<Serializer>);

impl FieldValue {
    /// 从任意可序列化的值创建字段值
    pub fn new<T>(value: T) -> Self
    where
        T: Serialize + Send + Sync + 'static,
    {
        Self(Arc::new(move || serde_json::to_value(&value)))
    }

    /// 转换为 JSON 值，失败时返回序列化错误
    pub fn to_json(&self) -> serde_json::Result<Value> {
        (self.0)()
    }
}

impl fmt::Debug for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_json() {
            Ok(value) => write!(f, "{value}"),
            Err(_) => f.write_str("<unserializable>"),
        }
    }
}

macro_rules! impl_from_for_field_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for FieldValue {
                fn from(value: $ty) -> Self {
                    Self::new(value)
                }
            }
        )*
    };
}

impl_from_for_field_value!(
    bool, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, String,
    &'static str, Value,
);

/// 字段名到字段值的映射
pub type Fields = HashMap<String, FieldValue>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[test]
    fn test_field_value_to_json() {
        assert_eq!(FieldValue::from("demo").to_json().unwrap(), json!("demo"));
        assert_eq!(FieldValue::from(42_u64).to_json().unwrap(), json!(42));
        assert_eq!(
            FieldValue::new(vec!["a", "b"]).to_json().unwrap(),
            json!(["a", "b"])
        );
    }

    #[test]
    fn test_field_value_defers_failure() {
        let mut map = BTreeMap::new();
        map.insert(vec![1_u8], "bytes as key");

        // 创建不会失败，转换时才报错
        let value = FieldValue::new(map);
        assert!(value.to_json().is_err());
        assert_eq!(format!("{value:?}"), "<unserializable>");
    }

    #[test]
    fn test_field_value_clone_shares_value() {
        let value = FieldValue::from(json!({"user": "alice"}));
        let cloned = value.clone();
        assert_eq!(value.to_json().unwrap(), cloned.to_json().unwrap());
    }
}
