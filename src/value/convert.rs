// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 类型转换
//!
//! 通过 serde 把值树转换为任意 `DeserializeOwned` 类型：
//! - 标量按字符串解析为布尔、整数、浮点与字符；只含单元变体的枚举按名字匹配；
//! - 内部节点作为 map / struct 反序列化，处于数字排序模式时也可以作为序列；
//! - 多值数组作为序列，单个标量被请求为序列时得到只含一个元素的序列；
//! - 缺失值对 `Option` 为 `None`，其他情况报告带作用域的缺失值错误。

use serde::de::value::BorrowedStrDeserializer;
use serde::de::{self, DeserializeOwned, DeserializeSeed, MapAccess, SeqAccess, Visitor};
use serde::forward_to_deserialize_any;

use super::{join_scope, Entries, HashValue, Node};
use crate::exception::Exception;

pub(crate) fn from_node<T: DeserializeOwned>(node: &Node) -> Result<T, Exception> {
    T::deserialize(ValueDeserializer::new(Subject::Node(node)))
}

pub(crate) fn from_hash<T: DeserializeOwned>(hash: &HashValue) -> Result<T, Exception> {
    T::deserialize(ValueDeserializer::new(Subject::Hash(hash)))
}

/// 被转换的对象。根节点以 `HashValue` 形式持有，其余节点都是 `Node`。
#[derive(Clone, Copy)]
enum Subject<'de> {
    Node(&'de Node),
    Hash(&'de HashValue),
}

impl<'de> Subject<'de> {
    fn normalize(self) -> Self {
        match self {
            Subject::Node(Node::Hash(hash)) => Subject::Hash(hash),
            other => other,
        }
    }

    fn scope(&self) -> &'de str {
        match *self {
            Subject::Node(node) => node.scope(),
            Subject::Hash(hash) => hash.scope(),
        }
    }
}

struct ValueDeserializer<'de> {
    subject: Subject<'de>,
}

impl<'de> ValueDeserializer<'de> {
    fn new(subject: Subject<'de>) -> Self {
        Self {
            subject: subject.normalize(),
        }
    }

    fn scope(&self) -> &'de str {
        self.subject.scope()
    }

    /// 取出标量文本。单元素数组按其唯一元素处理。
    fn text(&self, expected: &str) -> Result<&'de str, Exception> {
        match self.subject {
            Subject::Node(Node::Scalar(v)) => Ok(v.value()),
            Subject::Node(Node::Upload(v)) => Ok(v.filename()),
            Subject::Node(Node::Array(v)) if v.len() == 1 => {
                ValueDeserializer::new(Subject::Node(&v.values()[0])).text(expected)
            }
            Subject::Node(Node::Missing(v)) => Err(Exception::missing(v.scope())),
            _ => Err(Exception::mismatch(self.scope(), expected)),
        }
    }

    /// serde 自定义错误不知道出错位置，这里补上当前节点的作用域。
    fn rescope(&self, error: Exception) -> Exception {
        match error {
            Exception::TypeMismatch { scope, expected } if scope.is_empty() => {
                Exception::mismatch(self.scope(), expected)
            }
            other => other,
        }
    }

    fn elements(&self) -> Box<dyn Iterator<Item = Subject<'de>> + 'de> {
        match self.subject {
            Subject::Node(Node::Array(array)) => {
                Box::new(array.values().iter().map(Subject::Node))
            }
            Subject::Hash(hash) if hash.is_indexed() => {
                Box::new(hash.iter().map(|(_, node)| Subject::Node(node)))
            }
            Subject::Node(Node::Missing(_)) => Box::new(std::iter::empty()),
            subject => Box::new(std::iter::once(subject)),
        }
    }
}

macro_rules! deserialize_parsed {
    ($($method:ident => $visit:ident($ty:ty),)*) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Exception> {
                let text = self.text(stringify!($ty))?;
                let parsed: $ty = text
                    .trim()
                    .parse()
                    .map_err(|_| Exception::mismatch(self.scope(), stringify!($ty)))?;
                visitor.$visit(parsed).map_err(|e| self.rescope(e))
            }
        )*
    };
}

impl<'de> de::Deserializer<'de> for ValueDeserializer<'de> {
    type Error = Exception;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Exception> {
        match self.subject {
            Subject::Hash(_) => self.deserialize_map(visitor),
            Subject::Node(Node::Array(_)) => self.deserialize_seq(visitor),
            Subject::Node(Node::Missing(v)) => Err(Exception::missing(v.scope())),
            _ => self.deserialize_str(visitor),
        }
    }

    deserialize_parsed! {
        deserialize_bool => visit_bool(bool),
        deserialize_i8 => visit_i8(i8),
        deserialize_i16 => visit_i16(i16),
        deserialize_i32 => visit_i32(i32),
        deserialize_i64 => visit_i64(i64),
        deserialize_i128 => visit_i128(i128),
        deserialize_u8 => visit_u8(u8),
        deserialize_u16 => visit_u16(u16),
        deserialize_u32 => visit_u32(u32),
        deserialize_u64 => visit_u64(u64),
        deserialize_u128 => visit_u128(u128),
        deserialize_f32 => visit_f32(f32),
        deserialize_f64 => visit_f64(f64),
        deserialize_char => visit_char(char),
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Exception> {
        // 内部节点按表单形式序列化
        if let Subject::Hash(hash) = self.subject {
            return visitor.visit_string(hash.value()).map_err(|e| self.rescope(e));
        }
        let text = self.text("String")?;
        visitor.visit_borrowed_str(text).map_err(|e| self.rescope(e))
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Exception> {
        self.deserialize_str(visitor)
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Exception> {
        match self.subject {
            Subject::Node(Node::Upload(upload)) => visitor
                .visit_borrowed_bytes(upload.content())
                .map_err(|e| self.rescope(e)),
            _ => {
                let text = self.text("bytes")?;
                visitor
                    .visit_borrowed_bytes(text.as_bytes())
                    .map_err(|e| self.rescope(e))
            }
        }
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Exception> {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Exception> {
        match self.subject {
            Subject::Node(Node::Missing(_)) => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Exception> {
        visitor.visit_unit()
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Exception> {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Exception> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Exception> {
        let access = ElementAccess {
            elements: self.elements(),
        };
        visitor.visit_seq(access).map_err(|e| self.rescope(e))
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Exception> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Exception> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Exception> {
        match self.subject {
            Subject::Hash(hash) => {
                let access = EntryAccess {
                    entries: hash.iter(),
                    pending: None,
                    scope: hash.scope(),
                };
                visitor.visit_map(access).map_err(|e| self.rescope(e))
            }
            Subject::Node(Node::Missing(v)) => Err(Exception::missing(v.scope())),
            _ => Err(Exception::mismatch(self.scope(), "map")),
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Exception> {
        let scope = self.scope();
        match self.subject {
            Subject::Hash(_) => self.deserialize_map(visitor).map_err(|e| match e {
                // 缺少的字段由 serde 报告为裸字段名，补全为完整作用域
                Exception::MissingValue { scope: field } if fields.contains(&field.as_str()) => {
                    Exception::missing(join_scope(scope, &field))
                }
                other => other,
            }),
            Subject::Node(Node::Missing(v)) => Err(Exception::missing(v.scope())),
            _ => Err(Exception::mismatch(scope, name)),
        }
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Exception> {
        let text = self.text("enum")?;
        let variant = BorrowedStrDeserializer::<Exception>::new(text);
        visitor.visit_enum(variant).map_err(|e| self.rescope(e))
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Exception> {
        self.deserialize_str(visitor)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Exception> {
        visitor.visit_unit()
    }
}

struct ElementAccess<'de> {
    elements: Box<dyn Iterator<Item = Subject<'de>> + 'de>,
}

impl<'de> SeqAccess<'de> for ElementAccess<'de> {
    type Error = Exception;

    fn next_element_seed<T: DeserializeSeed<'de>>(
        &mut self,
        seed: T,
    ) -> Result<Option<T::Value>, Exception> {
        match self.elements.next() {
            Some(subject) => seed.deserialize(ValueDeserializer::new(subject)).map(Some),
            None => Ok(None),
        }
    }
}

struct EntryAccess<'de> {
    entries: Entries<'de>,
    pending: Option<&'de Node>,
    scope: &'de str,
}

impl<'de> MapAccess<'de> for EntryAccess<'de> {
    type Error = Exception;

    fn next_key_seed<K: DeserializeSeed<'de>>(
        &mut self,
        seed: K,
    ) -> Result<Option<K::Value>, Exception> {
        match self.entries.next() {
            Some((key, node)) => {
                self.pending = Some(node);
                let key = KeyDeserializer {
                    key,
                    scope: self.scope,
                };
                seed.deserialize(key).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value, Exception> {
        match self.pending.take() {
            Some(node) => seed.deserialize(ValueDeserializer::new(Subject::Node(node))),
            None => Err(Exception::mismatch(self.scope, "value")),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        self.entries.size_hint().1
    }
}

/// map 的键。除字符串外也可以解析为数字，便于 `HashMap<u32, T>` 这类目标。
struct KeyDeserializer<'de> {
    key: &'de str,
    scope: &'de str,
}

impl<'de> KeyDeserializer<'de> {
    fn text(&self, _expected: &str) -> Result<&'de str, Exception> {
        Ok(self.key)
    }

    fn scope(&self) -> String {
        join_scope(self.scope, self.key)
    }

    fn rescope(&self, error: Exception) -> Exception {
        match error {
            Exception::TypeMismatch { scope, expected } if scope.is_empty() => {
                Exception::mismatch(self.scope(), expected)
            }
            other => other,
        }
    }
}

impl<'de> de::Deserializer<'de> for KeyDeserializer<'de> {
    type Error = Exception;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Exception> {
        visitor.visit_borrowed_str(self.key).map_err(|e| self.rescope(e))
    }

    deserialize_parsed! {
        deserialize_bool => visit_bool(bool),
        deserialize_i8 => visit_i8(i8),
        deserialize_i16 => visit_i16(i16),
        deserialize_i32 => visit_i32(i32),
        deserialize_i64 => visit_i64(i64),
        deserialize_u8 => visit_u8(u8),
        deserialize_u16 => visit_u16(u16),
        deserialize_u32 => visit_u32(u32),
        deserialize_u64 => visit_u64(u64),
        deserialize_char => visit_char(char),
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Exception> {
        let variant = BorrowedStrDeserializer::<Exception>::new(self.key);
        visitor.visit_enum(variant).map_err(|e| self.rescope(e))
    }

    forward_to_deserialize_any! {
        i128 u128 f32 f64 str string bytes byte_buf option unit unit_struct
        newtype_struct seq tuple tuple_struct map struct identifier ignored_any
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_derive::Deserialize;

    use crate::exception::Exception;
    use crate::value::HashValue;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Address {
        city: String,
        zip: Option<u32>,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct User {
        name: String,
        age: u8,
        admin: bool,
        address: Address,
        #[serde(default)]
        tags: Vec<String>,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(rename_all = "lowercase")]
    enum Role {
        Admin,
        Guest,
    }

    fn user_tree() -> HashValue {
        let mut root = HashValue::new();
        root.put("user.name", "edgar");
        root.put("user.age", "42");
        root.put("user.admin", "true");
        root.put("user[address][city]", "Madrid");
        root.put("user.tags", "a");
        root.put("user.tags", "b");
        root
    }

    #[test]
    fn test_struct_conversion() {
        let root = user_tree();
        let user: User = root.get("user").to().unwrap();
        assert_eq!(user.name, "edgar");
        assert_eq!(user.age, 42);
        assert!(user.admin);
        assert_eq!(
            user.address,
            Address {
                city: "Madrid".to_string(),
                zip: None
            }
        );
        assert_eq!(user.tags, vec!["a", "b"]);
    }

    #[test]
    fn test_root_to_map() {
        let mut root = HashValue::new();
        root.put("a", "1");
        root.put("b", "2");
        let map: HashMap<String, i32> = root.to().unwrap();
        assert_eq!(map.get("a"), Some(&1));
        assert_eq!(map.get("b"), Some(&2));
    }

    #[test]
    fn test_numeric_keys() {
        let mut root = HashValue::new();
        root.put("m[2]", "b");
        root.put("m[1]", "a");
        let map: HashMap<u32, String> = root.get("m").to().unwrap();
        assert_eq!(map.get(&1).map(String::as_str), Some("a"));
        let list: Vec<String> = root.get("m").to().unwrap();
        assert_eq!(list, vec!["a", "b"]);
    }

    #[test]
    fn test_scalar_parsing() {
        let mut root = HashValue::new();
        root.put("n", " 7 ");
        root.put("f", "2.5");
        root.put("c", "x");
        root.put("role", "admin");
        assert_eq!(root.get("n").to::<i64>().unwrap(), 7);
        assert_eq!(root.get("f").to::<f64>().unwrap(), 2.5);
        assert_eq!(root.get("c").to::<char>().unwrap(), 'x');
        assert_eq!(root.get("role").to::<Role>().unwrap(), Role::Admin);
        assert_eq!(root.get("n").to::<Vec<u8>>().unwrap(), vec![7]);
    }

    #[test]
    fn test_list_conversion_of_array() {
        let mut root = HashValue::new();
        root.put_all("id", ["1", "2", "3"]);
        assert_eq!(root.get("id").to_list_of::<u16>().unwrap(), vec![1, 2, 3]);
        let tuple: (u8, u8, u8) = root.get("id").to().unwrap();
        assert_eq!(tuple, (1, 2, 3));
    }

    #[test]
    fn test_type_mismatch_carries_scope() {
        let mut root = HashValue::new();
        root.put("user.age", "old");
        let err = root.get("user").get("age").to::<u8>().unwrap_err();
        assert_eq!(err, Exception::mismatch("user.age", "u8"));
    }

    #[test]
    fn test_unknown_enum_variant_carries_scope() {
        let mut root = HashValue::new();
        root.put("role", "root");
        let err = root.get("role").to::<Role>().unwrap_err();
        assert_eq!(err.scope(), Some("role"));
    }

    #[test]
    fn test_missing_field_carries_scope() {
        let mut root = HashValue::new();
        root.put("user.name", "edgar");
        root.put("user.age", "1");
        root.put("user.admin", "false");
        let err = root.get("user").to::<User>().unwrap_err();
        assert_eq!(err, Exception::missing("user.address"));
    }

    #[test]
    fn test_nested_missing_field_carries_full_scope() {
        let mut root = HashValue::new();
        root.put("user.name", "edgar");
        root.put("user.age", "1");
        root.put("user.admin", "false");
        root.put("user.address.zip", "28001");
        let err = root.get("user").to::<User>().unwrap_err();
        assert_eq!(err, Exception::missing("user.address.city"));
    }

    #[test]
    fn test_missing_value_conversion() {
        let root = HashValue::new();
        let nope = root.get("nope");
        assert_eq!(nope.to::<String>(), Err(Exception::missing("nope")));
        assert_eq!(nope.to::<Option<String>>(), Ok(None));
        assert_eq!(nope.get("x").to::<i32>(), Err(Exception::missing("nope.x")));
    }

    #[test]
    fn test_multi_value_as_scalar_is_mismatch() {
        let mut root = HashValue::new();
        root.put_all("id", ["1", "2"]);
        assert_eq!(
            root.get("id").to::<i32>(),
            Err(Exception::mismatch("id", "i32"))
        );
    }
}
