// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # HashValue
//!
//! 值树的内部节点。按路径写入时沿途创建子节点，叶子上的重复写入会把单值提升为数组。
//!
//! ## 路径语法
//! - `.` 分隔路径段，例如 `user.name`。
//! - `[` 与 `]` 括起一个路径段，例如 `user[address][city]`、`items[0]`。
//! - 空路径段会被跳过，解析过程从不报错。
//! - 任何一段全为数字时，其父节点切换为按数字排序的模式，且不会切换回来。

use std::cmp::Ordering;
use std::collections::{btree_map, BTreeMap};
use std::hash::Hash;

use indexmap::{map, IndexMap, IndexSet};
use log::warn;
use serde::de::DeserializeOwned;

use super::leaf::{ArrayValue, SingleValue};
use super::{convert, is_index, join_scope, Node, NodeRef};
use crate::exception::Exception;
use crate::util::decode_form_component;

/// 写入前对每个原始字符串做的解码。根节点创建时选定，子节点继承。
pub type Decoder = fn(&str) -> String;

fn identity(value: &str) -> String {
    value.to_string()
}

#[derive(Debug, Clone)]
pub struct HashValue {
    name: Option<String>,
    scope: String,
    children: Children,
    decoder: Decoder,
}

#[derive(Debug, Clone, PartialEq)]
enum Children {
    /// 按首次写入的顺序迭代。
    Ordered(IndexMap<String, Node>),
    /// 按数字大小迭代，模拟列表语义。
    Indexed(BTreeMap<IndexKey, Node>),
}

/// 数字键按数值比较（不会溢出），非数字键排在所有数字键之后并按字典序比较。
#[derive(Debug, Clone, PartialEq, Eq)]
struct IndexKey(String);

impl Ord for IndexKey {
    fn cmp(&self, other: &Self) -> Ordering {
        let (a, b) = (self.0.as_str(), other.0.as_str());
        match (is_index(a), is_index(b)) {
            (true, true) => {
                let x = a.trim_start_matches('0');
                let y = b.trim_start_matches('0');
                x.len()
                    .cmp(&y.len())
                    .then_with(|| x.cmp(y))
                    .then_with(|| a.cmp(b))
            }
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => a.cmp(b),
        }
    }
}

impl PartialOrd for IndexKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Children {
    fn get(&self, key: &str) -> Option<&Node> {
        match self {
            Children::Ordered(map) => map.get(key),
            Children::Indexed(map) => map.get(&IndexKey(key.to_string())),
        }
    }

    fn get_mut(&mut self, key: &str) -> Option<&mut Node> {
        match self {
            Children::Ordered(map) => map.get_mut(key),
            Children::Indexed(map) => map.get_mut(&IndexKey(key.to_string())),
        }
    }

    fn insert(&mut self, key: &str, node: Node) {
        match self {
            Children::Ordered(map) => {
                map.insert(key.to_string(), node);
            }
            Children::Indexed(map) => {
                map.insert(IndexKey(key.to_string()), node);
            }
        }
    }

    fn len(&self) -> usize {
        match self {
            Children::Ordered(map) => map.len(),
            Children::Indexed(map) => map.len(),
        }
    }
}

/// 子节点迭代器，按当前排序模式产出 `(键, 节点)`。
pub struct Entries<'a> {
    inner: EntriesInner<'a>,
}

enum EntriesInner<'a> {
    Ordered(map::Iter<'a, String, Node>),
    Indexed(btree_map::Iter<'a, IndexKey, Node>),
}

impl<'a> Iterator for Entries<'a> {
    type Item = (&'a str, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        match &mut self.inner {
            EntriesInner::Ordered(it) => it.next().map(|(k, v)| (k.as_str(), v)),
            EntriesInner::Indexed(it) => it.next().map(|(k, v)| (k.0.as_str(), v)),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match &self.inner {
            EntriesInner::Ordered(it) => it.size_hint(),
            EntriesInner::Indexed(it) => it.size_hint(),
        }
    }
}

impl Default for HashValue {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for HashValue {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.scope == other.scope && self.children == other.children
    }
}

impl HashValue {
    /// 创建根节点，写入的值原样保存。
    pub fn new() -> Self {
        Self::with_decoder(identity)
    }

    /// 创建根节点，写入的每个值都先经过 `decoder`。
    pub fn with_decoder(decoder: Decoder) -> Self {
        Self {
            name: None,
            scope: String::new(),
            children: Children::Ordered(IndexMap::new()),
            decoder,
        }
    }

    /// 解析 `application/x-www-form-urlencoded` 文本（查询字符串或表单正文）。
    pub fn from_urlencoded(input: &str) -> Self {
        let mut root = Self::with_decoder(decode_form_component);
        let input = input.strip_prefix('?').unwrap_or(input);
        for pair in input.split('&').filter(|pair| !pair.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            root.put(&decode_form_component(key), value);
        }
        root
    }

    fn child(name: &str, scope: String, decoder: Decoder) -> Self {
        Self {
            name: Some(name.to_string()),
            scope,
            children: Children::Ordered(IndexMap::new()),
            decoder,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn size(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// 是否已切换到按数字排序的模式。
    pub fn is_indexed(&self) -> bool {
        matches!(self.children, Children::Indexed(_))
    }

    pub fn put(&mut self, path: &str, value: &str) {
        self.put_all(path, [value]);
    }

    /// 依次写入每个值，每次写入都遵循单值提升为数组的规则。
    pub fn put_all<I, S>(&mut self, path: &str, values: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let decoder = self.decoder;
        if let Some((target, key)) = self.locate(path) {
            for value in values {
                let decoded = decoder(value.as_ref());
                target.insert(key, Node::Scalar(SingleValue::new(key, decoded)));
            }
        }
    }

    /// 在叶子位置挂载一棵已构建好的子树（例如上传文件）。
    pub fn put_node(&mut self, path: &str, node: Node) {
        if let Some((target, key)) = self.locate(path) {
            target.insert(key, node);
        }
    }

    /// 批量写入，常用于请求头这类 `名字 -> 多个值` 的来源。
    pub fn put_map<I, K, V, S>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for (key, values) in entries {
            self.put_all(key.as_ref(), values);
        }
    }

    /// 沿路径找到（必要时创建）目标节点，返回它以及叶子键。
    fn locate<'p>(&mut self, path: &'p str) -> Option<(&mut HashValue, &'p str)> {
        let mut start = 0;
        let mut end = path.len();
        let mut target: &mut HashValue = self;
        for (i, ch) in path.char_indices() {
            match ch {
                '.' => {
                    let name = &path[start..i];
                    start = i + 1;
                    target = target.scope_for(name)?;
                }
                '[' => {
                    if start < i {
                        target = target.scope_for(&path[start..i])?;
                    }
                    start = i + 1;
                }
                ']' => {
                    if i + 1 < path.len() {
                        let name = &path[start..i];
                        start = i + 1;
                        target = target.scope_for(name)?;
                    } else {
                        end = i;
                    }
                }
                _ => {}
            }
        }
        let key = &path[start..end];
        if is_index(key) {
            target.use_indexes();
        }
        Some((target, key))
    }

    fn scope_for(&mut self, name: &str) -> Option<&mut HashValue> {
        if name.is_empty() {
            return Some(self);
        }
        if is_index(name) {
            self.use_indexes();
        }
        self.get_or_create_scope(name)
    }

    fn use_indexes(&mut self) {
        if let Children::Ordered(map) = &mut self.children {
            let indexed = std::mem::take(map)
                .into_iter()
                .map(|(key, node)| (IndexKey(key), node))
                .collect();
            self.children = Children::Indexed(indexed);
        }
    }

    /// 返回名为 `name` 的子节点，不存在时创建一个空的内部节点。
    ///
    /// 同一键已经被叶子占用时返回 `None`，调用方放弃本次写入。
    pub(crate) fn get_or_create_scope(&mut self, name: &str) -> Option<&mut HashValue> {
        if self.children.get(name).is_none() {
            let scope = join_scope(&self.scope, name);
            let child = HashValue::child(name, scope, self.decoder);
            self.children.insert(name, Node::Hash(child));
        }
        match self.children.get_mut(name) {
            Some(Node::Hash(hash)) => Some(hash),
            _ => {
                warn!(
                    "路径段'{}'已被叶子值占用，无法作为内部节点，本次写入被忽略",
                    join_scope(&self.scope, name)
                );
                None
            }
        }
    }

    fn insert(&mut self, key: &str, mut node: Node) {
        let scope = join_scope(&self.scope, key);
        node.rescope(key, &scope);
        match self.children.get_mut(key) {
            None => self.children.insert(key, node),
            Some(Node::Array(array)) => array.push(node),
            Some(Node::Hash(_)) => {
                warn!("路径'{}'已是内部节点，无法写入叶子值，本次写入被忽略", scope);
            }
            Some(existing) => {
                let previous = std::mem::replace(existing, Node::Missing(Default::default()));
                *existing = Node::Array(ArrayValue::promote(previous, node, key, &scope));
            }
        }
    }

    pub(crate) fn rescope(&mut self, name: &str, scope: &str) {
        self.name = Some(name.to_string());
        self.scope = scope.to_string();
        let children: Vec<(&str, &mut Node)> = match &mut self.children {
            Children::Ordered(map) => map.iter_mut().map(|(k, v)| (k.as_str(), v)).collect(),
            Children::Indexed(map) => map.iter_mut().map(|(k, v)| (k.0.as_str(), v)).collect(),
        };
        for (key, child) in children {
            child.rescope(key, &join_scope(scope, key));
        }
    }

    pub fn child_node(&self, name: &str) -> Option<&Node> {
        self.children.get(name)
    }

    pub fn get(&self, name: &str) -> NodeRef<'_> {
        match self.children.get(name) {
            Some(node) => NodeRef::Found(node),
            None => NodeRef::missing(join_scope(&self.scope, name)),
        }
    }

    pub fn get_index(&self, index: usize) -> NodeRef<'_> {
        self.get(&index.to_string())
    }

    pub fn iter(&self) -> Entries<'_> {
        let inner = match &self.children {
            Children::Ordered(map) => EntriesInner::Ordered(map.iter()),
            Children::Indexed(map) => EntriesInner::Indexed(map.iter()),
        };
        Entries { inner }
    }

    /// URL 表单形式的序列化：`key=value` 以 `&` 连接，上传文件取文件名。
    pub fn value(&self) -> String {
        let mut pairs = Vec::new();
        for (key, node) in self.iter() {
            for scalar in node.scalars() {
                pairs.push([key, "=", scalar].concat());
            }
        }
        pairs.join("&")
    }

    pub fn to_list(&self) -> Result<Vec<String>, Exception> {
        self.to_list_of()
    }

    /// 数字排序模式下逐个转换子节点，否则把整个节点转换为单个元素。
    pub fn to_list_of<T: DeserializeOwned>(&self) -> Result<Vec<T>, Exception> {
        if self.is_indexed() {
            self.iter().map(|(_, node)| node.to()).collect()
        } else {
            Ok(vec![self.to()?])
        }
    }

    pub fn to_set(&self) -> Result<IndexSet<String>, Exception> {
        self.to_set_of()
    }

    /// 与 `to_list_of` 相同，去掉重复元素并保留首次出现的顺序。
    pub fn to_set_of<T: DeserializeOwned + Hash + Eq>(&self) -> Result<IndexSet<T>, Exception> {
        Ok(self.to_list_of::<T>()?.into_iter().collect())
    }

    pub fn to_optional<T: DeserializeOwned>(&self) -> Result<Option<T>, Exception> {
        if self.is_empty() {
            return Ok(None);
        }
        self.to().map(Some)
    }

    pub fn to<T: DeserializeOwned>(&self) -> Result<T, Exception> {
        convert::from_hash(self)
    }

    pub fn to_multimap(&self) -> IndexMap<String, Vec<String>> {
        let mut result = IndexMap::with_capacity(self.size());
        let prefix = match &self.name {
            Some(name) => [name, "."].concat(),
            None => String::new(),
        };
        for (_, node) in self.iter() {
            for (key, values) in node.to_multimap() {
                result.insert([prefix.as_str(), &key].concat(), values);
            }
        }
        result
    }
}
