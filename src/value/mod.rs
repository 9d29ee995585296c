// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 请求值树
//!
//! 查询参数、表单参数、请求头与上传文件都以树的形式保存：内部节点是 [`HashValue`]，
//! 叶子是单值、多值数组或上传文件，查找失败时返回 [`MissingValue`] 哨兵而不是报错。
//!
//! ## 使用约定
//! - 树只在解析阶段由持有它的任务写入，交给业务代码后按只读使用，内部不加锁。
//! - 所有读取操作都是纯函数，不会修改树。
//! - 只有在终结性取值（`value`、`to` 等）时才会报告缺失值或类型不匹配。

mod convert;
mod hash;
mod leaf;

use std::hash::Hash;
use std::ops::Deref;

use indexmap::{IndexMap, IndexSet};
use serde::de::DeserializeOwned;

use crate::exception::Exception;

pub use hash::{Decoder, Entries, HashValue};
pub use leaf::{ArrayValue, FileUpload, MissingValue, SingleValue};

/// 值树中的一个节点。
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Scalar(SingleValue),
    Array(ArrayValue),
    Hash(HashValue),
    Upload(FileUpload),
    Missing(MissingValue),
}

/// `get` 的返回值：树中已有节点的借用，或者新合成的缺失哨兵。
///
/// 借用的生命周期与整棵树绑定，因此链式查找的中间结果可以直接保存到变量里。
#[derive(Debug, Clone)]
pub enum NodeRef<'a> {
    Found(&'a Node),
    Missing(Node),
}

impl<'a> NodeRef<'a> {
    fn missing(scope: String) -> Self {
        NodeRef::Missing(Node::Missing(MissingValue::new(scope)))
    }

    pub fn get(&self, name: &str) -> NodeRef<'a> {
        match self {
            NodeRef::Found(node) => node.get(name),
            NodeRef::Missing(node) => NodeRef::missing(join_scope(node.scope(), name)),
        }
    }

    pub fn get_index(&self, index: usize) -> NodeRef<'a> {
        match self {
            NodeRef::Found(node) => node.get_index(index),
            NodeRef::Missing(node) => {
                NodeRef::missing(join_scope(node.scope(), &index.to_string()))
            }
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, NodeRef::Missing(_))
    }
}

impl Deref for NodeRef<'_> {
    type Target = Node;

    fn deref(&self) -> &Node {
        match self {
            NodeRef::Found(node) => node,
            NodeRef::Missing(node) => node,
        }
    }
}

impl Node {
    /// 节点名：父节点保存它时使用的最后一段路径。根节点没有名字。
    pub fn name(&self) -> Option<&str> {
        match self {
            Node::Scalar(v) => Some(v.name()),
            Node::Array(v) => Some(v.name()),
            Node::Hash(v) => v.name(),
            Node::Upload(v) => Some(v.name()),
            Node::Missing(v) => v.scope().rsplit('.').next().filter(|name| !name.is_empty()),
        }
    }

    /// 从根节点出发的点分路径，用于错误诊断。
    pub fn scope(&self) -> &str {
        match self {
            Node::Scalar(v) => v.scope(),
            Node::Array(v) => v.scope(),
            Node::Hash(v) => v.scope(),
            Node::Upload(v) => v.scope(),
            Node::Missing(v) => v.scope(),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Node::Missing(_))
    }

    pub fn get(&self, name: &str) -> NodeRef<'_> {
        match self {
            Node::Hash(hash) => hash.get(name),
            // 只接受规范写法的下标，`07` 这类名字按普通键处理
            Node::Array(array) => match name.parse::<usize>() {
                Ok(index) if is_index(name) && (name == "0" || !name.starts_with('0')) => {
                    self.get_index(index)
                }
                _ => NodeRef::missing(join_scope(array.scope(), name)),
            },
            _ => NodeRef::missing(join_scope(self.scope(), name)),
        }
    }

    pub fn get_index(&self, index: usize) -> NodeRef<'_> {
        match self {
            Node::Hash(hash) => hash.get_index(index),
            Node::Array(array) => match array.values().get(index) {
                Some(node) => NodeRef::Found(node),
                None => NodeRef::missing(join_scope(array.scope(), &index.to_string())),
            },
            Node::Scalar(_) | Node::Upload(_) if index == 0 => NodeRef::Found(self),
            _ => NodeRef::missing(join_scope(self.scope(), &index.to_string())),
        }
    }

    /// 直接子节点的数量。叶子计为 1，缺失值计为 0。
    pub fn size(&self) -> usize {
        match self {
            Node::Hash(hash) => hash.size(),
            Node::Array(array) => array.len(),
            Node::Scalar(_) | Node::Upload(_) => 1,
            Node::Missing(_) => 0,
        }
    }

    pub fn value(&self) -> Result<String, Exception> {
        match self {
            Node::Scalar(v) => Ok(v.value().to_string()),
            Node::Upload(v) => Ok(v.filename().to_string()),
            Node::Array(v) => match v.values() {
                [single] => single.value(),
                _ => Err(Exception::mismatch(v.scope(), "String")),
            },
            Node::Hash(v) => Ok(v.value()),
            Node::Missing(v) => Err(Exception::missing(v.scope())),
        }
    }

    /// 直接子节点。叶子节点迭代出自身。
    pub fn iter(&self) -> Box<dyn Iterator<Item = &Node> + '_> {
        match self {
            Node::Hash(hash) => Box::new(hash.iter().map(|(_, node)| node)),
            Node::Array(array) => Box::new(array.values().iter()),
            Node::Scalar(_) | Node::Upload(_) => Box::new(std::iter::once(self)),
            Node::Missing(_) => Box::new(std::iter::empty()),
        }
    }

    /// 按顺序展开所有叶子的字符串值，上传文件取文件名。
    pub fn scalars(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_scalars(&mut out);
        out
    }

    pub(crate) fn collect_scalars<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Node::Scalar(v) => out.push(v.value()),
            Node::Upload(v) => out.push(v.filename()),
            Node::Array(v) => v.values().iter().for_each(|n| n.collect_scalars(out)),
            Node::Hash(v) => v.iter().for_each(|(_, n)| n.collect_scalars(out)),
            Node::Missing(_) => {}
        }
    }

    pub fn to_list(&self) -> Result<Vec<String>, Exception> {
        self.to_list_of()
    }

    pub fn to_set(&self) -> Result<IndexSet<String>, Exception> {
        self.to_set_of()
    }

    pub fn to_list_of<T: DeserializeOwned>(&self) -> Result<Vec<T>, Exception> {
        match self {
            Node::Hash(hash) => hash.to_list_of(),
            Node::Array(array) => array.values().iter().map(Node::to).collect(),
            Node::Scalar(_) | Node::Upload(_) => Ok(vec![self.to()?]),
            Node::Missing(_) => Ok(Vec::new()),
        }
    }

    pub fn to_set_of<T: DeserializeOwned + Hash + Eq>(&self) -> Result<IndexSet<T>, Exception> {
        Ok(self.to_list_of::<T>()?.into_iter().collect())
    }

    pub fn to_optional<T: DeserializeOwned>(&self) -> Result<Option<T>, Exception> {
        match self {
            Node::Hash(hash) => hash.to_optional(),
            Node::Missing(_) => Ok(None),
            _ => self.to().map(Some),
        }
    }

    pub fn to<T: DeserializeOwned>(&self) -> Result<T, Exception> {
        convert::from_node(self)
    }

    /// 把子树展开为 `点分路径 -> 字符串列表`，保持子节点顺序。
    pub fn to_multimap(&self) -> IndexMap<String, Vec<String>> {
        match self {
            Node::Hash(hash) => hash.to_multimap(),
            Node::Missing(_) => IndexMap::new(),
            leaf => {
                let mut result = IndexMap::with_capacity(1);
                let values = leaf.scalars().into_iter().map(str::to_string).collect();
                result.insert(leaf.name().unwrap_or_default().to_string(), values);
                result
            }
        }
    }

    /// 挂载到新位置时更新名字与作用域，子节点随之递归更新。
    pub(crate) fn rescope(&mut self, name: &str, scope: &str) {
        match self {
            Node::Scalar(v) => v.rescope(name, scope),
            Node::Array(v) => v.rescope(name, scope),
            Node::Hash(v) => v.rescope(name, scope),
            Node::Upload(v) => v.rescope(name, scope),
            Node::Missing(_) => {}
        }
    }
}

impl From<HashValue> for Node {
    fn from(hash: HashValue) -> Self {
        Node::Hash(hash)
    }
}

impl From<SingleValue> for Node {
    fn from(value: SingleValue) -> Self {
        Node::Scalar(value)
    }
}

impl From<FileUpload> for Node {
    fn from(upload: FileUpload) -> Self {
        Node::Upload(upload)
    }
}

impl<'a> IntoIterator for &'a Node {
    type Item = &'a Node;
    type IntoIter = Box<dyn Iterator<Item = &'a Node> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// 非空且只含 ASCII 数字。
pub(crate) fn is_index(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

pub(crate) fn join_scope(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        [parent, ".", name].concat()
    }
}
