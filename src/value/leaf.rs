// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! 值树的叶子节点：单值、多值数组、上传文件以及缺失值哨兵。

use bytes::Bytes;

use super::{join_scope, Node};

/// 单个已解码的字符串值。
#[derive(Debug, Clone, PartialEq)]
pub struct SingleValue {
    name: String,
    scope: String,
    value: String,
}

impl SingleValue {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            scope: name.clone(),
            name,
            value: value.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub(crate) fn rescope(&mut self, name: &str, scope: &str) {
        self.name = name.to_string();
        self.scope = scope.to_string();
    }
}

/// 同一键上多次写入形成的有序多值，元素顺序即写入顺序。
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayValue {
    name: String,
    scope: String,
    values: Vec<Node>,
}

impl ArrayValue {
    /// 元素保留数组的名字，作用域为 `<数组作用域>.<下标>`。
    pub(crate) fn promote(previous: Node, next: Node, name: &str, scope: &str) -> Self {
        let mut array = Self {
            name: name.to_string(),
            scope: scope.to_string(),
            values: Vec::with_capacity(2),
        };
        array.push(previous);
        array.push(next);
        array
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn values(&self) -> &[Node] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub(crate) fn push(&mut self, mut node: Node) {
        node.rescope(&self.name, &join_scope(&self.scope, &self.values.len().to_string()));
        self.values.push(node);
    }

    pub(crate) fn rescope(&mut self, name: &str, scope: &str) {
        self.name = name.to_string();
        self.scope = scope.to_string();
        for (i, value) in self.values.iter_mut().enumerate() {
            value.rescope(name, &join_scope(scope, &i.to_string()));
        }
    }
}

/// multipart 上传的文件。内容保存在内存中。
#[derive(Debug, Clone, PartialEq)]
pub struct FileUpload {
    name: String,
    scope: String,
    filename: String,
    content_type: Option<String>,
    content: Bytes,
}

impl FileUpload {
    pub fn new(
        name: impl Into<String>,
        filename: impl Into<String>,
        content_type: Option<&str>,
        content: Bytes,
    ) -> Self {
        let name = name.into();
        Self {
            scope: name.clone(),
            name,
            filename: filename.into(),
            content_type: content_type.map(str::to_string),
            content,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn content(&self) -> &Bytes {
        &self.content
    }

    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }

    pub(crate) fn rescope(&mut self, name: &str, scope: &str) {
        self.name = name.to_string();
        self.scope = scope.to_string();
    }
}

/// 查找失败时返回的哨兵，记录合成出来的作用域路径，直到终结性取值时才报错。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MissingValue {
    scope: String,
}

impl MissingValue {
    pub fn new(scope: impl Into<String>) -> Self {
        Self {
            scope: scope.into(),
        }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn child(&self, name: &str) -> Self {
        Self::new(join_scope(&self.scope, name))
    }
}
