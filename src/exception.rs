// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # Exception 模块
//!
//! 该模块定义了请求处理生命周期中可能出现的各类异常情况。
//!
//! ## 设计意图
//! - **错误分类**：涵盖协议解析错误、请求值访问错误以及配置加载错误。
//! - **作用域信息**：值访问类错误携带从根节点出发的点分路径（scope），便于定位出错的参数。
//! - **serde 集成**：实现 `serde::de::Error`，类型转换时由反序列化器直接产生本类型的错误。

use std::fmt;

use thiserror::Error;

/// 服务器处理请求过程中发生的异常类型。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Exception {
    /// 客户端发送的请求字节流无法解析为合法的 UTF-8 字符串。
    #[error("Request bytes can't be parsed in UTF-8")]
    RequestIsNotUtf8,
    /// 客户端使用了服务器暂不支持的 HTTP 方法。
    #[error("Unsupported request method")]
    UnSupportedRequestMethod,
    /// 客户端使用了服务器不支持的 HTTP 协议版本。
    #[error("Unsupported HTTP version")]
    UnsupportedHttpVersion,
    /// 对缺失的值执行了终结性的取值操作。`scope` 为缺失节点的点分路径。
    #[error("Missing value: '{scope}'")]
    MissingValue { scope: String },
    /// 节点的形状或内容无法转换为目标类型。
    #[error("Cannot convert value: '{scope}', to: '{expected}'")]
    TypeMismatch { scope: String, expected: String },
    /// 找不到配置文件。
    #[error("Config file not found: {0}")]
    ConfigNotFound(String),
    /// 配置文件内容无法解析。
    #[error("Invalid config: {0}")]
    ConfigInvalid(String),
}

impl Exception {
    pub fn missing(scope: impl Into<String>) -> Self {
        Exception::MissingValue {
            scope: scope.into(),
        }
    }

    pub fn mismatch(scope: impl Into<String>, expected: impl Into<String>) -> Self {
        Exception::TypeMismatch {
            scope: scope.into(),
            expected: expected.into(),
        }
    }

    /// 出错节点的作用域路径（仅值访问类错误）。
    pub fn scope(&self) -> Option<&str> {
        match self {
            Exception::MissingValue { scope } | Exception::TypeMismatch { scope, .. } => {
                Some(scope)
            }
            _ => None,
        }
    }
}

/// 反序列化器内部产生的自定义错误没有节点信息，统一归为无作用域的类型不匹配，
/// 由上层在已知作用域时补全。
impl serde::de::Error for Exception {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Exception::mismatch("", msg.to_string())
    }

    fn missing_field(field: &'static str) -> Self {
        Exception::missing(field)
    }
}
