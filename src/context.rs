// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 请求上下文
//!
//! 过滤器与处理逻辑通过 `Context` 读取请求的安全属性、主机与路径，并写回响应。
//! `RequestContext` 是服务端使用的实现，同时把查询字符串、表单正文与请求头解析为值树。

use log::debug;
use serde::de::DeserializeOwned;

use crate::config::Config;
use crate::exception::Exception;
use crate::request::Request;
use crate::response::Response;
use crate::value::{HashValue, Node, NodeRef};

const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// 过滤器看到的请求上下文。
pub trait Context {
    /// 连接本身是 TLS，或受信任的代理声明原始请求是 https。
    fn is_secure(&self) -> bool;

    /// 客户端请求的 `host[:port]`。
    fn host_and_port(&self) -> String;

    /// 不含查询字符串的请求路径。
    fn request_path(&self) -> String;

    /// 带前导 `?` 的查询字符串，没有时为空串。
    fn query_string(&self) -> String;

    /// 服务端配置的 HTTPS 端口。
    fn secure_port(&self) -> u16;

    /// 以 `302 Found` 响应结束本次请求。
    fn send_redirect(&mut self, location: &str);
}

pub struct RequestContext<'a> {
    id: u128,
    request: &'a Request,
    config: &'a Config,
    secure: bool,
    response: Option<Response>,
    query: HashValue,
    form: HashValue,
    headers: HashValue,
}

impl<'a> RequestContext<'a> {
    /// `secure` 表示连接是否经过 TLS。
    pub fn new(id: u128, request: &'a Request, config: &'a Config, secure: bool) -> Self {
        let query = HashValue::from_urlencoded(request.query_string());

        let form = match request.content_type() {
            Some(content_type) if content_type.starts_with(FORM_URLENCODED) => {
                HashValue::from_urlencoded(&String::from_utf8_lossy(request.body()))
            }
            _ => HashValue::new(),
        };

        let mut headers = HashValue::new();
        headers.put_map(
            request
                .headers()
                .iter()
                .map(|(name, value)| (name.to_ascii_lowercase(), [value.as_str()])),
        );

        debug!(
            "[ID{}]请求值树已建立：查询参数{}个，表单字段{}个，请求头{}个",
            id,
            query.size(),
            form.size(),
            headers.size()
        );

        Self {
            id,
            request,
            config,
            secure,
            response: None,
            query,
            form,
            headers,
        }
    }

    pub fn id(&self) -> u128 {
        self.id
    }

    pub fn request(&self) -> &Request {
        self.request
    }

    pub fn query(&self) -> &HashValue {
        &self.query
    }

    pub fn form(&self) -> &HashValue {
        &self.form
    }

    /// 请求头值树，字段名统一为小写，重复的请求头提升为数组。
    pub fn headers(&self) -> &HashValue {
        &self.headers
    }

    /// 先查查询参数，找不到时再查表单字段。
    pub fn param(&self, name: &str) -> NodeRef<'_> {
        let node = self.query.get(name);
        if node.is_missing() {
            self.form.get(name)
        } else {
            node
        }
    }

    pub fn convert<T: DeserializeOwned>(&self, node: &Node) -> Result<T, Exception> {
        node.to()
    }

    pub fn response(&self) -> Option<&Response> {
        self.response.as_ref()
    }

    pub fn take_response(&mut self) -> Option<Response> {
        self.response.take()
    }

    fn forwarded(&self, name: &str) -> Option<&str> {
        if !self.config.trust_proxy() {
            return None;
        }
        self.request
            .header(name)
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

impl Context for RequestContext<'_> {
    fn is_secure(&self) -> bool {
        self.secure
            || self
                .forwarded("X-Forwarded-Proto")
                .map_or(false, |proto| proto.eq_ignore_ascii_case("https"))
    }

    fn host_and_port(&self) -> String {
        match self
            .forwarded("X-Forwarded-Host")
            .or_else(|| self.request.header("Host"))
        {
            Some(host) => host.to_string(),
            None => format!("localhost:{}", self.config.port()),
        }
    }

    fn request_path(&self) -> String {
        self.request.request_path().to_string()
    }

    fn query_string(&self) -> String {
        self.request.query_string().to_string()
    }

    fn secure_port(&self) -> u16 {
        self.config.secure_port()
    }

    fn send_redirect(&mut self, location: &str) {
        debug!("[ID{}]重定向至：{}", self.id, location);
        self.response = Some(Response::redirect(location));
    }
}
