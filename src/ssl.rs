// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # HTTPS 强制跳转
//!
//! `SslHandler` 作为前置过滤器运行：非安全请求被重定向到对应的 `https://` 地址，
//! 安全请求原样放行。

use log::debug;

use crate::config::Config;
use crate::context::Context;
use crate::param::SECURE_PORT;
use crate::util::strip_port;

/// 前置过滤器执行后的去向。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// 继续执行后续的处理逻辑。
    Next,
    /// 过滤器已经写好响应，请求到此结束。
    Halt,
}

/// 在请求处理之前运行的过滤器。
pub trait Before {
    fn apply(&self, ctx: &mut dyn Context) -> Flow;
}

/// 把 http 请求重定向到 https。
///
/// - 未指定 `host` 时使用请求自身的主机名（去掉端口）。
/// - 主机名为 `localhost` 时使用服务端配置的 HTTPS 端口。
/// - 否则仅在端口大于 0 且不是 443 时把端口写进地址。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SslHandler {
    host: Option<String>,
    port: u16,
}

impl Default for SslHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl SslHandler {
    pub fn new() -> Self {
        Self::with_port(SECURE_PORT)
    }

    pub fn with_host(host: impl Into<String>) -> Self {
        Self::with_host_and_port(host, SECURE_PORT)
    }

    pub fn with_port(port: u16) -> Self {
        Self { host: None, port }
    }

    pub fn with_host_and_port(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: Some(host.into()),
            port,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        match config.ssl_host() {
            Some(host) => Self::with_host_and_port(host, config.ssl_port()),
            None => Self::with_port(config.ssl_port()),
        }
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    fn location(&self, ctx: &dyn Context) -> String {
        let host = match &self.host {
            Some(host) => host.clone(),
            None => strip_port(&ctx.host_and_port()).to_string(),
        };

        let mut location = String::from("https://");
        location.push_str(&host);
        if host == "localhost" {
            location.push(':');
            location.push_str(&ctx.secure_port().to_string());
        } else if self.port > 0 && self.port != SECURE_PORT {
            location.push(':');
            location.push_str(&self.port.to_string());
        }
        location.push_str(&ctx.request_path());
        location.push_str(&ctx.query_string());
        location
    }
}

impl Before for SslHandler {
    fn apply(&self, ctx: &mut dyn Context) -> Flow {
        if ctx.is_secure() {
            return Flow::Next;
        }
        let location = self.location(ctx);
        debug!("非安全请求，跳转到{}", location);
        ctx.send_redirect(&location);
        Flow::Halt
    }
}
