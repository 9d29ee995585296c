// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 异步服务端
//!
//! 基于 Tokio 的接收循环。每个连接读取一个请求，建立请求上下文与值树，
//! 按配置运行 HTTPS 跳转过滤器，最后把解析出的参数以 JSON 形式回显。

use std::sync::Arc;
use std::time::Instant;

use indexmap::IndexMap;
use log::{debug, error, info, warn};
use serde_json::{json, Value};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
};

use crate::config::Config;
use crate::context::{Context, RequestContext};
use crate::param::HttpRequestMethod;
use crate::request::Request;
use crate::response::Response;
use crate::ssl::{Before, Flow, SslHandler};

const READ_CHUNK: usize = 1024;

/// # 主事件循环 (Accept Loop)
///
/// 持续接收新连接并将其分发至 Tokio 任务进行异步处理。
pub async fn serve(listener: TcpListener, config: Arc<Config>) {
    let mut id: u128 = 0;
    loop {
        let (mut stream, addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                error!("接受连接时遇到错误：{}", e);
                continue;
            }
        };
        debug!("新的连接：{}", addr);

        let config = Arc::clone(&config);
        debug!("[ID{}]TCP连接已建立", id);

        tokio::spawn(async move {
            handle_connection(&mut stream, id, config).await;
        });
        id += 1; // 增加请求唯一标识序列
    }
}

/// # 连接处理器
///
/// 负责单个 TCP 流的生命周期，包括读取解析请求、执行过滤器、以及构建并发送响应。
pub async fn handle_connection(stream: &mut TcpStream, id: u128, config: Arc<Config>) {
    let buffer = match read_request(stream, id, config.max_request_size()).await {
        Ok(Some(buffer)) => buffer,
        Ok(None) => return, // 客户端主动关闭连接
        Err(response) => {
            let _ = stream.write_all(&response.as_bytes()).await;
            return;
        }
    };
    debug!("[ID{}]HTTP请求接收完毕", id);

    let start_time = Instant::now();

    // 1. 协议解析阶段：将字节流转换为结构化的 Request 对象
    let request = match Request::try_from(&buffer, id) {
        Ok(req) => req,
        Err(e) => {
            error!("[ID{}]解析HTTP请求失败: {}", id, e);
            let response = Response::from_status_code(400);
            let _ = stream.write_all(&response.as_bytes()).await;
            return;
        }
    };
    debug!("[ID{}]成功解析HTTP请求", id);

    // 2. 过滤与响应构建阶段
    let response = respond(&request, id, &config);

    debug!(
        "[ID{}]HTTP响应构建完成，服务端用时{}ms。",
        id,
        start_time.elapsed().as_millis()
    );

    // 3. 结构化日志记录
    info!(
        "[ID{}] {}, {}, {}, {}, {}, {}, ",
        id,
        request.version(),
        request.path(),
        request.method(),
        response.status_code(),
        response.information(),
        request.user_agent(),
    );

    // 4. 数据发送阶段
    let response_bytes = response.as_bytes();
    debug!("[ID{}]发送全量响应，长度: {}", id, response_bytes.len());
    if let Err(e) = stream.write_all(&response_bytes).await {
        error!("[ID{}]发送响应失败: {}", id, e);
        return;
    }
    let _ = stream.flush().await;
}

/// 为一个已解析的请求生成响应。
///
/// 开启 `force_ssl` 时先运行 `SslHandler`，被拦截的请求直接返回重定向；
/// 其余请求回显查询参数、表单字段与请求头。
pub fn respond(request: &Request, id: u128, config: &Config) -> Response {
    let mut ctx = RequestContext::new(id, request, config, false);

    let mut response = match before(&mut ctx, config) {
        Some(response) => response,
        None => {
            let body = json!({
                "path": ctx.request_path(),
                "query": multimap_to_json(ctx.query().to_multimap()),
                "form": multimap_to_json(ctx.form().to_multimap()),
                "headers": multimap_to_json(ctx.headers().to_multimap()),
            });
            Response::json(&body)
        }
    };

    response.set_version(*request.version());
    if request.method() == HttpRequestMethod::Head {
        response.strip_content();
    }
    response
}

fn before(ctx: &mut RequestContext<'_>, config: &Config) -> Option<Response> {
    if !config.force_ssl() {
        return None;
    }
    match SslHandler::from_config(config).apply(ctx) {
        Flow::Next => None,
        Flow::Halt => {
            let response = ctx.take_response();
            if response.is_none() {
                warn!("[ID{}]过滤器中止了请求但没有写入响应", ctx.id());
            }
            Some(response.unwrap_or_else(|| Response::from_status_code(500)))
        }
    }
}

fn multimap_to_json(map: IndexMap<String, Vec<String>>) -> Value {
    Value::Object(
        map.into_iter()
            .map(|(key, values)| (key, Value::from(values)))
            .collect(),
    )
}

/// 读取一个完整的请求：报文头以及 `Content-Length` 声明的请求体。
///
/// 连接在发送任何数据前关闭时返回 `Ok(None)`；请求超出大小限制时返回应答给客户端的错误响应。
async fn read_request(
    stream: &mut TcpStream,
    id: u128,
    max_request_size: usize,
) -> Result<Option<Vec<u8>>, Response> {
    let mut buffer = Vec::with_capacity(READ_CHUNK);
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        let n = match stream.read(&mut chunk).await {
            Ok(n) => n,
            Err(e) => {
                error!("[ID{}]读取TCPStream时遇到错误: {}", id, e);
                return Ok(None);
            }
        };
        if n == 0 {
            return Ok(if buffer.is_empty() { None } else { Some(buffer) });
        }
        buffer.extend_from_slice(&chunk[..n]);

        match Request::expected_length(&buffer) {
            Some(expected) if expected > max_request_size => {
                warn!("[ID{}]请求长度{}超过上限{}，返回413", id, expected, max_request_size);
                return Err(Response::from_status_code(413));
            }
            Some(expected) if buffer.len() >= expected => {
                buffer.truncate(expected);
                return Ok(Some(buffer));
            }
            None if buffer.len() > max_request_size => {
                warn!("[ID{}]请求头超过上限{}，返回413", id, max_request_size);
                return Err(Response::from_status_code(413));
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> Request {
        Request::try_from(raw.as_bytes(), 0).unwrap()
    }

    fn body(response: &Response) -> Value {
        serde_json::from_slice(response.content().unwrap()).unwrap()
    }

    #[test]
    fn test_echo() {
        let request = parse("GET /echo?user.name=edgar&ids=1&ids=2 HTTP/1.1\r\nHost: example.com\r\n\r\n");
        let response = respond(&request, 0, &Config::new());

        assert_eq!(response.status_code(), 200);
        let body = body(&response);
        assert_eq!(body["path"], "/echo");
        assert_eq!(body["query"]["user.name"], json!(["edgar"]));
        assert_eq!(body["query"]["ids"], json!(["1", "2"]));
        assert_eq!(body["headers"]["host"], json!(["example.com"]));
    }

    #[test]
    fn test_force_ssl_redirects() {
        let config = Config::parse("force_ssl = true").unwrap();
        let request = parse("GET /login?next=%2F HTTP/1.1\r\nHost: example.com:7878\r\n\r\n");
        let response = respond(&request, 0, &config);

        assert_eq!(response.status_code(), 302);
        assert_eq!(response.location(), Some("https://example.com/login?next=%2F"));
    }

    #[test]
    fn test_force_ssl_passes_forwarded_https() {
        let config = Config::parse("force_ssl = true\ntrust_proxy = true").unwrap();
        let request = parse("GET / HTTP/1.1\r\nHost: example.com\r\nX-Forwarded-Proto: https\r\n\r\n");
        let response = respond(&request, 0, &config);

        assert_eq!(response.status_code(), 200);
    }

    #[test]
    fn test_head_has_no_body() {
        let request = parse("HEAD /?a=1 HTTP/1.1\r\n\r\n");
        let response = respond(&request, 0, &Config::new());

        assert!(response.content().is_none());
        assert!(response.get_content_length() > 0);
    }

    #[test]
    fn test_multimap_to_json_keeps_order() {
        let mut map = IndexMap::new();
        map.insert("b".to_string(), vec!["1".to_string()]);
        map.insert("a".to_string(), vec![]);
        assert_eq!(multimap_to_json(map).to_string(), r#"{"b":["1"],"a":[]}"#);
    }
}
