// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

#[cfg(test)]
mod integration_tests {
    //! # 端到端测试
    //!
    //! 在测试进程内启动服务端（监听随机端口），通过原始 TCP 报文验证：
    //! - 查询参数、表单与请求头的 JSON 回显
    //! - HTTPS 强制跳转的目标地址
    //! - 非法请求与超长请求的错误响应

    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::Value;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use webvalue::{server, Config};

    async fn start(config: Config) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(server::serve(listener, Arc::new(config)));
        addr
    }

    async fn send_request(addr: SocketAddr, request: &[u8]) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(request).await.unwrap();

        let mut buffer = Vec::new();
        // 设置硬超时限制，防止测试用例因服务器挂起而永久阻塞
        tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut buffer))
            .await
            .expect("server did not close the connection")
            .unwrap();
        String::from_utf8_lossy(&buffer).to_string()
    }

    /// 解析响应：状态码、头部与正文
    fn parse_response(response: &str) -> (u16, Vec<(String, String)>, String) {
        let (head, body) = response.split_once("\r\n\r\n").unwrap_or((response, ""));
        let mut lines = head.split("\r\n");

        let status_code = lines
            .next()
            .and_then(|line| line.split_whitespace().nth(1))
            .and_then(|code| code.parse().ok())
            .unwrap_or(0);

        let headers = lines
            .filter_map(|line| line.split_once(": "))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        (status_code, headers, body.to_string())
    }

    fn header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
        headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[tokio::test]
    async fn test_query_echo() {
        let addr = start(Config::new()).await;
        let response = send_request(
            addr,
            b"GET /search?user.name=edgar&user[age]=42&tag=a&tag=b HTTP/1.1\r\nHost: example.com\r\n\r\n",
        )
        .await;

        let (status_code, headers, body) = parse_response(&response);
        assert_eq!(status_code, 200);
        assert_eq!(
            header(&headers, "Content-Type"),
            Some("application/json;charset=utf-8")
        );
        assert_eq!(
            header(&headers, "Content-Length"),
            Some(body.len().to_string().as_str())
        );
        assert!(header(&headers, "Date").is_some());

        let json: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["path"], "/search");
        assert_eq!(json["query"]["user.name"][0], "edgar");
        assert_eq!(json["query"]["user.age"][0], "42");
        assert_eq!(json["query"]["tag"], serde_json::json!(["a", "b"]));
        assert_eq!(json["headers"]["host"][0], "example.com");
    }

    #[tokio::test]
    async fn test_form_echo() {
        let addr = start(Config::new()).await;
        let body = "items[1]=second&items[0]=first&note=hello+world";
        let request = format!(
            "POST /save HTTP/1.1\r\nHost: example.com\r\nContent-Type: application/x-www-form-urlencoded\r\nContent-Length: {}\r\n\r\n{}",
            body.len(),
            body
        );
        let response = send_request(addr, request.as_bytes()).await;

        let (status_code, _, body) = parse_response(&response);
        assert_eq!(status_code, 200);
        let json: Value = serde_json::from_str(&body).unwrap();
        let form = json["form"].as_object().unwrap();
        let keys: Vec<&str> = form.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["items.0", "items.1", "note"]);
        assert_eq!(form["note"][0], "hello world");
    }

    /// 场景：未指定主机时跳转到请求自身的主机
    #[tokio::test]
    async fn test_force_ssl_redirect() {
        let config = Config::parse("force_ssl = true").unwrap();
        let addr = start(config).await;
        let response = send_request(
            addr,
            b"GET /p?q=1 HTTP/1.1\r\nHost: example.com\r\n\r\n",
        )
        .await;

        let (status_code, headers, body) = parse_response(&response);
        assert_eq!(status_code, 302);
        assert_eq!(header(&headers, "Location"), Some("https://example.com/p?q=1"));
        assert!(body.is_empty());
    }

    /// 场景：localhost 使用服务端配置的 HTTPS 端口
    #[tokio::test]
    async fn test_force_ssl_localhost() {
        let config = Config::parse("force_ssl = true\nssl_host = \"localhost\"\nsecure_port = 8443").unwrap();
        let addr = start(config).await;
        let response = send_request(addr, b"GET /x HTTP/1.1\r\nHost: localhost\r\n\r\n").await;

        let (status_code, headers, _) = parse_response(&response);
        assert_eq!(status_code, 302);
        assert_eq!(header(&headers, "Location"), Some("https://localhost:8443/x"));
    }

    #[tokio::test]
    async fn test_force_ssl_behind_proxy() {
        let config = Config::parse("force_ssl = true\ntrust_proxy = true").unwrap();
        let addr = start(config).await;

        let response = send_request(
            addr,
            b"GET / HTTP/1.1\r\nHost: internal:8080\r\nX-Forwarded-Proto: https\r\n\r\n",
        )
        .await;
        assert_eq!(parse_response(&response).0, 200);

        let response = send_request(
            addr,
            b"GET /a HTTP/1.1\r\nHost: internal:8080\r\nX-Forwarded-Proto: http\r\nX-Forwarded-Host: example.com\r\n\r\n",
        )
        .await;
        let (status_code, headers, _) = parse_response(&response);
        assert_eq!(status_code, 302);
        assert_eq!(header(&headers, "Location"), Some("https://example.com/a"));
    }

    #[tokio::test]
    async fn test_bad_request() {
        let addr = start(Config::new()).await;
        let response = send_request(addr, b"BREW /pot HTTP/1.1\r\n\r\n").await;
        assert_eq!(parse_response(&response).0, 400);

        let response = send_request(addr, b"GET / HTTP/3\r\n\r\n").await;
        assert_eq!(parse_response(&response).0, 400);
    }

    #[tokio::test]
    async fn test_oversized_request() {
        let addr = start(Config::parse("max_request_size = 128").unwrap()).await;
        // 只发送报文头，服务端根据 Content-Length 即可拒绝
        let request = b"POST / HTTP/1.1\r\nContent-Type: application/x-www-form-urlencoded\r\nContent-Length: 4096\r\n\r\n";
        let response = send_request(addr, request).await;
        assert_eq!(parse_response(&response).0, 413);

        let request = format!("POST / HTTP/1.1\r\nContent-Length: {}\r\n\r\n", usize::MAX);
        let response = send_request(addr, request.as_bytes()).await;
        assert_eq!(parse_response(&response).0, 413);
    }

    #[tokio::test]
    async fn test_head_request() {
        let addr = start(Config::new()).await;
        let response = send_request(addr, b"HEAD /?a=1 HTTP/1.1\r\nHost: example.com\r\n\r\n").await;

        let (status_code, headers, body) = parse_response(&response);
        assert_eq!(status_code, 200);
        assert!(body.is_empty());
        assert_ne!(header(&headers, "Content-Length"), Some("0"));
    }
}
