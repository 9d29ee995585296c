// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

use crate::param::*;

use bytes::Bytes;
use chrono::prelude::*;
use log::error;

#[derive(Debug, Clone)]
pub struct Response {
    version: HttpVersion,
    status_code: u16,
    information: String,
    content_type: Option<String>,
    content_length: u64,
    date: DateTime<Utc>,
    server_name: String,
    location: Option<String>,
    content: Option<Bytes>,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    pub fn new() -> Self {
        Self {
            version: HttpVersion::V1_1,
            status_code: 200,
            information: "OK".to_string(),
            content_type: None,
            content_length: 0,
            date: Utc::now(),
            server_name: SERVER_NAME.to_string(),
            location: None,
            content: None,
        }
    }

    /// `302 Found` 重定向，正文为空。
    pub fn redirect(location: &str) -> Self {
        let mut response = Self::new();
        response.set_code(302);
        response.location = Some(location.to_string());
        response
    }

    pub fn json(body: &serde_json::Value) -> Self {
        let mut response = Self::new();
        response.set_content("application/json;charset=utf-8", Bytes::from(body.to_string()));
        response
    }

    /// 以状态码和原因短语作为纯文本正文的错误响应。
    pub fn from_status_code(code: u16) -> Self {
        let mut response = Self::new();
        response.set_code(code);
        if code != 204 {
            let content = format!("{} {}", code, response.information);
            response.set_content("text/plain;charset=utf-8", Bytes::from(content));
        }
        response
    }

    pub fn set_version(&mut self, version: HttpVersion) -> &mut Self {
        self.version = version;
        self
    }

    /// HEAD 请求只保留响应头，`Content-Length` 仍然反映正文长度。
    pub fn strip_content(&mut self) -> &mut Self {
        self.content = None;
        self
    }

    fn set_content(&mut self, content_type: &str, content: Bytes) -> &mut Self {
        self.content_type = Some(content_type.to_string());
        self.content_length = content.len() as u64;
        self.content = Some(content);
        self
    }

    fn set_code(&mut self, code: u16) -> &mut Self {
        self.status_code = code;
        self.information = match STATUS_CODES.get(&code) {
            Some(&information) => information.to_string(),
            None => {
                error!("非法的状态码：{}。这条错误说明代码编写出现了错误。", code);
                "Unknown".to_string()
            }
        };
        self
    }

    pub fn as_bytes(&self) -> Vec<u8> {
        let version: &str = match self.version {
            HttpVersion::V1_0 => "HTTP/1.0",
            HttpVersion::V1_1 => "HTTP/1.1",
        };
        let status_code: &str = &self.status_code.to_string();
        let content_length: &str = &self.content_length.to_string();
        let date: &str = &format_date(&self.date);

        let header = [
            version,
            " ",
            status_code,
            " ",
            self.information.as_str(),
            CRLF,
            match &self.content_type {
                Some(t) => ["Content-Type: ", t, CRLF].concat(),
                None => "".to_string(),
            }
            .as_str(),
            match &self.location {
                Some(l) => ["Location: ", l, CRLF].concat(),
                None => "".to_string(),
            }
            .as_str(),
            "Content-Length: ",
            content_length,
            CRLF,
            "Date: ",
            date,
            CRLF,
            "Server: ",
            self.server_name.as_str(),
            CRLF,
            CRLF,
        ]
        .concat();
        [header.as_bytes(), self.content.as_deref().unwrap_or_default()].concat()
    }
}

impl Response {
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn information(&self) -> &str {
        &self.information
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn content(&self) -> Option<&Bytes> {
        self.content.as_ref()
    }

    pub fn get_content_length(&self) -> u64 {
        self.content_length
    }
}

fn format_date(date: &DateTime<Utc>) -> String {
    date.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
