use percent_encoding::percent_decode_str;

/// 解码 `application/x-www-form-urlencoded` 的一个分量：`+` 视为空格，`%XX` 按 UTF-8 还原，
/// 非法序列以替换字符代替。
pub fn decode_form_component(value: &str) -> String {
    if !value.contains(['+', '%']) {
        return value.to_string();
    }
    let spaced = value.replace('+', " ");
    percent_decode_str(&spaced).decode_utf8_lossy().into_owned()
}

/// 去掉 `host:port` 末尾的端口。只有冒号之后全是数字时才视为端口，
/// 因此 `[::1]` 这类 IPv6 字面量保持原样。
pub fn strip_port(host_and_port: &str) -> &str {
    match host_and_port.rfind(':') {
        Some(i) if i > 0 => {
            let port = &host_and_port[i + 1..];
            if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) {
                &host_and_port[..i]
            } else {
                host_and_port
            }
        }
        _ => host_and_port,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_plain() {
        assert_eq!(decode_form_component("edgar"), "edgar");
        assert_eq!(decode_form_component(""), "");
    }

    #[test]
    fn test_decode_plus_and_percent() {
        assert_eq!(decode_form_component("hello+world"), "hello world");
        assert_eq!(decode_form_component("a%2Bb"), "a+b");
        assert_eq!(decode_form_component("%E4%BD%A0%E5%A5%BD"), "你好");
    }

    #[test]
    fn test_decode_invalid_sequences() {
        assert_eq!(decode_form_component("100%"), "100%");
        assert_eq!(decode_form_component("%zz"), "%zz");
        assert_eq!(decode_form_component("%FF"), "\u{FFFD}");
    }

    #[test]
    fn test_strip_port() {
        assert_eq!(strip_port("example.com:8080"), "example.com");
        assert_eq!(strip_port("example.com"), "example.com");
        assert_eq!(strip_port("localhost:"), "localhost:");
        assert_eq!(strip_port("[::1]:8080"), "[::1]");
        assert_eq!(strip_port("[::1]"), "[::1]");
        assert_eq!(strip_port(":80"), ":80");
    }
}
