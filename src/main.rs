// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 请求值回显服务
//!
//! 基于 Tokio 运行时的多线程服务端。
//! 核心功能包括：
//! - 将查询字符串、表单正文与请求头解析为层级值树
//! - 可选的 HTTPS 强制跳转（支持反向代理的 X-Forwarded-* 头）
//! - 以 JSON 形式回显解析结果

use std::{
    net::{Ipv4Addr, SocketAddrV4},
    sync::Arc,
};

use log::{error, info, warn};
use tokio::{net::TcpListener, runtime::Builder};

use webvalue::{server, Config};

const LOG_CONFIG: &str = "config/log4rs.yaml";
const SERVER_CONFIG: &str = "config/development.toml";

/// # 程序入口点
///
/// 初始化日志、加载配置并启动主事件循环。
fn main() {
    // 1. 初始化日志系统：通过外部 YAML 配置级别与输出目的地
    if let Err(e) = log4rs::init_file(LOG_CONFIG, Default::default()) {
        eprintln!("无法初始化日志系统（{}）：{}", LOG_CONFIG, e);
    }

    // 2. 环境配置加载：从 TOML 文件读取运行参数，失败时使用默认值
    let config = match Config::from_toml(SERVER_CONFIG) {
        Ok(config) => {
            info!("配置文件已载入");
            config
        }
        Err(e) => {
            warn!("{}，将使用默认配置", e);
            Config::new()
        }
    };
    if config.force_ssl() {
        info!(
            "已启用HTTPS强制跳转，目标主机：{}，目标端口：{}",
            config.ssl_host().unwrap_or("<请求主机>"),
            config.ssl_port()
        );
    }

    // 3. 异步运行时定制：根据配置文件分配工作线程数
    let runtime = match Builder::new_multi_thread()
        .worker_threads(config.worker_threads())
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("无法创建异步运行时：{}", e);
            return;
        }
    };

    runtime.block_on(async move {
        // 4. 网络层初始化：支持全地址监听 (0.0.0.0) 或本地回环监听 (127.0.0.1)
        let port: u16 = config.port();
        let address = match config.local() {
            true => Ipv4Addr::new(127, 0, 0, 1),
            false => Ipv4Addr::new(0, 0, 0, 0),
        };
        info!("服务端将在{}:{}上监听Socket连接", address, port);
        let socket = SocketAddrV4::new(address, port);

        let listener = match TcpListener::bind(socket).await {
            Ok(listener) => listener,
            Err(e) => {
                error!("无法绑定端口：{}，错误：{}", port, e);
                return;
            }
        };
        info!("端口{}绑定完成", port);

        server::serve(listener, Arc::new(config)).await;
    });
}
