use num_cpus;
use serde_derive::Deserialize;

use log::{error, warn};
use std::fs::File;
use std::io::prelude::*;

use crate::exception::Exception;
use crate::param::SECURE_PORT;

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default = "default_secure_port")]
    secure_port: u16,
    #[serde(default = "default_local")]
    local: bool,
    #[serde(default)]
    worker_threads: usize,
    // 位于反向代理之后时信任 X-Forwarded-* 头
    #[serde(default)]
    trust_proxy: bool,
    #[serde(default)]
    force_ssl: bool,
    #[serde(default)]
    ssl_host: Option<String>,
    #[serde(default = "default_ssl_port")]
    ssl_port: u16,
    #[serde(default = "default_max_request_size")]
    max_request_size: usize,
}

fn default_port() -> u16 {
    7878
}

fn default_secure_port() -> u16 {
    8443
}

fn default_local() -> bool {
    true
}

fn default_ssl_port() -> u16 {
    SECURE_PORT
}

fn default_max_request_size() -> usize {
    65536 // 64KB
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            port: default_port(),
            secure_port: default_secure_port(),
            local: default_local(),
            worker_threads: num_cpus::get(),
            trust_proxy: false,
            force_ssl: false,
            ssl_host: None,
            ssl_port: default_ssl_port(),
            max_request_size: default_max_request_size(),
        }
    }

    pub fn from_toml(filename: &str) -> Result<Self, Exception> {
        let mut file = File::open(filename).map_err(|e| {
            error!("无法打开配置文件{}：{}", filename, e);
            Exception::ConfigNotFound(filename.to_string())
        })?;
        let mut str_val = String::new();
        file.read_to_string(&mut str_val)
            .map_err(|e| Exception::ConfigInvalid(format!("{}: {}", filename, e)))?;
        Self::parse(&str_val)
    }

    pub fn parse(text: &str) -> Result<Self, Exception> {
        let mut raw_config: Config =
            toml::from_str(text).map_err(|e| Exception::ConfigInvalid(e.to_string()))?;
        if raw_config.worker_threads == 0 {
            raw_config.worker_threads = num_cpus::get();
        }
        if raw_config.max_request_size == 0 {
            warn!("max_request_size被设置为0，将使用默认值{}", default_max_request_size());
            raw_config.max_request_size = default_max_request_size();
        }
        Ok(raw_config)
    }
}

impl Config {
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn secure_port(&self) -> u16 {
        self.secure_port
    }

    pub fn local(&self) -> bool {
        self.local
    }

    pub fn worker_threads(&self) -> usize {
        self.worker_threads
    }

    pub fn trust_proxy(&self) -> bool {
        self.trust_proxy
    }

    pub fn force_ssl(&self) -> bool {
        self.force_ssl
    }

    pub fn ssl_host(&self) -> Option<&str> {
        self.ssl_host.as_deref()
    }

    pub fn ssl_port(&self) -> u16 {
        self.ssl_port
    }

    pub fn max_request_size(&self) -> usize {
        self.max_request_size
    }
}
