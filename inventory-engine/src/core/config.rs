use inventory_client::ClientConfig;

use crate::writer::DEFAULT_CHUNK_SIZE;

/// 引擎配置 - 远端文档库与写入调度的所有配置项
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | STORE_BASE_URL | http://localhost:3000 | 远端文档库地址 |
/// | STORE_TOKEN | (无) | Bearer token |
/// | REQUEST_TIMEOUT_SECS | 30 | 请求超时(秒) |
/// | WRITE_CHUNK_SIZE | 100 | 每个 chunk 的文档数 |
/// | PARALLEL_COLLECTIONS | false | 不同集合之间并发发送 |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_JSON | false | JSON 日志格式 |
/// | LOG_DIR | (无) | 文件日志目录 |
/// | ENVIRONMENT | development | 运行环境 |
///
/// # 示例
///
/// ```ignore
/// STORE_BASE_URL=https://admin.example.com WRITE_CHUNK_SIZE=50 inventory-replay ops.json
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 远端文档库 base URL
    pub store_base_url: String,
    /// Bearer token
    pub store_token: Option<String>,
    /// 请求超时时间 (秒)
    pub request_timeout_secs: u64,
    /// 每个 chunk 的操作数 (远端 payload 上限)
    pub write_chunk_size: usize,
    /// 是否在不同集合之间并发发送 chunk (同一集合内始终顺序)
    pub parallel_collections: bool,
    /// 日志级别
    pub log_level: String,
    /// 是否输出 JSON 日志
    pub log_json: bool,
    /// 文件日志目录
    pub log_dir: Option<String>,
    /// 运行环境: development | staging | production
    pub environment: String,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置，使用默认值
    pub fn from_env() -> Self {
        Self {
            store_base_url: std::env::var("STORE_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".into()),
            store_token: std::env::var("STORE_TOKEN")
                .ok()
                .filter(|t| !t.trim().is_empty()),
            request_timeout_secs: std::env::var("REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(30),
            write_chunk_size: std::env::var("WRITE_CHUNK_SIZE")
                .ok()
                .and_then(|p| p.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(DEFAULT_CHUNK_SIZE),
            parallel_collections: std::env::var("PARALLEL_COLLECTIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_json: std::env::var("LOG_JSON")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(false),
            log_dir: std::env::var("LOG_DIR").ok().filter(|d| !d.trim().is_empty()),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
        }
    }

    /// 使用自定义 store 地址覆盖配置
    ///
    /// 常用于测试场景
    pub fn with_overrides(store_base_url: impl Into<String>, write_chunk_size: usize) -> Self {
        let mut config = Self::from_env();
        config.store_base_url = store_base_url.into();
        config.write_chunk_size = write_chunk_size;
        config
    }

    /// 构建客户端配置
    pub fn client_config(&self) -> ClientConfig {
        let config = ClientConfig::new(&self.store_base_url).with_timeout(self.request_timeout_secs);
        match &self.store_token {
            Some(token) => config.with_token(token),
            None => config,
        }
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// 是否开发环境
    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_and_client_config() {
        let config = Config::with_overrides("http://store.test", 25);
        assert_eq!(config.write_chunk_size, 25);

        let client = config.client_config();
        assert_eq!(client.base_url, "http://store.test");
        assert_eq!(client.timeout, config.request_timeout_secs);
    }

    #[test]
    fn test_environment_flags() {
        let mut config = Config::with_overrides("http://x", 100);
        config.environment = "production".to_string();
        assert!(config.is_production());
        assert!(!config.is_development());
    }
}
