//! inventory-replay - 把一份 PendingOperation 列表重放到远端文档库
//!
//! ```text
//! inventory-replay <ops.json>         # 写入并打印 WriteReport
//! inventory-replay --list [search]    # 打印 catalog 查询结果
//! ```

use anyhow::Context;
use inventory_engine::{
    CatalogQuery, Config, InventoryEngine, cleanup_old_logs, init_logger, init_logger_with_file,
};
use shared::store::PendingOperation;
use std::path::Path;

fn setup_logging(config: &Config) -> anyhow::Result<()> {
    match config.log_dir.as_deref() {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir))?;
            init_logger_with_file(&config.log_level, config.log_json, Some(dir))?;
            let removed = cleanup_old_logs(Path::new(dir))?;
            if removed > 0 {
                tracing::info!(removed, "Old log files removed");
            }
        }
        None => init_logger(&config.log_level, config.log_json)?,
    }
    Ok(())
}

fn load_operations(path: &str) -> anyhow::Result<Vec<PendingOperation>> {
    let raw = std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?;
    let operations: Vec<PendingOperation> =
        serde_json::from_str(&raw).with_context(|| format!("Invalid operation list in {}", path))?;
    for op in &operations {
        op.validate()?;
    }
    Ok(operations)
}

async fn replay(engine: &InventoryEngine, path: &str) -> anyhow::Result<bool> {
    let operations = load_operations(path)?;
    tracing::info!(path = %path, operations = operations.len(), "Replaying operations");

    let report = engine.writer().execute(&operations).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.is_success() {
        tracing::error!(failures = %report.failure_summary(), "Replay finished with failures");
    }
    Ok(report.is_success())
}

async fn list(engine: &InventoryEngine, search: Option<String>) -> anyhow::Result<()> {
    engine.load_catalog().await?;
    let query = CatalogQuery {
        search,
        ..Default::default()
    };
    let groups = engine.query(&query);
    println!("{}", serde_json::to_string_pretty(&groups)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. 环境变量与配置
    dotenv::dotenv().ok();
    let config = Config::from_env();

    // 2. 日志
    setup_logging(&config)?;

    let mut args = std::env::args().skip(1);
    let Some(first) = args.next() else {
        anyhow::bail!("usage: inventory-replay <ops.json> | --list [search]");
    };

    // 3. 引擎 (HTTP 文档库)
    let engine = InventoryEngine::from_config(&config)?;
    tracing::info!(
        store = %config.store_base_url,
        chunk_size = config.write_chunk_size,
        parallel = config.parallel_collections,
        "inventory-replay starting"
    );

    if first == "--list" {
        return list(&engine, args.next()).await;
    }

    if !replay(&engine, &first).await? {
        std::process::exit(1);
    }
    Ok(())
}
