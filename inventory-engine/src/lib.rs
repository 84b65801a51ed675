//! Inventory Engine - 产品组编辑、保存与合并
//!
//! # 架构概述
//!
//! 文档存储中的产品主数据按 group 组织：一个 product 文档 + 多个 variant /
//! inventory 文档。本 crate 负责在内存里编辑这些 group，并把变更规划成
//! 分块批量写入：
//!
//! - **草稿** (`draft`, `diff`): 可编辑副本与字段级 diff
//! - **保存** (`save`): 把 diff 变成有序的写操作（含 group id 变更）
//! - **合并** (`merge`, `conflict`): 冲突检测、解决与执行
//! - **写入** (`writer`): 分块、按 collection 顺序或并行提交
//! - **快照** (`catalog`, `refresh`): 写后按 id 整组刷新
//!
//! # 模块结构
//!
//! ```text
//! inventory-engine/src/
//! ├── core/          # 配置
//! ├── taxonomy/      # 分类词表与 label/id 解析
//! ├── merge/         # 合并状态机、候选、上下文
//! ├── utils/         # 日志
//! ├── engine.rs      # InventoryEngine facade
//! └── writer.rs      # 批量写入
//! ```

pub mod catalog;
pub mod conflict;
pub mod core;
pub mod diff;
pub mod draft;
pub mod engine;
pub mod merge;
pub mod records;
pub mod refresh;
pub mod save;
pub mod session;
pub mod taxonomy;
pub mod tokens;
pub mod utils;
pub mod writer;

// Re-export 公共类型
pub use catalog::{Catalog, CatalogQuery};
pub use core::Config;
pub use engine::{InventoryEngine, SaveOutcome};
pub use merge::{ConflictResolution, MergeContext, MergeOrchestrator, MergeOutcome, MergeState};
pub use refresh::{RefreshOutcome, SnapshotRefresher};
pub use session::EditSession;
pub use taxonomy::TaxonomyResolver;
pub use writer::{WriteOrchestrator, WriteReport};

// Re-export unified error types from shared
pub use shared::error::{AppError, AppResult, ErrorCategory, ErrorCode};

// Re-export logger functions
pub use utils::logger::{cleanup_old_logs, init_logger, init_logger_with_file};
