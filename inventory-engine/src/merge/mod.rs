//! MergeOrchestrator
//!
//! 两个同名商品组的合并流程：
//! - [`candidates`] - 候选查找与最佳目标选择
//! - [`context`] - MergeContext、冲突解决策略、合并操作序列
//! - [`state`] - 状态机
//! - [`orchestrator`] - 执行、强制删除、取消

pub mod candidates;
pub mod context;
pub mod orchestrator;
pub mod state;

pub use candidates::{find_merge_candidates, select_best_merge_target, suggest_merge};
pub use context::{ConflictResolution, MergeContext, ResolvedConflict};
pub use orchestrator::{MergeOrchestrator, MergeOutcome, execute_merge, force_delete_variant};
pub use state::MergeState;
