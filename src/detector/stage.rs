//! 检测阶段执行结果
//! 单个阶段失败不终止整次检测，由运行级汇总继续后续阶段

use serde::Serialize;

use crate::rule::Stage;

/// 阶段状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// 全部规则组执行成功
    Success,
    /// 部分规则组失败
    Partial,
    /// 所有执行的规则组均失败
    Failed,
    /// 依赖的数据缺失（如文档树），整体跳过
    Skipped,
}

/// 单个阶段的执行报告
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageReport {
    pub stage: Stage,
    pub status: StageStatus,
    /// 命中的规则数
    pub matched: usize,
    pub groups_run: usize,
    pub groups_skipped: usize,
    pub errors: Vec<String>,
}

impl StageReport {
    pub(crate) fn new(
        stage: Stage,
        matched: usize,
        groups_run: usize,
        groups_skipped: usize,
        errors: Vec<String>,
    ) -> Self {
        let status = match (errors.is_empty(), groups_run > 0) {
            (true, true) => StageStatus::Success,
            (true, false) if groups_skipped > 0 => StageStatus::Skipped,
            (true, false) => StageStatus::Success,
            (false, true) => StageStatus::Partial,
            (false, false) => StageStatus::Failed,
        };
        Self {
            stage,
            status,
            matched,
            groups_run,
            groups_skipped,
            errors,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.status, StageStatus::Failed | StageStatus::Partial)
    }
}
