// ==========================================
// 刺绣合同核算系统 - 操作日志记录
// ==========================================
// 业务写入已提交后才记录日志: 日志失败只告警,不改变操作结果
// ==========================================

use tracing::warn;

use crate::domain::action_log::ActionLog;
use crate::repository::ActionLogRepository;

/// 记录操作日志 (失败时只记录警告)
pub(crate) fn record(repo: &ActionLogRepository, log: ActionLog) {
    if let Err(e) = repo.insert(&log) {
        warn!(
            error = %e,
            action_type = %log.action_type,
            contract_id = ?log.contract_id,
            item_id = ?log.item_id,
            "记录操作日志失败"
        );
    }
}
