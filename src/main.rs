// ==========================================
// 刺绣合同核算系统 - 命令行入口
// ==========================================
// 用法: embroidery-costing [数据库路径]
// 输出: 全部有效合同的综合报表 (JSON)
// ==========================================

use anyhow::{anyhow, Context};
use embroidery_costing::app::{get_default_db_path, AppState};
use embroidery_costing::logging;

fn main() -> anyhow::Result<()> {
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{}", embroidery_costing::APP_NAME);
    tracing::info!("系统版本: {}", embroidery_costing::VERSION);
    tracing::info!("==================================================");

    let db_path = std::env::args()
        .nth(1)
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(get_default_db_path);
    tracing::info!("使用数据库: {}", db_path);

    let state = AppState::new(db_path).map_err(|e| anyhow!(e))?;

    let today = chrono::Local::now().date_naive();
    let reports = state
        .progress_api
        .report_all(today)
        .context("生成合同报表失败")?;

    println!(
        "{}",
        serde_json::to_string_pretty(&reports).context("报表序列化失败")?
    );
    Ok(())
}
