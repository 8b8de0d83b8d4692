// ==========================================
// 刺绣合同核算系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享连接、仓储与API实例
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::{AllocationApi, ClippingApi, ContractApi, ProductionApi, ProgressApi};
use crate::config::config_manager::ConfigManager;
use crate::db::{init_schema, open_sqlite_connection};
use crate::engine::RateCascade;
use crate::repository::{
    ActionLogRepository, AssignmentRepository, ClippingRepository, ContractItemRepository,
    ContractRepository, MachineRepository, ProductionRepository, VendorRepository,
};

/// 应用状态
///
/// 全部仓储共享同一个连接 (Arc<Mutex<Connection>>),
/// 每个写操作在该连接上开启单独事务
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 合同与明细计价API
    pub contract_api: Arc<ContractApi>,

    /// 机台分配API
    pub allocation_api: Arc<AllocationApi>,

    /// 生产录入API
    pub production_api: Arc<ProductionApi>,

    /// 外发剪花API
    pub clipping_api: Arc<ClippingApi>,

    /// 进度汇总API
    pub progress_api: Arc<ProgressApi>,

    /// 配置管理器 (费率参数)
    pub config_manager: Arc<ConfigManager>,

    /// 操作日志仓储 (审计追踪)
    pub action_log_repo: Arc<ActionLogRepository>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径 (不存在则创建并建表)
    ///
    /// # 返回
    /// - Err(String): 打开数据库/建表/读取配置失败
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        init_schema(&conn).map_err(|e| format!("建表失败: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 初始化Repository层
        // ==========================================
        let contract_repo = Arc::new(ContractRepository::new(conn.clone()));
        let item_repo = Arc::new(ContractItemRepository::new(conn.clone()));
        let machine_repo = Arc::new(MachineRepository::new(conn.clone()));
        let assignment_repo = Arc::new(AssignmentRepository::new(conn.clone()));
        let production_repo = Arc::new(ProductionRepository::new(conn.clone()));
        let vendor_repo = Arc::new(VendorRepository::new(conn.clone()));
        let clipping_repo = Arc::new(ClippingRepository::new(conn.clone()));
        let action_log_repo = Arc::new(ActionLogRepository::new(conn.clone()));

        // ==========================================
        // 初始化Engine层
        // ==========================================
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );
        let cascade_config = config_manager
            .load_rate_cascade_config()
            .map_err(|e| format!("无法读取费率配置: {}", e))?;
        let cascade = Arc::new(RateCascade::new(cascade_config));

        // ==========================================
        // 初始化API层
        // ==========================================
        let contract_api = Arc::new(ContractApi::new(
            contract_repo.clone(),
            item_repo.clone(),
            action_log_repo.clone(),
            cascade,
        ));
        let allocation_api = Arc::new(AllocationApi::new(
            item_repo.clone(),
            machine_repo.clone(),
            assignment_repo.clone(),
            action_log_repo.clone(),
        ));
        let production_api = Arc::new(ProductionApi::new(
            item_repo.clone(),
            machine_repo,
            assignment_repo.clone(),
            production_repo,
            action_log_repo.clone(),
        ));
        let clipping_api = Arc::new(ClippingApi::new(
            item_repo.clone(),
            vendor_repo,
            clipping_repo.clone(),
            action_log_repo.clone(),
        ));
        let progress_api = Arc::new(ProgressApi::new(
            contract_repo,
            item_repo,
            assignment_repo,
            clipping_repo,
        ));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            contract_api,
            allocation_api,
            production_api,
            clipping_api,
            progress_api,
            config_manager,
            action_log_repo,
        })
    }

    /// 获取数据库路径
    pub fn get_db_path(&self) -> &str {
        &self.db_path
    }
}

// ==========================================
// 默认数据库路径辅助函数
// ==========================================

/// 获取默认数据库路径
///
/// # 返回
/// - 环境变量 EMBROIDERY_COSTING_DB_PATH (非空时优先)
/// - 否则: 用户数据目录/embroidery-costing/embroidery_costing.db
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("EMBROIDERY_COSTING_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./embroidery_costing.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("embroidery-costing");
        // 目录创建失败时回退到当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("embroidery_costing.db");
        }
    }

    path.to_string_lossy().to_string()
}
