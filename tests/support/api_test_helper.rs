// ==========================================
// API 测试辅助
// ==========================================
// 职责: 基于临时数据库文件组装 AppState,提供常用种子数据
// ==========================================

#![allow(dead_code)]

use embroidery_costing::api::{ItemDetails, RawAssignment, RawEntry, RawRateInputs};
use embroidery_costing::app::AppState;
use embroidery_costing::domain::{CommonFieldsLock, Contract, ContractItem, ProductionEntry, Vendor};
use rusqlite::Connection;
use tempfile::NamedTempFile;

pub const OPERATOR: &str = "tester";

/// API 测试环境
///
/// 临时文件需与 AppState 同生命周期
pub struct ApiTestEnv {
    _temp_file: NamedTempFile,
    pub db_path: String,
    pub state: AppState,
}

impl ApiTestEnv {
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let temp_file = NamedTempFile::new()?;
        let db_path = temp_file.path().to_string_lossy().to_string();
        let state = AppState::new(db_path.clone())?;
        Ok(Self {
            _temp_file: temp_file,
            db_path,
            state,
        })
    }

    /// 旁路连接 (模拟外部篡改/直接核对)
    pub fn raw_conn(&self) -> Connection {
        Connection::open(&self.db_path).expect("无法打开旁路连接")
    }

    pub fn contract(&self, contract_no: &str, start_date: &str) -> Contract {
        self.state
            .contract_api
            .create_contract(contract_no, None, start_date, None, OPERATOR)
            .expect("创建合同失败")
    }

    /// 新增明细: S=stitch_per_repeat, R=repeat_count
    pub fn item(&self, contract_id: &str, stitch_per_repeat: f64, repeat_count: f64) -> ContractItem {
        self.state
            .contract_api
            .add_item(
                contract_id,
                &ItemDetails::default(),
                &rate_inputs(stitch_per_repeat, repeat_count),
                &CommonFieldsLock::Unlocked,
                OPERATOR,
            )
            .expect("新增明细失败")
    }

    pub fn machine(&self, machine_id: &str) {
        self.state
            .allocation_api
            .register_machine(machine_id, "", OPERATOR)
            .expect("登记机台失败");
    }

    /// 分配: (机台, 分配针数, 日均针数)
    pub fn assign(&self, item_id: &str, rows: &[(&str, f64, f64)]) {
        let raw: Vec<RawAssignment> = rows
            .iter()
            .map(|(machine_id, assigned, avg)| assignment(machine_id, *assigned, *avg))
            .collect();
        self.state
            .allocation_api
            .save_assignments(item_id, &raw, OPERATOR)
            .expect("保存分配失败");
    }

    pub fn record(&self, item_id: &str, machine_id: &str, stitches: f64) -> ProductionEntry {
        self.state
            .production_api
            .record_entry(&entry(item_id, machine_id, "2026-01-02", stitches), OPERATOR)
            .expect("录入生产记录失败")
            .value
    }

    pub fn vendor(&self, name: &str) -> Vendor {
        self.state
            .clipping_api
            .create_vendor(name, None, OPERATOR)
            .expect("新增外发商失败")
    }
}

pub fn rate_inputs(stitch_per_repeat: f64, repeat_count: f64) -> RawRateInputs {
    RawRateInputs {
        stitch_per_repeat: Some(stitch_per_repeat.to_string()),
        rate_per_stitch: Some("0.05".to_string()),
        cost_factor: Some("10.11".to_string()),
        repeat_count: Some(repeat_count.to_string()),
        piece_count: Some("24".to_string()),
        ..Default::default()
    }
}

pub fn assignment(machine_id: &str, assigned: f64, avg: f64) -> RawAssignment {
    RawAssignment {
        machine_id: machine_id.to_string(),
        assigned_stitches: assigned.to_string(),
        avg_stitches_per_day: avg.to_string(),
        repeats: String::new(),
    }
}

pub fn entry(item_id: &str, machine_id: &str, date: &str, stitches: f64) -> RawEntry {
    RawEntry {
        item_id: item_id.to_string(),
        machine_id: machine_id.to_string(),
        entry_date: date.to_string(),
        shift: "DAY".to_string(),
        stitches: stitches.to_string(),
        repeats: "0".to_string(),
        operator_name: None,
    }
}
