// ==========================================
// 刺绣合同核算系统 - 合同数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑; 合同只软删除
// ==========================================

use crate::domain::contract::Contract;
use crate::domain::types::ContractStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const CONTRACT_COLUMNS: &str = r#"
    contract_id, contract_no, customer_name, start_date, delivery_date,
    status, is_active, created_at, updated_at
"#;

fn map_contract(row: &Row<'_>) -> SqliteResult<Contract> {
    Ok(Contract {
        contract_id: row.get(0)?,
        contract_no: row.get(1)?,
        customer_name: row.get(2)?,
        start_date: row.get(3)?,
        delivery_date: row.get(4)?,
        status: ContractStatus::from_str(&row.get::<_, String>(5)?),
        is_active: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

// ==========================================
// ContractRepository - 合同仓储
// ==========================================
pub struct ContractRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ContractRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入合同
    pub fn insert(&self, contract: &Contract) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO contract (
                contract_id, contract_no, customer_name, start_date, delivery_date,
                status, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                contract.contract_id,
                contract.contract_no,
                contract.customer_name,
                contract.start_date,
                contract.delivery_date,
                contract.status.to_string(),
                contract.is_active,
                contract.created_at,
                contract.updated_at,
            ],
        )?;
        Ok(())
    }

    /// 按ID查询
    pub fn find_by_id(&self, contract_id: &str) -> RepositoryResult<Option<Contract>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM contract WHERE contract_id = ?1", CONTRACT_COLUMNS);
        let contract = conn
            .query_row(&sql, params![contract_id], map_contract)
            .optional()?;
        Ok(contract)
    }

    /// 查询全部有效合同 (按开工日期)
    pub fn list_active(&self) -> RepositoryResult<Vec<Contract>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM contract WHERE is_active = 1 ORDER BY start_date, contract_no",
            CONTRACT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let contracts = stmt
            .query_map([], map_contract)?
            .collect::<SqliteResult<Vec<Contract>>>()?;
        Ok(contracts)
    }

    /// 更新合同头状态
    pub fn update_status(&self, contract_id: &str, status: ContractStatus) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE contract SET status = ?1, updated_at = ?2 WHERE contract_id = ?3",
            params![
                status.to_string(),
                chrono::Local::now().naive_local(),
                contract_id
            ],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("Contract", contract_id));
        }
        Ok(())
    }

    /// 软删除合同及其全部明细 (单事务)
    pub fn deactivate(&self, contract_id: &str) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let now = chrono::Local::now().naive_local();

        let affected = tx.execute(
            "UPDATE contract SET is_active = 0, updated_at = ?1 WHERE contract_id = ?2",
            params![now, contract_id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("Contract", contract_id));
        }
        tx.execute(
            "UPDATE contract_item SET is_active = 0, updated_at = ?1 WHERE contract_id = ?2",
            params![now, contract_id],
        )?;

        tx.commit()?;
        Ok(())
    }
}
