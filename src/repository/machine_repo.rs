// ==========================================
// 刺绣合同核算系统 - 机台数据仓储
// ==========================================

use crate::domain::machine::Machine;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

fn map_machine(row: &Row<'_>) -> SqliteResult<Machine> {
    Ok(Machine {
        machine_id: row.get(0)?,
        machine_name: row.get(1)?,
        is_active: row.get(2)?,
    })
}

// ==========================================
// MachineRepository - 机台仓储
// ==========================================
pub struct MachineRepository {
    conn: Arc<Mutex<Connection>>,
}

impl MachineRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 新增或更新机台
    pub fn upsert(&self, machine: &Machine) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO machine (machine_id, machine_name, is_active)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(machine_id) DO UPDATE SET
                machine_name = excluded.machine_name,
                is_active = excluded.is_active
            "#,
            params![machine.machine_id, machine.machine_name, machine.is_active],
        )?;
        Ok(())
    }

    pub fn find_by_id(&self, machine_id: &str) -> RepositoryResult<Option<Machine>> {
        let conn = self.get_conn()?;
        let machine = conn
            .query_row(
                "SELECT machine_id, machine_name, is_active FROM machine WHERE machine_id = ?1",
                params![machine_id],
                map_machine,
            )
            .optional()?;
        Ok(machine)
    }

    /// 批量查询 (不存在的ID不出现在结果中)
    pub fn find_by_ids(&self, machine_ids: &[String]) -> RepositoryResult<Vec<Machine>> {
        if machine_ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.get_conn()?;
        let placeholders = vec!["?"; machine_ids.len()].join(", ");
        let sql = format!(
            "SELECT machine_id, machine_name, is_active FROM machine WHERE machine_id IN ({}) ORDER BY machine_id",
            placeholders
        );
        let mut stmt = conn.prepare(&sql)?;
        let machines = stmt
            .query_map(rusqlite::params_from_iter(machine_ids.iter()), map_machine)?
            .collect::<SqliteResult<Vec<Machine>>>()?;
        Ok(machines)
    }

    pub fn list_active(&self) -> RepositoryResult<Vec<Machine>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT machine_id, machine_name, is_active FROM machine WHERE is_active = 1 ORDER BY machine_id",
        )?;
        let machines = stmt
            .query_map([], map_machine)?
            .collect::<SqliteResult<Vec<Machine>>>()?;
        Ok(machines)
    }

    /// 启用/停用机台
    pub fn set_active(&self, machine_id: &str, is_active: bool) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE machine SET is_active = ?1 WHERE machine_id = ?2",
            params![is_active, machine_id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("Machine", machine_id));
        }
        Ok(())
    }
}
