// ==========================================
// 刺绣合同核算系统 - 机台分配与机台实绩数据仓储
// ==========================================
// 红线: 分配整体替换 (单事务先删后插)
// 红线: 机台实绩 machine_usage 与分配分表,替换分配不清空实绩
// ==========================================

use crate::domain::machine::{MachineAssignment, MachineUsage};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const ASSIGNMENT_COLUMNS: &str =
    "a.item_id, a.machine_id, a.assigned_stitches, a.avg_stitches_per_day, a.repeats, a.estimated_days";

fn map_assignment(row: &Row<'_>) -> SqliteResult<MachineAssignment> {
    Ok(MachineAssignment {
        item_id: row.get(0)?,
        machine_id: row.get(1)?,
        assigned_stitches: row.get(2)?,
        avg_stitches_per_day: row.get(3)?,
        repeats: row.get(4)?,
        estimated_days: row.get(5)?,
    })
}

fn map_usage(row: &Row<'_>) -> SqliteResult<MachineUsage> {
    Ok(MachineUsage {
        item_id: row.get(0)?,
        machine_id: row.get(1)?,
        used_stitches: row.get(2)?,
    })
}

// ==========================================
// AssignmentRepository - 机台分配仓储
// ==========================================
pub struct AssignmentRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AssignmentRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 整体替换明细的机台分配
    ///
    /// # 返回
    /// - Ok(count): 写入的分配条数
    pub fn replace_for_item(
        &self,
        item_id: &str,
        assignments: &[MachineAssignment],
    ) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            "DELETE FROM machine_assignment WHERE item_id = ?1",
            params![item_id],
        )?;

        let mut count = 0;
        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO machine_assignment (
                    item_id, machine_id, assigned_stitches,
                    avg_stitches_per_day, repeats, estimated_days
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )?;
            for a in assignments {
                stmt.execute(params![
                    item_id,
                    a.machine_id,
                    a.assigned_stitches,
                    a.avg_stitches_per_day,
                    a.repeats,
                    a.estimated_days,
                ])?;
                count += 1;
            }
        }

        tx.commit()?;
        Ok(count)
    }

    pub fn find_by_item(&self, item_id: &str) -> RepositoryResult<Vec<MachineAssignment>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM machine_assignment a WHERE a.item_id = ?1 ORDER BY a.machine_id",
            ASSIGNMENT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![item_id], map_assignment)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn find_by_item_and_machine(
        &self,
        item_id: &str,
        machine_id: &str,
    ) -> RepositoryResult<Option<MachineAssignment>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM machine_assignment a WHERE a.item_id = ?1 AND a.machine_id = ?2",
            ASSIGNMENT_COLUMNS
        );
        let row = conn
            .query_row(&sql, params![item_id, machine_id], map_assignment)
            .optional()?;
        Ok(row)
    }

    /// 合同下全部有效明细的分配
    pub fn find_by_contract(&self, contract_id: &str) -> RepositoryResult<Vec<MachineAssignment>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"
            SELECT {} FROM machine_assignment a
            JOIN contract_item i ON i.item_id = a.item_id
            WHERE i.contract_id = ?1 AND i.is_active = 1
            ORDER BY a.item_id, a.machine_id
            "#,
            ASSIGNMENT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![contract_id], map_assignment)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    // ==========================================
    // 机台实绩 (只读; 写入由 ProductionRepository 在事务内完成)
    // ==========================================

    pub fn usage_by_item(&self, item_id: &str) -> RepositoryResult<Vec<MachineUsage>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT item_id, machine_id, used_stitches FROM machine_usage WHERE item_id = ?1 ORDER BY machine_id",
        )?;
        let rows = stmt
            .query_map(params![item_id], map_usage)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// 单机台实绩 (无记录视为 0)
    pub fn usage_for(&self, item_id: &str, machine_id: &str) -> RepositoryResult<f64> {
        let conn = self.get_conn()?;
        let used: Option<f64> = conn
            .query_row(
                "SELECT used_stitches FROM machine_usage WHERE item_id = ?1 AND machine_id = ?2",
                params![item_id, machine_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(used.unwrap_or(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::contract::Contract;
    use crate::domain::contract_item::{ContractItem, RateInputs};
    use crate::domain::machine::Machine;
    use crate::repository::{ContractItemRepository, ContractRepository, MachineRepository};
    use chrono::NaiveDate;

    fn setup() -> (Arc<Mutex<Connection>>, ContractItem) {
        let conn = Arc::new(Mutex::new(crate::db::open_in_memory().unwrap()));
        let contract = Contract::new(
            "HT-1".to_string(),
            None,
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            None,
        );
        ContractRepository::new(conn.clone()).insert(&contract).unwrap();
        let item = ContractItem::new(contract.contract_id.clone(), RateInputs::default());
        ContractItemRepository::new(conn.clone()).insert(&item).unwrap();
        let machines = MachineRepository::new(conn.clone());
        for id in ["X", "Y", "Z"] {
            machines
                .upsert(&Machine {
                    machine_id: id.to_string(),
                    machine_name: id.to_string(),
                    is_active: true,
                })
                .unwrap();
        }
        (conn, item)
    }

    fn assignment(item_id: &str, machine_id: &str, assigned: f64) -> MachineAssignment {
        MachineAssignment {
            item_id: item_id.to_string(),
            machine_id: machine_id.to_string(),
            assigned_stitches: assigned,
            avg_stitches_per_day: 1_000.0,
            repeats: 0.0,
            estimated_days: (assigned / 1_000.0).ceil() as i64,
        }
    }

    #[test]
    fn test_replace_is_wholesale() {
        let (conn, item) = setup();
        let repo = AssignmentRepository::new(conn);

        repo.replace_for_item(
            &item.item_id,
            &[
                assignment(&item.item_id, "X", 30_000.0),
                assignment(&item.item_id, "Y", 20_000.0),
            ],
        )
        .unwrap();
        assert_eq!(repo.find_by_item(&item.item_id).unwrap().len(), 2);

        repo.replace_for_item(&item.item_id, &[assignment(&item.item_id, "Z", 5_000.0)])
            .unwrap();
        let rows = repo.find_by_item(&item.item_id).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].machine_id, "Z");
        assert!(repo
            .find_by_item_and_machine(&item.item_id, "X")
            .unwrap()
            .is_none());
        assert_eq!(repo.find_by_contract(&item.contract_id).unwrap().len(), 1);
    }

    #[test]
    fn test_failed_replace_keeps_previous_rows() {
        let (conn, item) = setup();
        let repo = AssignmentRepository::new(conn);
        repo.replace_for_item(&item.item_id, &[assignment(&item.item_id, "X", 1_000.0)])
            .unwrap();

        // 不存在的机台触发外键失败,整体回滚
        let err = repo
            .replace_for_item(
                &item.item_id,
                &[
                    assignment(&item.item_id, "Y", 1_000.0),
                    assignment(&item.item_id, "NOPE", 1_000.0),
                ],
            )
            .unwrap_err();
        assert!(matches!(err, RepositoryError::ForeignKeyViolation(_)));

        let rows = repo.find_by_item(&item.item_id).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].machine_id, "X");
    }

    #[test]
    fn test_usage_defaults_to_zero() {
        let (conn, item) = setup();
        let repo = AssignmentRepository::new(conn);
        assert_eq!(repo.usage_for(&item.item_id, "X").unwrap(), 0.0);
        assert!(repo.usage_by_item(&item.item_id).unwrap().is_empty());
    }
}
