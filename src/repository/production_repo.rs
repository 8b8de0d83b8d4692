// ==========================================
// 刺绣合同核算系统 - 生产记录数据仓储
// ==========================================
// 红线: 记录写入与累计增量在同一事务内完成
// 红线: 累计只用 col = col + ? 原子累加,不做读-改-写
// 红线: 修改记录使用乐观校验,原记录已变化返回 VersionConflict
// ==========================================

use crate::domain::production::{DailyProduction, ProductionEntry};
use crate::domain::types::Shift;
use crate::engine::consumption::{EntryDelta, EntryTally};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row, Transaction};
use std::sync::{Arc, Mutex};

const ENTRY_COLUMNS: &str = r#"
    entry_id, item_id, machine_id, entry_date, shift,
    stitches, repeats, operator_name, created_at, updated_at
"#;

fn map_entry(row: &Row<'_>) -> SqliteResult<ProductionEntry> {
    let shift_str: String = row.get(4)?;
    let shift = Shift::parse(&shift_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            rusqlite::types::Type::Text,
            Box::new(RepositoryError::InternalError(format!("未知班次: {}", shift_str))),
        )
    })?;

    Ok(ProductionEntry {
        entry_id: row.get(0)?,
        item_id: row.get(1)?,
        machine_id: row.get(2)?,
        entry_date: row.get(3)?,
        shift,
        stitches: row.get(5)?,
        repeats: row.get(6)?,
        operator_name: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

/// 在事务内应用累计增量
fn apply_delta(tx: &Transaction<'_>, delta: &EntryDelta) -> RepositoryResult<()> {
    let affected = tx.execute(
        r#"
        UPDATE contract_item
        SET used_stitches = used_stitches + ?1,
            used_repeats = used_repeats + ?2
        WHERE item_id = ?3 AND is_active = 1
        "#,
        params![delta.item_stitches, delta.item_repeats, delta.item_id],
    )?;
    if affected == 0 {
        return Err(RepositoryError::BusinessRuleViolation(format!(
            "明细不存在或已停用: {}",
            delta.item_id
        )));
    }

    for (machine_id, stitches) in &delta.machine_stitches {
        tx.execute(
            r#"
            INSERT INTO machine_usage (item_id, machine_id, used_stitches)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(item_id, machine_id) DO UPDATE SET
                used_stitches = used_stitches + excluded.used_stitches
            "#,
            params![delta.item_id, machine_id, stitches],
        )?;
    }
    Ok(())
}

// ==========================================
// ProductionRepository - 生产记录仓储
// ==========================================
pub struct ProductionRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ProductionRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 新增记录并累加 (单事务)
    pub fn record(&self, entry: &ProductionEntry, delta: &EntryDelta) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            r#"
            INSERT INTO production_entry (
                entry_id, item_id, machine_id, entry_date, shift,
                stitches, repeats, operator_name, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                entry.entry_id,
                entry.item_id,
                entry.machine_id,
                entry.entry_date,
                entry.shift.to_string(),
                entry.stitches,
                entry.repeats,
                entry.operator_name,
                entry.created_at,
                entry.updated_at,
            ],
        )?;
        apply_delta(&tx, delta)?;

        tx.commit()?;
        Ok(())
    }

    /// 修改记录: 冲销旧贡献 + 计入新贡献 (单事务)
    ///
    /// # 参数
    /// - `expected`: 读取时的原记录,用于乐观校验
    /// - `revised`: 修改后的记录
    /// - `delta`: EntryDelta::between(expected, revised)
    pub fn revise(
        &self,
        expected: &ProductionEntry,
        revised: &ProductionEntry,
        delta: &EntryDelta,
    ) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let affected = tx.execute(
            r#"
            UPDATE production_entry SET
                machine_id = ?1, entry_date = ?2, shift = ?3,
                stitches = ?4, repeats = ?5, operator_name = ?6, updated_at = ?7
            WHERE entry_id = ?8
              AND machine_id = ?9 AND stitches = ?10 AND repeats = ?11
              AND updated_at = ?12
            "#,
            params![
                revised.machine_id,
                revised.entry_date,
                revised.shift.to_string(),
                revised.stitches,
                revised.repeats,
                revised.operator_name,
                revised.updated_at,
                expected.entry_id,
                expected.machine_id,
                expected.stitches,
                expected.repeats,
                expected.updated_at,
            ],
        )?;
        if affected == 0 {
            return Err(RepositoryError::VersionConflict {
                message: format!("生产记录已被修改或不存在: {}", expected.entry_id),
            });
        }

        if !delta.is_zero() {
            apply_delta(&tx, delta)?;
        }

        tx.commit()?;
        Ok(())
    }

    pub fn find_by_id(&self, entry_id: &str) -> RepositoryResult<Option<ProductionEntry>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM production_entry WHERE entry_id = ?1", ENTRY_COLUMNS);
        let entry = conn.query_row(&sql, params![entry_id], map_entry).optional()?;
        Ok(entry)
    }

    pub fn find_by_item(&self, item_id: &str) -> RepositoryResult<Vec<ProductionEntry>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM production_entry WHERE item_id = ?1 ORDER BY entry_date, created_at",
            ENTRY_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let entries = stmt
            .query_map(params![item_id], map_entry)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(entries)
    }

    /// 按 (日期, 机台) 汇总明细产量
    pub fn daily_summary(&self, item_id: &str) -> RepositoryResult<Vec<DailyProduction>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT entry_date, machine_id,
                   SUM(stitches), SUM(repeats), COUNT(*)
            FROM production_entry
            WHERE item_id = ?1
            GROUP BY entry_date, machine_id
            ORDER BY entry_date, machine_id
            "#,
        )?;
        let rows = stmt
            .query_map(params![item_id], |row| {
                Ok(DailyProduction {
                    entry_date: row.get(0)?,
                    machine_id: row.get(1)?,
                    stitches: row.get(2)?,
                    repeats: row.get(3)?,
                    entry_count: row.get(4)?,
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// 全量重算累计 (单事务: 读取全部记录 -> 计算 -> 覆盖累计)
    ///
    /// # 参数
    /// - `tally_fn`: 由记录计算累计的规则 (引擎提供)
    ///
    /// # 返回
    /// - Ok((重算前累计, 重算后累计))
    pub fn rescan_with<F>(&self, item_id: &str, tally_fn: F) -> RepositoryResult<(EntryTally, EntryTally)>
    where
        F: FnOnce(&[ProductionEntry]) -> EntryTally,
    {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let before = {
            let (used_stitches, used_repeats): (f64, f64) = tx
                .query_row(
                    "SELECT used_stitches, used_repeats FROM contract_item WHERE item_id = ?1",
                    params![item_id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?
                .ok_or_else(|| RepositoryError::not_found("ContractItem", item_id))?;

            let mut stmt = tx.prepare(
                "SELECT machine_id, used_stitches FROM machine_usage WHERE item_id = ?1",
            )?;
            let machine_stitches = stmt
                .query_map(params![item_id], |row| Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?)))?
                .collect::<SqliteResult<_>>()?;

            EntryTally {
                used_stitches,
                used_repeats,
                machine_stitches,
            }
        };

        let entries = {
            let sql = format!(
                "SELECT {} FROM production_entry WHERE item_id = ?1",
                ENTRY_COLUMNS
            );
            let mut stmt = tx.prepare(&sql)?;
            let rows = stmt
                .query_map(params![item_id], map_entry)?
                .collect::<SqliteResult<Vec<_>>>()?;
            rows
        };
        let after = tally_fn(&entries);

        tx.execute(
            "UPDATE contract_item SET used_stitches = ?1, used_repeats = ?2 WHERE item_id = ?3",
            params![after.used_stitches, after.used_repeats, item_id],
        )?;
        tx.execute("DELETE FROM machine_usage WHERE item_id = ?1", params![item_id])?;
        for (machine_id, stitches) in &after.machine_stitches {
            tx.execute(
                "INSERT INTO machine_usage (item_id, machine_id, used_stitches) VALUES (?1, ?2, ?3)",
                params![item_id, machine_id, stitches],
            )?;
        }

        tx.commit()?;
        Ok((before, after))
    }
}
