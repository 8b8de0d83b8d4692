// ==========================================
// 刺绣合同核算系统 - 合同明细数据仓储
// ==========================================
// 红线: update 不写生产累计 (used_*),累计只能通过增量原子累加
// 红线: 只软删除
// ==========================================

use crate::domain::contract_item::{ContractItem, DerivedRates, RateInputs};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

pub(crate) const ITEM_COLUMNS: &str = r#"
    item_id, contract_id, design_no, fabric, color,
    stitch_per_repeat, rate_per_stitch, cost_factor, repeat_count, piece_count,
    motif_rate, motif_qty, lace_rate, lace_qty,
    calculated_rate, rate_per_repeat, total_rate, heads, rate_per_piece,
    piece_amount, motif_amount, lace_amount, final_total_rate,
    rate_per_repeat_overridden, used_stitches, used_repeats,
    is_active, created_at, updated_at
"#;

pub(crate) fn map_item(row: &Row<'_>) -> SqliteResult<ContractItem> {
    Ok(ContractItem {
        item_id: row.get(0)?,
        contract_id: row.get(1)?,
        design_no: row.get(2)?,
        fabric: row.get(3)?,
        color: row.get(4)?,
        inputs: RateInputs {
            stitch_per_repeat: row.get(5)?,
            rate_per_stitch: row.get(6)?,
            cost_factor: row.get(7)?,
            repeat_count: row.get(8)?,
            piece_count: row.get(9)?,
            motif_rate: row.get(10)?,
            motif_qty: row.get(11)?,
            lace_rate: row.get(12)?,
            lace_qty: row.get(13)?,
        },
        rates: DerivedRates {
            calculated_rate: row.get(14)?,
            rate_per_repeat: row.get(15)?,
            total_rate: row.get(16)?,
            heads: row.get(17)?,
            rate_per_piece: row.get(18)?,
            piece_amount: row.get(19)?,
            motif_amount: row.get(20)?,
            lace_amount: row.get(21)?,
            final_total_rate: row.get(22)?,
        },
        rate_per_repeat_overridden: row.get(23)?,
        used_stitches: row.get(24)?,
        used_repeats: row.get(25)?,
        is_active: row.get(26)?,
        created_at: row.get(27)?,
        updated_at: row.get(28)?,
    })
}

// ==========================================
// ContractItemRepository - 合同明细仓储
// ==========================================
pub struct ContractItemRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ContractItemRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 插入明细
    pub fn insert(&self, item: &ContractItem) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO contract_item (
                item_id, contract_id, design_no, fabric, color,
                stitch_per_repeat, rate_per_stitch, cost_factor, repeat_count, piece_count,
                motif_rate, motif_qty, lace_rate, lace_qty,
                calculated_rate, rate_per_repeat, total_rate, heads, rate_per_piece,
                piece_amount, motif_amount, lace_amount, final_total_rate,
                rate_per_repeat_overridden, used_stitches, used_repeats,
                is_active, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20,
                ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28, ?29
            )
            "#,
            params![
                item.item_id,
                item.contract_id,
                item.design_no,
                item.fabric,
                item.color,
                item.inputs.stitch_per_repeat,
                item.inputs.rate_per_stitch,
                item.inputs.cost_factor,
                item.inputs.repeat_count,
                item.inputs.piece_count,
                item.inputs.motif_rate,
                item.inputs.motif_qty,
                item.inputs.lace_rate,
                item.inputs.lace_qty,
                item.rates.calculated_rate,
                item.rates.rate_per_repeat,
                item.rates.total_rate,
                item.rates.heads,
                item.rates.rate_per_piece,
                item.rates.piece_amount,
                item.rates.motif_amount,
                item.rates.lace_amount,
                item.rates.final_total_rate,
                item.rate_per_repeat_overridden,
                item.used_stitches,
                item.used_repeats,
                item.is_active,
                item.created_at,
                item.updated_at,
            ],
        )?;
        Ok(())
    }

    /// 更新录入字段与派生字段 (不含生产累计)
    pub fn update_pricing(&self, item: &ContractItem) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            r#"
            UPDATE contract_item SET
                design_no = ?1, fabric = ?2, color = ?3,
                stitch_per_repeat = ?4, rate_per_stitch = ?5, cost_factor = ?6,
                repeat_count = ?7, piece_count = ?8,
                motif_rate = ?9, motif_qty = ?10, lace_rate = ?11, lace_qty = ?12,
                calculated_rate = ?13, rate_per_repeat = ?14, total_rate = ?15,
                heads = ?16, rate_per_piece = ?17, piece_amount = ?18,
                motif_amount = ?19, lace_amount = ?20, final_total_rate = ?21,
                rate_per_repeat_overridden = ?22, updated_at = ?23
            WHERE item_id = ?24 AND is_active = 1
            "#,
            params![
                item.design_no,
                item.fabric,
                item.color,
                item.inputs.stitch_per_repeat,
                item.inputs.rate_per_stitch,
                item.inputs.cost_factor,
                item.inputs.repeat_count,
                item.inputs.piece_count,
                item.inputs.motif_rate,
                item.inputs.motif_qty,
                item.inputs.lace_rate,
                item.inputs.lace_qty,
                item.rates.calculated_rate,
                item.rates.rate_per_repeat,
                item.rates.total_rate,
                item.rates.heads,
                item.rates.rate_per_piece,
                item.rates.piece_amount,
                item.rates.motif_amount,
                item.rates.lace_amount,
                item.rates.final_total_rate,
                item.rate_per_repeat_overridden,
                chrono::Local::now().naive_local(),
                item.item_id,
            ],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("ContractItem", &item.item_id));
        }
        Ok(())
    }

    /// 按ID查询 (含已软删除)
    pub fn find_by_id(&self, item_id: &str) -> RepositoryResult<Option<ContractItem>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM contract_item WHERE item_id = ?1", ITEM_COLUMNS);
        let item = conn.query_row(&sql, params![item_id], map_item).optional()?;
        Ok(item)
    }

    /// 查询合同下的有效明细
    pub fn find_active_by_contract(&self, contract_id: &str) -> RepositoryResult<Vec<ContractItem>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM contract_item WHERE contract_id = ?1 AND is_active = 1 ORDER BY created_at, item_id",
            ITEM_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let items = stmt
            .query_map(params![contract_id], map_item)?
            .collect::<SqliteResult<Vec<ContractItem>>>()?;
        Ok(items)
    }

    /// 软删除明细
    pub fn deactivate(&self, item_id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE contract_item SET is_active = 0, updated_at = ?1 WHERE item_id = ?2",
            params![chrono::Local::now().naive_local(), item_id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("ContractItem", item_id));
        }
        Ok(())
    }
}
