// ==========================================
// 刺绣合同核算系统 - 外发单数据仓储
// ==========================================
// 红线: 收回使用带守卫的原子更新,并发收回不会超收
// 红线: 状态在同一条 UPDATE 中推导,与数量保持一致
// ==========================================

use crate::domain::clipping::ClippingItem;
use crate::domain::types::ClipStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const CLIP_COLUMNS: &str = r#"
    clip_id, item_id, contract_id, vendor_id, quantity_sent,
    quantity_received, date_sent, last_received_date, status
"#;

fn map_clip(row: &Row<'_>) -> SqliteResult<ClippingItem> {
    Ok(ClippingItem {
        clip_id: row.get(0)?,
        item_id: row.get(1)?,
        contract_id: row.get(2)?,
        vendor_id: row.get(3)?,
        quantity_sent: row.get(4)?,
        quantity_received: row.get(5)?,
        date_sent: row.get(6)?,
        last_received_date: row.get(7)?,
        status: ClipStatus::from_str(&row.get::<_, String>(8)?),
    })
}

// ==========================================
// ClippingRepository - 外发单仓储
// ==========================================
pub struct ClippingRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ClippingRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn insert(&self, clip: &ClippingItem) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO clipping_item (
                clip_id, item_id, contract_id, vendor_id, quantity_sent,
                quantity_received, date_sent, last_received_date, status
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                clip.clip_id,
                clip.item_id,
                clip.contract_id,
                clip.vendor_id,
                clip.quantity_sent,
                clip.quantity_received,
                clip.date_sent,
                clip.last_received_date,
                clip.status.to_string(),
            ],
        )?;
        Ok(())
    }

    /// 收回 (带守卫的原子更新)
    ///
    /// # 返回
    /// - Ok(ClippingItem): 更新后的外发单
    /// - Err(BusinessRuleViolation): 数量非正或超收 (并发下由守卫拦截)
    pub fn apply_receipt(
        &self,
        clip_id: &str,
        quantity: i64,
        received_date: NaiveDate,
    ) -> RepositoryResult<ClippingItem> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let affected = tx.execute(
            r#"
            UPDATE clipping_item SET
                quantity_received = quantity_received + ?1,
                last_received_date = CASE
                    WHEN last_received_date IS NULL OR last_received_date < ?2 THEN ?2
                    ELSE last_received_date
                END,
                status = CASE
                    WHEN quantity_received + ?1 >= quantity_sent THEN 'COMPLETED'
                    ELSE 'PARTIALLY_RECEIVED'
                END
            WHERE clip_id = ?3
              AND ?1 > 0
              AND quantity_received + ?1 <= quantity_sent
            "#,
            params![quantity, received_date, clip_id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::BusinessRuleViolation(format!(
                "外发单不存在或收回数量超过待收数量: clip_id={}, quantity={}",
                clip_id, quantity
            )));
        }

        let sql = format!("SELECT {} FROM clipping_item WHERE clip_id = ?1", CLIP_COLUMNS);
        let clip = tx.query_row(&sql, params![clip_id], map_clip)?;

        tx.commit()?;
        Ok(clip)
    }

    pub fn find_by_id(&self, clip_id: &str) -> RepositoryResult<Option<ClippingItem>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM clipping_item WHERE clip_id = ?1", CLIP_COLUMNS);
        let clip = conn.query_row(&sql, params![clip_id], map_clip).optional()?;
        Ok(clip)
    }

    pub fn find_by_vendor(&self, vendor_id: &str) -> RepositoryResult<Vec<ClippingItem>> {
        self.query_many(
            "WHERE vendor_id = ?1 ORDER BY contract_id, date_sent",
            vendor_id,
        )
    }

    pub fn find_by_contract(&self, contract_id: &str) -> RepositoryResult<Vec<ClippingItem>> {
        self.query_many(
            "WHERE contract_id = ?1 ORDER BY vendor_id, date_sent",
            contract_id,
        )
    }

    fn query_many(&self, clause: &str, key: &str) -> RepositoryResult<Vec<ClippingItem>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM clipping_item {}", CLIP_COLUMNS, clause);
        let mut stmt = conn.prepare(&sql)?;
        let clips = stmt
            .query_map(params![key], map_clip)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(clips)
    }
}
