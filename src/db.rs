// ==========================================
// 刺绣合同核算系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为 (外键/busy_timeout)
// - 统一建表 (幂等),记录 schema_version
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 打开内存库并建表 (测试/演示用)
pub fn open_in_memory() -> rusqlite::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    configure_sqlite_connection(&conn)?;
    init_schema(&conn)?;
    Ok(conn)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 初始化全部表结构（幂等）
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL DEFAULT 'global',
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS contract (
            contract_id TEXT PRIMARY KEY,
            contract_no TEXT NOT NULL UNIQUE,
            customer_name TEXT,
            start_date TEXT NOT NULL,
            delivery_date TEXT,
            status TEXT NOT NULL DEFAULT 'DRAFT',
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS contract_item (
            item_id TEXT PRIMARY KEY,
            contract_id TEXT NOT NULL REFERENCES contract(contract_id),
            design_no TEXT,
            fabric TEXT,
            color TEXT,
            stitch_per_repeat REAL,
            rate_per_stitch REAL,
            cost_factor REAL,
            repeat_count REAL,
            piece_count REAL,
            motif_rate REAL,
            motif_qty REAL,
            lace_rate REAL,
            lace_qty REAL,
            calculated_rate REAL,
            rate_per_repeat REAL,
            total_rate REAL,
            heads INTEGER NOT NULL DEFAULT 0,
            rate_per_piece REAL,
            piece_amount REAL,
            motif_amount REAL,
            lace_amount REAL,
            final_total_rate REAL,
            rate_per_repeat_overridden INTEGER NOT NULL DEFAULT 0,
            used_stitches REAL NOT NULL DEFAULT 0,
            used_repeats REAL NOT NULL DEFAULT 0,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_contract_item_contract
            ON contract_item(contract_id);

        CREATE TABLE IF NOT EXISTS machine (
            machine_id TEXT PRIMARY KEY,
            machine_name TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1
        );

        CREATE TABLE IF NOT EXISTS machine_assignment (
            item_id TEXT NOT NULL REFERENCES contract_item(item_id),
            machine_id TEXT NOT NULL REFERENCES machine(machine_id),
            assigned_stitches REAL NOT NULL CHECK (assigned_stitches >= 0),
            avg_stitches_per_day REAL NOT NULL CHECK (avg_stitches_per_day > 0),
            repeats REAL NOT NULL DEFAULT 0,
            estimated_days INTEGER NOT NULL,
            PRIMARY KEY (item_id, machine_id)
        );

        CREATE TABLE IF NOT EXISTS machine_usage (
            item_id TEXT NOT NULL REFERENCES contract_item(item_id),
            machine_id TEXT NOT NULL REFERENCES machine(machine_id),
            used_stitches REAL NOT NULL DEFAULT 0,
            PRIMARY KEY (item_id, machine_id)
        );

        CREATE TABLE IF NOT EXISTS production_entry (
            entry_id TEXT PRIMARY KEY,
            item_id TEXT NOT NULL REFERENCES contract_item(item_id),
            machine_id TEXT NOT NULL REFERENCES machine(machine_id),
            entry_date TEXT NOT NULL,
            shift TEXT NOT NULL,
            stitches REAL NOT NULL CHECK (stitches > 0),
            repeats REAL NOT NULL DEFAULT 0,
            operator_name TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_production_entry_item
            ON production_entry(item_id, machine_id);

        CREATE TABLE IF NOT EXISTS vendor (
            vendor_id TEXT PRIMARY KEY,
            vendor_name TEXT NOT NULL,
            contact TEXT,
            is_active INTEGER NOT NULL DEFAULT 1
        );

        CREATE TABLE IF NOT EXISTS clipping_item (
            clip_id TEXT PRIMARY KEY,
            item_id TEXT NOT NULL REFERENCES contract_item(item_id),
            contract_id TEXT NOT NULL REFERENCES contract(contract_id),
            vendor_id TEXT NOT NULL REFERENCES vendor(vendor_id),
            quantity_sent INTEGER NOT NULL CHECK (quantity_sent > 0),
            quantity_received INTEGER NOT NULL DEFAULT 0
                CHECK (quantity_received >= 0 AND quantity_received <= quantity_sent),
            date_sent TEXT NOT NULL,
            last_received_date TEXT,
            status TEXT NOT NULL DEFAULT 'SENT'
        );
        CREATE INDEX IF NOT EXISTS idx_clipping_item_vendor
            ON clipping_item(vendor_id);
        CREATE INDEX IF NOT EXISTS idx_clipping_item_contract
            ON clipping_item(contract_id);

        CREATE TABLE IF NOT EXISTS action_log (
            action_id TEXT PRIMARY KEY,
            action_type TEXT NOT NULL,
            action_ts TEXT NOT NULL,
            actor TEXT NOT NULL,
            contract_id TEXT,
            item_id TEXT,
            payload_json TEXT,
            detail TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_action_log_contract
            ON action_log(contract_id, action_ts DESC);
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_is_idempotent() {
        let conn = open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
    }

    #[test]
    fn test_schema_version_missing_table() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), None);
    }
}
