// ==========================================
// 刺绣合同核算系统 - 外发加工商数据仓储
// ==========================================

use crate::domain::clipping::Vendor;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

fn map_vendor(row: &Row<'_>) -> SqliteResult<Vendor> {
    Ok(Vendor {
        vendor_id: row.get(0)?,
        vendor_name: row.get(1)?,
        contact: row.get(2)?,
        is_active: row.get(3)?,
    })
}

// ==========================================
// VendorRepository - 外发商仓储
// ==========================================
pub struct VendorRepository {
    conn: Arc<Mutex<Connection>>,
}

impl VendorRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn insert(&self, vendor: &Vendor) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO vendor (vendor_id, vendor_name, contact, is_active) VALUES (?1, ?2, ?3, ?4)",
            params![vendor.vendor_id, vendor.vendor_name, vendor.contact, vendor.is_active],
        )?;
        Ok(())
    }

    pub fn find_by_id(&self, vendor_id: &str) -> RepositoryResult<Option<Vendor>> {
        let conn = self.get_conn()?;
        let vendor = conn
            .query_row(
                "SELECT vendor_id, vendor_name, contact, is_active FROM vendor WHERE vendor_id = ?1",
                params![vendor_id],
                map_vendor,
            )
            .optional()?;
        Ok(vendor)
    }

    pub fn list_active(&self) -> RepositoryResult<Vec<Vendor>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT vendor_id, vendor_name, contact, is_active FROM vendor WHERE is_active = 1 ORDER BY vendor_name",
        )?;
        let vendors = stmt
            .query_map([], map_vendor)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(vendors)
    }

    pub fn set_active(&self, vendor_id: &str, is_active: bool) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "UPDATE vendor SET is_active = ?1 WHERE vendor_id = ?2",
            params![is_active, vendor_id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::not_found("Vendor", vendor_id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_list_and_deactivate() {
        let repo = VendorRepository::new(Arc::new(Mutex::new(
            crate::db::open_in_memory().unwrap(),
        )));
        let a = Vendor::new("甲加工厂".to_string(), Some("138-0000".to_string()));
        let b = Vendor::new("乙加工厂".to_string(), None);
        repo.insert(&a).unwrap();
        repo.insert(&b).unwrap();
        assert_eq!(repo.list_active().unwrap().len(), 2);

        repo.set_active(&b.vendor_id, false).unwrap();
        let active = repo.list_active().unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].contact.as_deref(), Some("138-0000"));
        assert!(!repo.find_by_id(&b.vendor_id).unwrap().unwrap().is_active);
    }
}
