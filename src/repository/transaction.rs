// ==========================================
// BOM 告警引擎 - 事务辅助
// ==========================================
// 两条原子路径（建批次/重新校验、确认）均使用 IMMEDIATE 事务:
// 首次读取前即持有写锁，读-算-写期间库存与告警不会被并发写入改变
// ==========================================

use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{Connection, Transaction, TransactionBehavior};

/// 开启 IMMEDIATE 事务
pub fn begin_immediate(conn: &mut Connection) -> RepositoryResult<Transaction<'_>> {
    conn.transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))
}

/// 提交事务
pub fn commit(tx: Transaction<'_>) -> RepositoryResult<()> {
    tx.commit()
        .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))
}
