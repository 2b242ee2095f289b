// ==========================================
// 产品评审分配系统 - 分配审计日志数据仓储
// ==========================================
// 红线: 只追加,永不 UPDATE / DELETE
// ==========================================

mod queries;
mod record;

#[cfg(test)]
mod tests;

pub use record::AssignmentHistoryRepository;
pub(crate) use record::insert_history_row;
