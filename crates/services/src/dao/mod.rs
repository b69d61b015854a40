pub mod base;
pub mod encounter;
pub mod patient;

pub use base::BaseDao;
