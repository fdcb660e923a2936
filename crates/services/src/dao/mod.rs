pub mod activity_log;
pub mod base;
pub mod chat;
pub mod company;
pub mod role;
pub mod user;

pub use activity_log::ActivityLogDao;
pub use base::{BaseDao, DaoError, DaoResult, PaginatedResult, PaginationParams};
pub use chat::ChatDao;
pub use company::CompanyDao;
pub use role::RoleDao;
pub use user::UserDao;
