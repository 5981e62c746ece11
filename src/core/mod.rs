pub mod aggregate;
pub mod pagination;
pub mod sweep;
pub mod waste;
