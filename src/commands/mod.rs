pub mod accounts;
pub mod audit;
pub mod compare;
pub mod completions;
pub mod costs;

pub use accounts::AccountsCommand;
pub use audit::AuditCommand;
pub use compare::CompareCommand;
pub use completions::CompletionsCommand;
pub use costs::CostsCommand;
