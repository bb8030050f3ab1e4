pub mod audit;
pub mod email_registry;
