pub mod currency;
pub mod earnings;
pub mod notifications;
pub mod orders;
pub mod payments;
pub mod projects;
pub mod root;
pub mod webhooks;
