pub mod assignments;
pub mod notifications;
pub mod permissions;
pub mod purchase_requests;
pub mod reference;
pub mod search;
