pub mod accounts;
pub mod customers;
pub mod feedback;
pub mod orders;
pub mod reports;
pub mod staff;
pub mod tracking;
