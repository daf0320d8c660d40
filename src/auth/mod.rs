pub mod identity;
pub mod password;
pub mod policy;
pub mod token;
