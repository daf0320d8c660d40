pub mod checkpoint;
pub mod customer;
pub mod feedback;
pub mod money;
pub mod order;
pub mod staff;
pub mod user;
