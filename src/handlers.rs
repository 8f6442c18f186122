pub mod borrows;
pub mod cart;
pub mod inventory;
pub mod requisitions;
pub mod review;
