// src/models.rs

pub mod audit;
pub mod auth;
pub mod borrow;
pub mod cart;
pub mod inventory;
pub mod overview;
pub mod requisition;
