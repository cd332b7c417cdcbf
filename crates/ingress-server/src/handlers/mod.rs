//! Gateway-owned request handlers

pub mod health;
