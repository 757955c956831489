//! PostgreSQL storage for the affiliate commission engine.
//!
//! This crate provides:
//! - Database client for `PostgreSQL`
//! - Repositories for typed, read-only access to members, orders,
//!   the commission payout ledger, and commission rates

pub mod database;
pub mod repositories;

pub use database::DatabaseClient;

pub use repositories::{
    CommissionRateRepository, MemberRepository, OrderRepository, Repositories, RevenueRepository,
};
