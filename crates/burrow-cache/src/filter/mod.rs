//! [`MembershipFilter`](burrow_core::MembershipFilter) implementations.

pub mod cuckoo;
pub mod memory;

pub use cuckoo::RedisCuckooFilter;
pub use memory::InMemoryCuckooFilter;
