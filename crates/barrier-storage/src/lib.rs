//! Record store gateways for the barrier bridge.
//!
//! | Store | Description |
//! |-------|-------------|
//! | [`MySqlRecordStore`] | MySQL / MariaDB `barrier` table via `sqlx` |
//! | [`MemoryRecordStore`] | In-memory rows, for tests and demos |

pub mod memory;
pub mod mysql;

pub use memory::MemoryRecordStore;
pub use mysql::MySqlRecordStore;
