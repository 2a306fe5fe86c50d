mod copy;
mod migrate;
mod read;
mod store;

pub use copy::copy_snapshot;
pub use migrate::migrate;
pub use read::read_snapshot;
pub use store::PgStore;
