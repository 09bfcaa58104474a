pub mod local_storage;
pub mod table_codec;

pub use local_storage::*;
pub use table_codec::*;
