pub mod auth_file;
pub mod channel;
pub mod http;
pub mod memory;

pub use auth_file::FileAuthStorage;
pub use channel::{FramedChannel, LocalChannel, LocalReceiver};
pub use http::HttpApiClient;
pub use memory::MemoryAuthStorage;
