pub mod context;
pub mod entity;
pub mod gid;
pub mod graph;
pub mod msg;
pub mod qos;
pub mod security;
pub mod time;

pub type Error = Box<dyn std::error::Error + Send + Sync + 'static>;
pub type Result<T> = std::result::Result<T, Error>;
