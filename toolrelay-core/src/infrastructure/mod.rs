pub mod channel;
pub mod model;
pub mod rpc;
pub mod storage;
