//! line-relay core library: LINE webhook handling, completion client, and the relay between them.

pub mod channels;
pub mod config;
pub mod gateway;
pub mod init;
pub mod llm;
pub mod relay;
