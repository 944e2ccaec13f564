//! 存储管理模块 - 检查点写入

pub mod checkpoint;

pub use checkpoint::CheckpointWriter;
