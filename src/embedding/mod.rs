//! 嵌入层：内容寻址的持久化向量缓存 + 带缓存的嵌入服务

pub mod cache;
pub mod service;

pub use cache::{cache_key, VectorCache};
pub use service::{cosine_similarity, EmbeddingService};
