//! LLM 层：对话客户端（团队型 Hub 使用）与远程嵌入后端（语义匹配使用）

pub mod embedding;
pub mod mock;
pub mod openai;
pub mod traits;

pub use embedding::{
    create_embedder_from_config, parse_embedding_envelope, JinaEmbedder, OpenAiEmbedder,
    RemoteEmbedder,
};
pub use mock::{MockEmbedder, MockLlmClient};
pub use openai::{create_llm_from_config, OpenAiClient};
pub use traits::{LlmClient, Message, Role};
