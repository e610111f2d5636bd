//! Inference providers: the catalog, the escalation ladder and the clients.

mod client;
mod ladder;
mod registry;

#[cfg(feature = "http")]
mod http;
#[cfg(feature = "http")]
mod huggingface;
#[cfg(feature = "http")]
mod local;
#[cfg(feature = "http")]
mod openai_compat;

pub use client::{flatten_messages, ChatMessage, ClientSettings, ClientTable, ProviderClient, Role};
pub use ladder::{build_ladder, EscalationLadder, LadderEntry, LadderPosition};
pub use registry::{
    CredentialRef, Provider, ProviderKind, ProviderRegistry, GROQ_MODELS, HUGGINGFACE_MODELS,
    LOCAL_MODELS, OPENROUTER_MODELS,
};

#[cfg(test)]
pub use client::MockProviderClient;

#[cfg(feature = "http")]
pub use huggingface::HuggingFaceClient;
#[cfg(feature = "http")]
pub use local::LocalModelClient;
#[cfg(feature = "http")]
pub use openai_compat::OpenAiCompatibleClient;
