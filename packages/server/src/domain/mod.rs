//! Domain layer: entities, value objects and the collaborator traits the
//! gateway depends on.

pub mod ai_backend;
pub mod analytics;
pub mod auth;
pub mod entity;
pub mod error;
pub mod escalation;
pub mod registry;
pub mod resource;
pub mod token_stream;
pub mod value_object;

pub use ai_backend::{AiBackend, ByteStream, ChatRequest, HistoryTurn};
pub use analytics::{Analytics, FeedbackCounts, QuestionRecord};
pub use auth::Authenticator;
pub use entity::{Connection, Identity, Message, MessageKind, Session};
pub use error::{
    AuthError, BackendError, CollaboratorError, GatewayError, RegistryError, ValueObjectError,
};
pub use escalation::{EscalationRequest, EscalationStore};
pub use registry::{ConnectionRegistry, OutboundFrame, PusherChannel, SweepReport};
pub use resource::OwnedResource;
pub use token_stream::{LineDecoder, StreamEvent, TokenEventStream};
pub use value_object::{
    ChatQuery, ClientId, ContactNumber, EscalationReason, FeedbackType, MessageId, Priority,
    Timestamp,
};

#[cfg(test)]
pub use ai_backend::MockAiBackend;
#[cfg(test)]
pub use analytics::MockAnalytics;
#[cfg(test)]
pub use auth::MockAuthenticator;
#[cfg(test)]
pub use escalation::MockEscalationStore;
