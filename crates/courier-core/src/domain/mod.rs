//! Domain model (ids, xml, messages, correlation keys, exchanges, service metadata).

pub mod correlation;
pub mod endpoint;
pub mod errors;
pub mod exchange;
pub mod ids;
pub mod message;
pub mod partner_link;
pub mod state;
pub mod wsdl;
pub mod xml;

pub use correlation::{CorrelationKey, QueuedMessage, Route};
pub use endpoint::EndpointReference;
pub use errors::{CourierError, ErrorKind};
pub use exchange::{
    ExchangePattern, Failure, FailureType, HttpCredentials, MessageExchange, ReplyOutcome,
};
pub use ids::{CorrelatorId, ExchangeId, InstanceId};
pub use message::Message;
pub use partner_link::PartnerLink;
pub use state::ExchangeState;
pub use wsdl::{
    BindingKind, FaultDefinition, HttpInputEncoding, HttpOperationBinding, HttpVerb,
    MessageDefinition, OperationBinding, OperationDefinition, PartDefinition, PortDefinition,
    ServiceDefinition,
};
pub use xml::{Element, Node, QName};

/// エンジン拡張の名前空間（合成 fault 型に使う）
pub const ENGINE_EXTENSION_NS: &str = "http://www.apache.org/ode/type/extension";
