pub mod actions;
pub mod api;
pub mod catalog;
pub mod config;
pub mod controller;
pub mod error;
pub mod medicine;
pub mod session;
pub mod steps;
pub mod token_store;
pub mod validation;

pub use actions::{
    ActionFailure, AuthSession, ExternalActions, FailureKind, HttpActions, MissingExternalActions,
    OtpReceipt,
};
pub use api::ApiClient;
pub use config::{load_settings, ClientSettings};
pub use controller::{FlowController, FlowEvent, FlowSnapshot, Outcome, Terminal};
pub use error::{FlowError, ValidationError};
pub use session::{Field, FieldValue, Session};
pub use steps::{ActionKind, Step};
pub use token_store::{FileTokenStore, InMemoryTokenStore, TokenStore};
