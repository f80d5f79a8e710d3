//! Value objects: small, immutable, self-validating domain types.

mod cipher_tag;
mod event_kind;
mod file_id;
mod operation_kind;
mod request_id;
mod severity;

pub use cipher_tag::CipherTag;
pub use event_kind::EventKind;
pub use file_id::FileId;
pub use operation_kind::OperationKind;
pub use request_id::RequestId;
pub use severity::Severity;
