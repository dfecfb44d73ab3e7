//! Domain types handled by the request pipeline

pub mod request;
pub mod response;
pub mod session;

pub use request::{
    Method, QueryParams, RequestBody, RequestContext, RequestDescriptor, StreamBody,
    UnsupportedMethod,
};
pub use response::ApiResponse;
pub use session::{RefreshedTokens, SessionSnapshot, TokenState, UserIdentity};
