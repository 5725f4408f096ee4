//! Service layer for business logic.

pub mod upload_gateway;

pub use upload_gateway::{
    CommitProtocol, GatewayConfig, ReconcileReport, UploadError, UploadGateway,
};
