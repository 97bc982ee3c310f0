//! Inference gateway: configuration, dispatch and the HTTP surface
//! 推理网关：配置、分发与HTTP接口

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod http_gateway;
pub mod routes;


pub use config::{ConfigArgs, GatewayConfig};
pub use dispatcher::{Dispatcher, TaskBody, TaskOutput, TaskRequest};
pub use error::DispatchError;
pub use http_gateway::HttpGateway;
