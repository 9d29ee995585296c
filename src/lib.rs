pub mod config;
pub mod context;
pub mod exception;
pub mod param;
pub mod request;
pub mod response;
pub mod server;
pub mod ssl;
pub mod util;
pub mod value;

pub use config::Config;
pub use context::{Context, RequestContext};
pub use exception::Exception;
pub use param::{HttpRequestMethod, HttpVersion};
pub use request::Request;
pub use response::Response;
pub use ssl::{Before, Flow, SslHandler};
pub use value::{ArrayValue, FileUpload, HashValue, MissingValue, Node, NodeRef, SingleValue};
