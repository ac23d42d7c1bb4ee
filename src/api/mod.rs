pub mod client;
pub mod stream;
pub mod transport;

pub use client::BoxClient;
pub use stream::{ByteStream, DownloadStream, FormDataStream};
pub use transport::{ApiRequest, ApiResponse, ReqwestTransport, RequestBody, Transport};
