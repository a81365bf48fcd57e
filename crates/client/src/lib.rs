pub mod fetcher;
pub mod presigned;
pub mod session;
pub mod transport;

#[cfg(any(test, feature = "scripted"))]
pub mod scripted;

pub use fetcher::HttpPageFetcher;
pub use presigned::{random_key_prefix, substitute_key, PresignedUploadClient, FILENAME_PLACEHOLDER};
pub use session::{Credentials, SessionManager};
pub use transport::{HttpTransport, ReqwestTransport};
