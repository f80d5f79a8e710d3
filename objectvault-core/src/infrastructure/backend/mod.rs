mod backend_pool;
mod sftp_client;

pub use backend_pool::BackendPool;
pub use sftp_client::{SftpClient, SftpCredentials};
