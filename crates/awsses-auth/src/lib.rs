pub mod credentials;
pub mod signature_v4;

pub use credentials::{CredentialProvider, Credentials, StaticCredentialProvider};
pub use signature_v4::{SigningScope, sign_request};
