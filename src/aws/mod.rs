use aws_smithy_types::DateTime;

pub mod cost_explorer;
pub mod credentials;
pub mod inventory;
pub mod organizations;
pub mod sts;

/// AWS temporary credentials structure
#[derive(Debug, Clone)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    pub expiration: DateTime,
}
