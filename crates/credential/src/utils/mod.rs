//! Utility modules

pub mod connstring;
pub mod password;
pub mod validation;

pub use connstring::{ConnectionTemplate, replace_password};
pub use password::{EntropyError, PASSWORD_BYTES, PASSWORD_LENGTH, generate_password};
pub use validation::{
    MAX_LOGIN_LENGTH, validate_login_name, validate_secret_name, validate_vault_name,
};
