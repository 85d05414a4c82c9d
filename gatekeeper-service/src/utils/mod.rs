pub mod password;

pub use password::{hash_password, verify_password, Argon2Hasher, Password, PasswordHashString};
