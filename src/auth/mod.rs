// Authentication module
// Manages the session lifecycle and the backend auth contract

mod manager;
mod refresh;
mod service;
pub mod types;

pub use manager::AuthManager;
pub use refresh::{exchange_refresh_token, RefreshError};
pub use service::AuthService;
pub use types::{
    AuthResponse, LoginRequest, PasswordChange, Principal, ProfileUpdate, RegisterRequest, Session,
};
