pub mod credentials;
pub mod lifecycle;
pub mod oauth;

pub use credentials::{ClientSecret, CredentialStore, Token};
pub use lifecycle::{ClientHandle, TokenLifecycle};
pub use oauth::{authorization_url, OAuthClient};
