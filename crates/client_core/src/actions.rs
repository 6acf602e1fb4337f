//! Side effects the flow controller delegates: OTP, phone lookup, auth.

use async_trait::async_trait;
use shared::{
    error::{ApiError, ErrorCode},
    protocol::{
        AuthResponse, AuthUser, CheckPhoneResponse, GoogleAuthRequest, LoginRequest,
        OtpResponse, OtpVerifyRequest, PhoneNumberRequest, UserData,
    },
};
use thiserror::Error;
use tracing::{info, warn};

use crate::api::{endpoints, ApiClient};

pub const TRANSPORT_FAILURE_MESSAGE: &str = "Tidak dapat terhubung ke server. Silakan coba lagi.";
const UNAVAILABLE_MESSAGE: &str = "Layanan tidak tersedia";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Business,
    Transport,
    Unauthorized,
}

/// Unsuccessful outcome of an external action, with a message fit for the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ActionFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl ActionFailure {
    pub fn business(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Business,
            message: message.into(),
        }
    }

    pub fn transport() -> Self {
        Self {
            kind: FailureKind::Transport,
            message: TRANSPORT_FAILURE_MESSAGE.to_string(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Unauthorized,
            message: message.into(),
        }
    }
}

impl From<ApiError> for ActionFailure {
    fn from(err: ApiError) -> Self {
        match err.code {
            ErrorCode::Transport => ActionFailure::transport(),
            ErrorCode::Unauthorized => ActionFailure::unauthorized(err.message),
            _ => ActionFailure::business(err.message),
        }
    }
}

pub type ActionResult<T> = std::result::Result<T, ActionFailure>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpReceipt {
    pub message: String,
    pub verification_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub token: Option<String>,
    pub user: Option<AuthUser>,
    pub message: String,
}

#[async_trait]
pub trait ExternalActions: Send + Sync {
    async fn send_otp(&self, phone: &str) -> ActionResult<OtpReceipt>;
    async fn verify_otp(&self, phone: &str, code: &str) -> ActionResult<()>;
    async fn check_phone_exists(&self, phone: &str) -> ActionResult<bool>;
    async fn login(&self, phone: &str, password: &str) -> ActionResult<AuthSession>;
    async fn register(&self, user: &UserData) -> ActionResult<AuthSession>;
    async fn google_auth(&self, token: &str) -> ActionResult<AuthSession>;
}

pub struct MissingExternalActions;

#[async_trait]
impl ExternalActions for MissingExternalActions {
    async fn send_otp(&self, _phone: &str) -> ActionResult<OtpReceipt> {
        Err(ActionFailure::business(UNAVAILABLE_MESSAGE))
    }

    async fn verify_otp(&self, _phone: &str, _code: &str) -> ActionResult<()> {
        Err(ActionFailure::business(UNAVAILABLE_MESSAGE))
    }

    async fn check_phone_exists(&self, _phone: &str) -> ActionResult<bool> {
        Err(ActionFailure::business(UNAVAILABLE_MESSAGE))
    }

    async fn login(&self, _phone: &str, _password: &str) -> ActionResult<AuthSession> {
        Err(ActionFailure::business(UNAVAILABLE_MESSAGE))
    }

    async fn register(&self, _user: &UserData) -> ActionResult<AuthSession> {
        Err(ActionFailure::business(UNAVAILABLE_MESSAGE))
    }

    async fn google_auth(&self, _token: &str) -> ActionResult<AuthSession> {
        Err(ActionFailure::business(UNAVAILABLE_MESSAGE))
    }
}

/// [`ExternalActions`] backed by the REST API.
pub struct HttpActions {
    api: ApiClient,
}

impl HttpActions {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    async fn authenticate<B>(
        &self,
        path: &str,
        body: &B,
        fallback_message: &str,
    ) -> ActionResult<AuthSession>
    where
        B: serde::Serialize + Sync,
    {
        let response: AuthResponse = self.api.post(path, body).await?;
        if !response.success {
            return Err(ActionFailure::business(non_empty_or(
                response.message,
                fallback_message,
            )));
        }
        if let Some(token) = &response.token {
            self.api.save_token(token).await;
        }
        info!("auth: {path} succeeded token_issued={}", response.token.is_some());
        Ok(AuthSession {
            token: response.token,
            user: response.user,
            message: response.message,
        })
    }
}

#[async_trait]
impl ExternalActions for HttpActions {
    async fn send_otp(&self, phone: &str) -> ActionResult<OtpReceipt> {
        let response: OtpResponse = self
            .api
            .post(
                endpoints::OTP_SEND,
                &PhoneNumberRequest {
                    phone_number: phone.to_string(),
                },
            )
            .await?;
        if !response.success {
            return Err(ActionFailure::business(non_empty_or(
                response.message,
                "Gagal mengirim kode verifikasi",
            )));
        }
        Ok(OtpReceipt {
            message: response.message,
            verification_id: response.verification_id,
        })
    }

    async fn verify_otp(&self, phone: &str, code: &str) -> ActionResult<()> {
        let response: OtpResponse = self
            .api
            .post(
                endpoints::OTP_VERIFY,
                &OtpVerifyRequest {
                    phone_number: phone.to_string(),
                    otp_code: code.to_string(),
                },
            )
            .await?;
        if response.success {
            Ok(())
        } else {
            Err(ActionFailure::business(non_empty_or(
                response.message,
                "Kode verifikasi salah",
            )))
        }
    }

    async fn check_phone_exists(&self, phone: &str) -> ActionResult<bool> {
        let response: CheckPhoneResponse = self
            .api
            .post(
                endpoints::CHECK_PHONE,
                &PhoneNumberRequest {
                    phone_number: phone.to_string(),
                },
            )
            .await
            .inspect_err(|err| warn!("auth: check-phone failed, not assuming unregistered: {err}"))?;
        Ok(response.exists)
    }

    async fn login(&self, phone: &str, password: &str) -> ActionResult<AuthSession> {
        self.authenticate(
            endpoints::LOGIN,
            &LoginRequest {
                phone_number: phone.to_string(),
                password: password.to_string(),
            },
            "Login gagal",
        )
        .await
    }

    async fn register(&self, user: &UserData) -> ActionResult<AuthSession> {
        self.authenticate(endpoints::REGISTER, user, "Registrasi gagal")
            .await
    }

    async fn google_auth(&self, token: &str) -> ActionResult<AuthSession> {
        self.authenticate(
            endpoints::GOOGLE_AUTH,
            &GoogleAuthRequest {
                token: token.to_string(),
            },
            "Google login gagal",
        )
        .await
    }
}

fn non_empty_or(message: String, fallback: &str) -> String {
    if message.trim().is_empty() {
        fallback.to_string()
    } else {
        message
    }
}

#[cfg(test)]
#[path = "tests/actions_tests.rs"]
mod tests;
