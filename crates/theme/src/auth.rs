//! Login modal with password and OTP flows.
//!
//! Three ways in: password, email OTP, phone OTP. The OTP flows are two
//! steps; the send response may carry a user GUID that must be echoed back
//! on verification. Already-authenticated customers never see the modal,
//! they are sent to their account page.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use secrecy::SecretString;
use tracing::{instrument, warn};
use webstore_core::UserGuid;

use crate::api::StorefrontApi;
use crate::session::ClientSession;
use crate::ui::{LoginPane, Page};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Authentication method chosen on the first pane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginMethod {
    Password,
    EmailOtp,
    PhoneOtp,
}

/// What `open` decided to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenLoginOutcome {
    Opened,
    /// Already signed in; navigate to `/account` instead.
    RedirectAccount,
}

#[derive(Default)]
struct AuthState {
    user_guid: Option<UserGuid>,
    busy: bool,
}

/// The login modal controller.
pub struct LoginModal<A> {
    api: Arc<A>,
    page: Arc<Page>,
    session: Arc<ClientSession>,
    state: Mutex<AuthState>,
}

impl<A: StorefrontApi> LoginModal<A> {
    #[must_use]
    pub fn new(api: Arc<A>, page: Arc<Page>, session: Arc<ClientSession>) -> Self {
        Self {
            api,
            page,
            session,
            state: Mutex::new(AuthState::default()),
        }
    }

    /// Show the modal, unless the logged-in cookie says there is nothing
    /// to sign in to.
    pub fn open(&self) -> OpenLoginOutcome {
        if self.session.is_logged_in() {
            return OpenLoginOutcome::RedirectAccount;
        }

        *lock(&self.state) = AuthState::default();
        self.page.update_login(|login| {
            login.visible = true;
            login.pane = LoginPane::MethodSelect;
            login.step_label = "Sign in".to_string();
            login.error = None;
            login.busy = false;
        });
        OpenLoginOutcome::Opened
    }

    pub fn close(&self) {
        self.page.update_login(|login| login.visible = false);
    }

    /// Move from method select into a flow.
    pub fn choose_method(&self, method: LoginMethod) {
        let (pane, label) = match method {
            LoginMethod::Password => (LoginPane::Password, "Sign in with password"),
            LoginMethod::EmailOtp => (LoginPane::EmailOtpInput, "Sign in with email"),
            LoginMethod::PhoneOtp => (LoginPane::PhoneOtpInput, "Sign in with phone"),
        };
        self.page.update_login(|login| {
            login.pane = pane;
            login.step_label = label.to_string();
            login.error = None;
        });
    }

    /// Return to the method select pane.
    pub fn back_to_methods(&self) {
        lock(&self.state).user_guid = None;
        self.page.update_login(|login| {
            login.pane = LoginPane::MethodSelect;
            login.step_label = "Sign in".to_string();
            login.error = None;
        });
    }

    /// Password flow. Returns true on success.
    #[instrument(skip(self, password))]
    pub async fn submit_password(
        &self,
        username: &str,
        password: &SecretString,
        remember: bool,
    ) -> bool {
        if !self.begin_submit() {
            return false;
        }

        let result = self.api.login(username, password, remember).await;
        self.finish_submit();

        match result {
            Ok(()) => {
                self.succeed();
                true
            }
            Err(e) => {
                warn!(error = %e, "password login failed");
                self.fail(&e.user_message());
                false
            }
        }
    }

    /// First OTP step: send the code. The pane decides whether this is the
    /// email or the phone flow.
    #[instrument(skip(self))]
    pub async fn send_otp(&self, identifier: &str) -> bool {
        let pane = self.page.login().pane;
        if !self.begin_submit() {
            return false;
        }

        let result = match pane {
            LoginPane::EmailOtpInput => self.api.send_email_otp(identifier).await,
            LoginPane::PhoneOtpInput => self.api.send_phone_otp(identifier).await,
            _ => {
                self.finish_submit();
                return false;
            }
        };
        self.finish_submit();

        match result {
            Ok(challenge) => {
                lock(&self.state).user_guid = challenge.user_guid;
                let verify_pane = if pane == LoginPane::EmailOtpInput {
                    LoginPane::EmailOtpVerify
                } else {
                    LoginPane::PhoneOtpVerify
                };
                self.page.update_login(|login| {
                    login.pane = verify_pane;
                    login.step_label = "Verify code".to_string();
                    login.error = None;
                });
                true
            }
            Err(e) => {
                warn!(error = %e, "otp send failed");
                self.fail(&e.user_message());
                false
            }
        }
    }

    /// Second OTP step: verify the code, echoing back the GUID captured
    /// from the send response.
    #[instrument(skip(self, code))]
    pub async fn verify_otp(&self, code: &str) -> bool {
        let pane = self.page.login().pane;
        if !self.begin_submit() {
            return false;
        }

        let user_guid = lock(&self.state).user_guid.clone();
        let result = match pane {
            LoginPane::EmailOtpVerify => self.api.verify_email_otp(user_guid.as_ref(), code).await,
            LoginPane::PhoneOtpVerify => self.api.verify_phone_otp(user_guid.as_ref(), code).await,
            _ => {
                self.finish_submit();
                return false;
            }
        };
        self.finish_submit();

        match result {
            Ok(()) => {
                self.succeed();
                true
            }
            Err(e) => {
                warn!(error = %e, "otp verification failed");
                self.fail(&e.user_message());
                false
            }
        }
    }

    fn begin_submit(&self) -> bool {
        let mut state = lock(&self.state);
        if state.busy {
            return false;
        }
        state.busy = true;
        drop(state);
        self.page.update_login(|login| {
            login.busy = true;
            login.error = None;
        });
        true
    }

    fn finish_submit(&self) {
        lock(&self.state).busy = false;
        self.page.update_login(|login| login.busy = false);
    }

    fn succeed(&self) {
        self.page.update_login(|login| {
            login.pane = LoginPane::Success;
            login.step_label = "Welcome back".to_string();
            login.error = None;
        });
    }

    fn fail(&self, message: &str) {
        self.page
            .update_login(|login| login.error = Some(message.to_string()));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::api::testing::ScriptedApi;
    use crate::api::types::OtpChallenge;
    use crate::error::ApiError;
    use crate::session::LOGGED_IN_COOKIE;

    struct Fixture {
        api: Arc<ScriptedApi>,
        page: Arc<Page>,
        session: Arc<ClientSession>,
        modal: LoginModal<ScriptedApi>,
    }

    fn fixture() -> Fixture {
        let api = Arc::new(ScriptedApi::new());
        let page = Arc::new(Page::new());
        let session = Arc::new(ClientSession::new());
        let modal = LoginModal::new(Arc::clone(&api), Arc::clone(&page), Arc::clone(&session));
        Fixture {
            api,
            page,
            session,
            modal,
        }
    }

    fn secret(s: &str) -> SecretString {
        SecretString::from(s.to_string())
    }

    #[test]
    fn test_open_redirects_when_already_logged_in() {
        let f = fixture();
        f.session.set_cookie(LOGGED_IN_COOKIE, "true");
        assert_eq!(f.modal.open(), OpenLoginOutcome::RedirectAccount);
        assert!(!f.page.login().visible);
    }

    #[test]
    fn test_open_starts_at_method_select() {
        let f = fixture();
        assert_eq!(f.modal.open(), OpenLoginOutcome::Opened);
        let view = f.page.login();
        assert!(view.visible);
        assert_eq!(view.pane, LoginPane::MethodSelect);
        assert_eq!(view.step_label, "Sign in");
    }

    #[tokio::test]
    async fn test_password_flow_success() {
        let f = fixture();
        f.modal.open();
        f.modal.choose_method(LoginMethod::Password);
        assert_eq!(f.page.login().step_label, "Sign in with password");

        let ok = f
            .modal
            .submit_password("a@example.com", &secret("hunter2"), true)
            .await;

        assert!(ok);
        let view = f.page.login();
        assert_eq!(view.pane, LoginPane::Success);
        assert_eq!(view.step_label, "Welcome back");
        assert!(!view.busy);
    }

    #[tokio::test]
    async fn test_password_failure_shows_inline_error() {
        let f = fixture();
        f.modal.open();
        f.modal.choose_method(LoginMethod::Password);
        f.api.push_login(Err(ApiError::Backend {
            status: 401,
            message: "Wrong password".to_string(),
        }));

        let ok = f
            .modal
            .submit_password("a@example.com", &secret("nope"), false)
            .await;

        assert!(!ok);
        let view = f.page.login();
        assert_eq!(view.pane, LoginPane::Password);
        assert_eq!(view.error.as_deref(), Some("Wrong password"));
        assert!(!view.busy);
    }

    #[tokio::test]
    async fn test_email_otp_flow_echoes_guid() {
        let f = fixture();
        f.modal.open();
        f.modal.choose_method(LoginMethod::EmailOtp);
        f.api.push_send_otp(Ok(OtpChallenge {
            user_guid: Some(UserGuid::new("guid-7")),
        }));

        assert!(f.modal.send_otp("a@example.com").await);
        assert_eq!(f.page.login().pane, LoginPane::EmailOtpVerify);
        assert_eq!(f.page.login().step_label, "Verify code");

        assert!(f.modal.verify_otp("123456").await);
        assert_eq!(f.api.calls("verify_email_otp"), 1);
        let (guid, code) = f.api.last_verify.lock().unwrap().clone().unwrap();
        assert_eq!(guid.unwrap().as_str(), "guid-7");
        assert_eq!(code, "123456");
        assert_eq!(f.page.login().pane, LoginPane::Success);
    }

    #[tokio::test]
    async fn test_phone_otp_flow_without_guid() {
        let f = fixture();
        f.modal.open();
        f.modal.choose_method(LoginMethod::PhoneOtp);

        assert!(f.modal.send_otp("+15550100").await);
        assert_eq!(f.api.calls("send_phone_otp"), 1);
        assert_eq!(f.page.login().pane, LoginPane::PhoneOtpVerify);

        assert!(f.modal.verify_otp("000111").await);
        assert_eq!(f.api.calls("verify_phone_otp"), 1);
        let (guid, _) = f.api.last_verify.lock().unwrap().clone().unwrap();
        assert!(guid.is_none());
    }

    #[tokio::test]
    async fn test_verify_failure_stays_on_verify_pane() {
        let f = fixture();
        f.modal.open();
        f.modal.choose_method(LoginMethod::EmailOtp);
        f.modal.send_otp("a@example.com").await;
        f.api.push_verify_otp(Err(ApiError::Backend {
            status: 400,
            message: "Invalid code".to_string(),
        }));

        assert!(!f.modal.verify_otp("999999").await);
        let view = f.page.login();
        assert_eq!(view.pane, LoginPane::EmailOtpVerify);
        assert_eq!(view.error.as_deref(), Some("Invalid code"));
    }

    #[tokio::test]
    async fn test_back_to_methods_clears_guid() {
        let f = fixture();
        f.modal.open();
        f.modal.choose_method(LoginMethod::EmailOtp);
        f.api.push_send_otp(Ok(OtpChallenge {
            user_guid: Some(UserGuid::new("guid-1")),
        }));
        f.modal.send_otp("a@example.com").await;

        f.modal.back_to_methods();
        assert_eq!(f.page.login().pane, LoginPane::MethodSelect);

        // A fresh phone flow does not leak the stale email GUID.
        f.modal.choose_method(LoginMethod::PhoneOtp);
        f.modal.send_otp("+15550100").await;
        f.modal.verify_otp("42").await;
        let (guid, _) = f.api.last_verify.lock().unwrap().clone().unwrap();
        assert!(guid.is_none());
    }
}
