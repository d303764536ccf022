use serde::{Deserialize, Serialize};
use std::fmt::Display;

use super::{render, Navigator, PageError, SubmitStatus, HOME_PATH};
use crate::auth::types::{SignInEmailRequest, UserInfo};
use crate::client::AuthApi;

pub const SUBMIT_LABEL: &str = "サインイン";
pub const PENDING_LABEL: &str = "サインイン中...";
pub const INVALID_CREDENTIALS_MESSAGE: &str = "メールアドレスまたはパスワードが正しくありません。";
pub const GENERIC_FAILURE_MESSAGE: &str =
    "サインインに失敗しました。メールアドレスとパスワードを確認してください。";

/// Form fields as posted by the browser.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SignInForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Map a rejection to the message shown under the form.
#[must_use]
pub fn error_message(error: &str) -> &'static str {
    if error.contains("INVALID_EMAIL") || error.contains("INVALID_PASSWORD") {
        INVALID_CREDENTIALS_MESSAGE
    } else {
        GENERIC_FAILURE_MESSAGE
    }
}

#[derive(Debug, Default)]
pub struct SignInPage {
    form: SignInForm,
    status: SubmitStatus,
    error: Option<String>,
}

#[derive(Serialize)]
struct SignInView<'a> {
    email: &'a str,
    error: Option<&'a str>,
    submitting: bool,
    submit_label: &'a str,
    pending_label: &'a str,
}

impl SignInPage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_form(form: SignInForm) -> Self {
        Self {
            form,
            ..Self::default()
        }
    }

    pub fn set_email(&mut self, email: impl Into<String>) {
        self.form.email = email.into();
    }

    pub fn set_password(&mut self, password: impl Into<String>) {
        self.form.password = password.into();
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.form.email
    }

    #[must_use]
    pub fn password(&self) -> &str {
        &self.form.password
    }

    #[must_use]
    pub fn status(&self) -> SubmitStatus {
        self.status
    }

    #[must_use]
    pub fn is_submitting(&self) -> bool {
        self.status == SubmitStatus::Submitting
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    #[must_use]
    pub fn submit_label(&self) -> &'static str {
        if self.is_submitting() {
            PENDING_LABEL
        } else {
            SUBMIT_LABEL
        }
    }

    /// Enter `Submitting` and return the request exactly as entered.
    /// `None` while a submission is already in flight or after success.
    pub fn begin_submit(&mut self) -> Option<SignInEmailRequest> {
        if self.status != SubmitStatus::Idle {
            return None;
        }
        self.status = SubmitStatus::Submitting;
        self.error = None;
        Some(SignInEmailRequest {
            email: self.form.email.clone(),
            password: self.form.password.clone(),
            remember_me: None,
        })
    }

    pub fn finish_submit<E: Display>(
        &mut self,
        result: Result<UserInfo, E>,
        navigator: &impl Navigator,
    ) {
        match result {
            Ok(_) => {
                self.status = SubmitStatus::Succeeded;
                navigator.push(HOME_PATH);
            }
            Err(err) => {
                self.status = SubmitStatus::Idle;
                self.error = Some(error_message(&err.to_string()).to_string());
            }
        }
    }

    /// Run a whole submission against `api`.
    pub async fn submit<A: AuthApi>(&mut self, api: &A, navigator: &impl Navigator) {
        let Some(request) = self.begin_submit() else {
            return;
        };
        let result = api.sign_in_email(request).await;
        self.finish_submit(result, navigator);
    }

    /// Render the page. The password is never echoed back.
    ///
    /// # Errors
    /// Returns an error if the template fails to render.
    pub fn render(&self) -> Result<String, PageError> {
        render(
            "sign_in.html",
            &SignInView {
                email: &self.form.email,
                error: self.error.as_deref(),
                submitting: self.is_submitting(),
                submit_label: self.submit_label(),
                pending_label: PENDING_LABEL,
            },
        )
    }
}
