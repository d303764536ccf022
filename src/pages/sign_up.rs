use serde::{Deserialize, Serialize};
use std::fmt::Display;

use super::{render, Navigator, PageError, SubmitStatus, HOME_PATH};
use crate::auth::types::{SignUpEmailRequest, UserInfo};
use crate::client::AuthApi;

pub const SUBMIT_LABEL: &str = "サインアップ";
pub const PENDING_LABEL: &str = "サインアップ中...";
pub const FAILURE_MESSAGE: &str = "サインアップに失敗しました。入力内容を確認してください。";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SignUpForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Default)]
pub struct SignUpPage {
    form: SignUpForm,
    status: SubmitStatus,
    error: Option<String>,
}

#[derive(Serialize)]
struct SignUpView<'a> {
    name: &'a str,
    email: &'a str,
    error: Option<&'a str>,
    submitting: bool,
    submit_label: &'a str,
    pending_label: &'a str,
}

impl SignUpPage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_form(form: SignUpForm) -> Self {
        Self {
            form,
            ..Self::default()
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.form.name = name.into();
    }

    pub fn set_email(&mut self, email: impl Into<String>) {
        self.form.email = email.into();
    }

    pub fn set_password(&mut self, password: impl Into<String>) {
        self.form.password = password.into();
    }

    #[must_use]
    pub fn form(&self) -> &SignUpForm {
        &self.form
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

    pub fn begin_submit(&mut self) -> Option<SignUpEmailRequest> {
        if self.status != SubmitStatus::Idle {
            return None;
        }
        self.status = SubmitStatus::Submitting;
        self.error = None;
        Some(SignUpEmailRequest {
            name: self.form.name.clone(),
            email: self.form.email.clone(),
            password: self.form.password.clone(),
        })
    }

    /// Any rejection shows the same message; the cause is not surfaced.
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
                tracing::debug!("sign-up rejected: {err}");
                self.status = SubmitStatus::Idle;
                self.error = Some(FAILURE_MESSAGE.to_string());
            }
        }
    }

    pub async fn submit<A: AuthApi>(&mut self, api: &A, navigator: &impl Navigator) {
        let Some(request) = self.begin_submit() else {
            return;
        };
        let result = api.sign_up_email(request).await;
        self.finish_submit(result, navigator);
    }

    /// # Errors
    /// Returns an error if the template fails to render.
    pub fn render(&self) -> Result<String, PageError> {
        render(
            "sign_up.html",
            &SignUpView {
                name: &self.form.name,
                email: &self.form.email,
                error: self.error.as_deref(),
                submitting: self.is_submitting(),
                submit_label: self.submit_label(),
                pending_label: PENDING_LABEL,
            },
        )
    }
}
