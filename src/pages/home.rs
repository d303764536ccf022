use serde::Serialize;

use super::{render, PageError};
use crate::auth::types::UserInfo;
use crate::client::SessionState;

pub const LOADING_MESSAGE: &str = "読み込み中...";

/// Home page: a greeting when signed in, links to sign in or up otherwise.
#[derive(Debug, Clone)]
pub struct HomePage {
    state: SessionState,
}

#[derive(Serialize)]
struct HomeView<'a> {
    pending: bool,
    user: Option<&'a UserInfo>,
}

impl HomePage {
    #[must_use]
    pub fn new(state: SessionState) -> Self {
        Self { state }
    }

    #[must_use]
    pub fn greeting(&self) -> Option<String> {
        self.user().map(|user| format!("こんにちは、{}さん", user.name))
    }

    #[must_use]
    pub fn user(&self) -> Option<&UserInfo> {
        self.state.data.as_ref().map(|payload| &payload.user)
    }

    /// # Errors
    /// Returns an error if the template fails to render.
    pub fn render(&self) -> Result<String, PageError> {
        render(
            "home.html",
            &HomeView {
                pending: self.state.is_pending,
                user: self.user(),
            },
        )
    }
}
