//! # Page components
//!
//! Sign-in, sign-up and home pages as small state machines. Each page holds
//! its own input, pending and error state, calls an [`AuthApi`] on submit and
//! asks a [`Navigator`] to move on success. Rendering goes through the Tera
//! templates under `templates/`.
//!
//! [`AuthApi`]: crate::client::AuthApi

pub mod home;
pub mod sign_in;
pub mod sign_up;

pub use home::HomePage;
pub use sign_in::{SignInForm, SignInPage};
pub use sign_up::{SignUpForm, SignUpPage};

use serde::Serialize;
use std::sync::OnceLock;
use tera::{Context, Tera};
use thiserror::Error;

pub const HOME_PATH: &str = "/";
pub const SIGN_IN_PATH: &str = "/auth/sign-in";
pub const SIGN_UP_PATH: &str = "/auth/sign-up";
pub const SIGN_OUT_PATH: &str = "/auth/sign-out";

const BASE_TEMPLATE: &str = include_str!("../../templates/base.html");
const HOME_TEMPLATE: &str = include_str!("../../templates/home.html");
const SIGN_IN_TEMPLATE: &str = include_str!("../../templates/sign_in.html");
const SIGN_UP_TEMPLATE: &str = include_str!("../../templates/sign_up.html");

#[derive(Debug, Error)]
pub enum PageError {
    #[error("template error: {0}")]
    Template(#[from] tera::Error),
}

/// Where a page goes after a successful action.
pub trait Navigator {
    fn push(&self, path: &str);
}

/// Navigator that records the first requested path, for turning a page
/// transition into an HTTP redirect.
#[derive(Debug, Default)]
pub struct Redirect {
    target: OnceLock<String>,
}

impl Redirect {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn target(&self) -> Option<&str> {
        self.target.get().map(String::as_str)
    }
}

impl Navigator for Redirect {
    fn push(&self, path: &str) {
        let _ = self.target.set(path.to_string());
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SubmitStatus {
    #[default]
    Idle,
    Submitting,
    Succeeded,
}

fn templates() -> Result<&'static Tera, PageError> {
    static TEMPLATES: OnceLock<Tera> = OnceLock::new();
    if let Some(tera) = TEMPLATES.get() {
        return Ok(tera);
    }
    let mut tera = Tera::default();
    tera.add_raw_templates(vec![
        ("base.html", BASE_TEMPLATE),
        ("home.html", HOME_TEMPLATE),
        ("sign_in.html", SIGN_IN_TEMPLATE),
        ("sign_up.html", SIGN_UP_TEMPLATE),
    ])?;
    Ok(TEMPLATES.get_or_init(|| tera))
}

pub(crate) fn render<T: Serialize>(template: &str, view: &T) -> Result<String, PageError> {
    let context = Context::from_serialize(view)?;
    Ok(templates()?.render(template, &context)?)
}
