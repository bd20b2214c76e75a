//! Payload validation. Every check runs so the client gets all offending
//! fields at once.

use corkboard_types::api::{
    CreateBoardRequest, CreateBookmarkRequest, FieldError, SignupRequest, UpdateBoardRequest,
    UpdateBookmarkRequest,
};
use url::Url;

use crate::error::ApiError;

const EMAIL_MAX: usize = 254;
const PASSWORD_MIN: usize = 8;
const PASSWORD_MAX: usize = 128;
const BOARD_TITLE_MAX: usize = 100;
const BOARD_DESCRIPTION_MAX: usize = 1000;
const BOOKMARK_TITLE_MAX: usize = 200;
const URL_MAX: usize = 2048;

pub struct NewUser {
    pub email: String,
    pub password: String,
}

pub struct NewBoard {
    pub title: String,
    pub description: Option<String>,
}

/// `description: Some(None)` clears the description.
#[derive(Default)]
pub struct BoardPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
}

impl BoardPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none()
    }
}

pub struct NewBookmark {
    pub title: String,
    pub url: String,
}

#[derive(Default)]
pub struct BookmarkPatch {
    pub title: Option<String>,
    pub url: Option<String>,
}

impl BookmarkPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.url.is_none()
    }
}

#[derive(Default)]
struct Errors(Vec<FieldError>);

impl Errors {
    fn push(&mut self, field: &str, message: &str) {
        self.0.push(FieldError::new(field, message));
    }

    fn finish<T>(self, value: T) -> Result<T, ApiError> {
        if self.0.is_empty() {
            Ok(value)
        } else {
            Err(ApiError::InvalidInput(self.0))
        }
    }
}

/// Lower-cased, trimmed form used for storage and lookup.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

pub fn signup(req: SignupRequest) -> Result<NewUser, ApiError> {
    let mut errors = Errors::default();
    let email = normalize_email(&req.email);

    if !is_plausible_email(&email) {
        errors.push("email", "must be a valid email address");
    }
    let password_len = req.password.chars().count();
    if password_len < PASSWORD_MIN {
        errors.push("password", "must be at least 8 characters");
    } else if password_len > PASSWORD_MAX {
        errors.push("password", "must be at most 128 characters");
    }

    errors.finish(NewUser {
        email,
        password: req.password,
    })
}

pub fn new_board(req: CreateBoardRequest) -> Result<NewBoard, ApiError> {
    let mut errors = Errors::default();
    let title = req.title.trim().to_string();
    check_title(&mut errors, &title, BOARD_TITLE_MAX);
    let description = req.description.map(|d| d.trim().to_string());
    check_description(&mut errors, description.as_deref());

    errors.finish(NewBoard { title, description })
}

pub fn board_patch(req: UpdateBoardRequest) -> Result<BoardPatch, ApiError> {
    let mut errors = Errors::default();
    let title = req.title.map(|t| t.trim().to_string());
    if let Some(title) = &title {
        check_title(&mut errors, title, BOARD_TITLE_MAX);
    }
    let description = req
        .description
        .map(|d| d.map(|d| d.trim().to_string()));
    check_description(&mut errors, description.as_ref().and_then(|d| d.as_deref()));

    errors.finish(BoardPatch { title, description })
}

pub fn new_bookmark(req: CreateBookmarkRequest) -> Result<NewBookmark, ApiError> {
    let mut errors = Errors::default();
    let title = req.title.trim().to_string();
    check_title(&mut errors, &title, BOOKMARK_TITLE_MAX);
    let url = req.url.trim().to_string();
    check_url(&mut errors, &url);

    errors.finish(NewBookmark { title, url })
}

pub fn bookmark_patch(req: UpdateBookmarkRequest) -> Result<BookmarkPatch, ApiError> {
    let mut errors = Errors::default();
    let title = req.title.map(|t| t.trim().to_string());
    if let Some(title) = &title {
        check_title(&mut errors, title, BOOKMARK_TITLE_MAX);
    }
    let url = req.url.map(|u| u.trim().to_string());
    if let Some(url) = &url {
        check_url(&mut errors, url);
    }

    errors.finish(BookmarkPatch { title, url })
}

fn is_plausible_email(email: &str) -> bool {
    if email.len() < 3 || email.len() > EMAIL_MAX || email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

fn check_title(errors: &mut Errors, title: &str, max: usize) {
    if title.is_empty() {
        errors.push("title", "must not be blank");
    } else if title.chars().count() > max {
        errors.push("title", &format!("must be at most {max} characters"));
    }
}

fn check_description(errors: &mut Errors, description: Option<&str>) {
    if description.is_some_and(|d| d.chars().count() > BOARD_DESCRIPTION_MAX) {
        errors.push("description", "must be at most 1000 characters");
    }
}

fn check_url(errors: &mut Errors, raw: &str) {
    if raw.len() > URL_MAX {
        errors.push("url", "must be at most 2048 characters");
        return;
    }
    match Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {}
        Ok(_) => errors.push("url", "must be an http or https URL"),
        Err(_) => errors.push("url", "must be an absolute URL"),
    }
}
