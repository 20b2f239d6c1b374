//! Form validation.
//!
//! Each validator collects every problem it finds instead of stopping at the
//! first, so forms can show all messages at once.

use core::fmt;

use serde::Serialize;

use delicious_core::{Coordinates, Email, Location, Rating, UserId};

use crate::models::{NewStore, StoreFields};

/// One problem with one form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Ordered list of field problems.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// A single error.
    #[must_use]
    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.push(field, message);
        errors
    }

    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(FieldError {
            field,
            message: message.into(),
        });
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Messages in the order they were found.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.0.iter().map(|e| e.message.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.messages().join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Raw store form values, as submitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreInput {
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub address: String,
    pub longitude: String,
    pub latitude: String,
}

/// Validate the editable store fields.
///
/// The location type is always forced to a point. The returned fields carry
/// no photo; uploads are handled separately.
///
/// # Errors
///
/// Returns every problem found.
pub fn validate_store(input: &StoreInput) -> Result<StoreFields, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let name = input.name.trim();
    if name.is_empty() {
        errors.push("name", "Please enter a store name");
    }

    let coordinates = match (parse_degrees(&input.longitude), parse_degrees(&input.latitude)) {
        (Some(lng), Some(lat)) => match Coordinates::new(lng, lat) {
            Ok(c) => Some(c),
            Err(e) => {
                errors.push("location", e.to_string());
                None
            }
        },
        _ => {
            errors.push("location", "You must supply coordinates");
            None
        }
    };

    let address = input.address.trim();
    if address.is_empty() {
        errors.push("address", "You must supply an address");
    }

    let mut tags: Vec<String> = Vec::new();
    for tag in input.tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
        if !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_owned());
        }
    }

    let location = match coordinates {
        Some(c) if !address.is_empty() => Location::point(c, address).ok(),
        _ => None,
    };

    match location {
        Some(location) if errors.is_empty() => Ok(StoreFields {
            name: name.to_owned(),
            description: input.description.trim().to_owned(),
            tags,
            location,
            photo: None,
        }),
        _ => Err(errors),
    }
}

/// Validate a new store and attach its author.
///
/// # Errors
///
/// Returns every problem found, including a missing author.
pub fn validate_new_store(
    input: &StoreInput,
    author: Option<UserId>,
) -> Result<NewStore, ValidationErrors> {
    let fields = validate_store(input);
    match (fields, author) {
        (Ok(fields), Some(author)) => Ok(NewStore { fields, author }),
        (Ok(_), None) => Err(ValidationErrors::single("author", "You must supply an author")),
        (Err(mut errors), None) => {
            errors.push("author", "You must supply an author");
            Err(errors)
        }
        (Err(errors), Some(_)) => Err(errors),
    }
}

fn parse_degrees(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    raw.parse().ok()
}

/// Validate review text and rating.
///
/// # Errors
///
/// Returns every problem found.
pub fn validate_review(text: &str, rating: &str) -> Result<(String, Rating), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let text = text.trim();
    if text.is_empty() {
        errors.push("text", "Your review cannot be empty!");
    }

    let rating = rating
        .trim()
        .parse::<i64>()
        .ok()
        .and_then(|r| Rating::new(r).ok());
    if rating.is_none() {
        errors.push("rating", "Rating must be between 1 and 5");
    }

    match rating {
        Some(rating) if errors.is_empty() => Ok((text.to_owned(), rating)),
        _ => Err(errors),
    }
}

/// A registration that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    /// Trimmed, HTML-escaped display name.
    pub name: String,
    /// Normalized email.
    pub email: Email,
    pub password: String,
}

/// Validate a registration form.
///
/// The name is sanitized and the email normalized before use. No strength
/// rule is applied to the password.
///
/// # Errors
///
/// Returns every problem found.
pub fn validate_registration(
    name: &str,
    email: &str,
    password: &str,
    password_confirm: &str,
) -> Result<Registration, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let name = sanitize_name(name);
    if name.is_empty() {
        errors.push("name", "You forgot to supply a name!");
    }

    let email = Email::parse_normalized(email).ok();
    if email.is_none() {
        errors.push("email", "That email is not valid");
    }

    if password.is_empty() {
        errors.push("password", "Password cannot be empty!");
    }
    if password_confirm.is_empty() {
        errors.push("password-confirm", "Confirmed password cannot be empty!");
    }
    if password_confirm != password {
        errors.push("password-confirm", "Oops! Your passwords don't match");
    }

    match email {
        Some(email) if errors.is_empty() => Ok(Registration {
            name,
            email,
            password: password.to_owned(),
        }),
        _ => Err(errors),
    }
}

/// Trim and HTML-escape a display name.
#[must_use]
pub fn sanitize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.trim().chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '/' => out.push_str("&#x2F;"),
            '\\' => out.push_str("&#x5C;"),
            '`' => out.push_str("&#96;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn store_input() -> StoreInput {
        StoreInput {
            name: "  Coffee House ".to_owned(),
            description: "Great coffee".to_owned(),
            tags: vec!["Wifi".to_owned(), " ".to_owned(), "Wifi".to_owned(), "Licensed".to_owned()],
            address: "1 Main St".to_owned(),
            longitude: "-79.38".to_owned(),
            latitude: "43.65".to_owned(),
        }
    }

    #[test]
    fn test_valid_store() {
        let fields = validate_store(&store_input()).unwrap();

        assert_eq!(fields.name, "Coffee House");
        assert_eq!(fields.tags, ["Wifi", "Licensed"]);
        assert_eq!(fields.location.kind, "Point");
        assert!((fields.location.coordinates.longitude() + 79.38).abs() < f64::EPSILON);
        assert!(fields.photo.is_none());
    }

    #[test]
    fn test_store_collects_every_message() {
        let input = StoreInput {
            name: "   ".to_owned(),
            ..StoreInput::default()
        };

        let errors = validate_store(&input).unwrap_err();
        assert_eq!(
            errors.messages(),
            [
                "Please enter a store name",
                "You must supply coordinates",
                "You must supply an address",
            ]
        );
    }

    #[test]
    fn test_store_rejects_out_of_range_coordinates() {
        let input = StoreInput {
            latitude: "91".to_owned(),
            ..store_input()
        };

        let errors = validate_store(&input).unwrap_err();
        assert_eq!(errors.iter().next().unwrap().field, "location");
    }

    #[test]
    fn test_store_rejects_unparseable_coordinates() {
        let input = StoreInput {
            longitude: "east".to_owned(),
            ..store_input()
        };

        let errors = validate_store(&input).unwrap_err();
        assert_eq!(errors.messages(), ["You must supply coordinates"]);
    }

    #[test]
    fn test_new_store_requires_author() {
        let errors = validate_new_store(&store_input(), None).unwrap_err();
        assert_eq!(errors.messages(), ["You must supply an author"]);

        let store = validate_new_store(&store_input(), Some(UserId::new(7))).unwrap();
        assert_eq!(store.author, UserId::new(7));
    }

    #[test]
    fn test_review_validation() {
        let (text, rating) = validate_review(" Lovely ", "5").unwrap();
        assert_eq!(text, "Lovely");
        assert_eq!(rating.get(), 5);

        let errors = validate_review("", "6").unwrap_err();
        assert_eq!(
            errors.messages(),
            ["Your review cannot be empty!", "Rating must be between 1 and 5"]
        );

        assert!(validate_review("ok", "").is_err());
    }

    #[test]
    fn test_mismatched_passwords_yield_single_message() {
        let errors =
            validate_registration("Wes", "wes@example.com", "abc123", "abc124").unwrap_err();

        assert_eq!(errors.messages(), ["Oops! Your passwords don't match"]);
    }

    #[test]
    fn test_registration_collects_every_message() {
        let errors = validate_registration("  ", "not-an-email", "", "").unwrap_err();

        assert_eq!(
            errors.messages(),
            [
                "You forgot to supply a name!",
                "That email is not valid",
                "Password cannot be empty!",
                "Confirmed password cannot be empty!",
            ]
        );
    }

    #[test]
    fn test_registration_normalizes_and_sanitizes() {
        let registration =
            validate_registration(" <b>Wes</b> ", "Wes.Bos+food@GoogleMail.com", "pw", "pw")
                .unwrap();

        assert_eq!(registration.name, "&lt;b&gt;Wes&lt;&#x2F;b&gt;");
        assert_eq!(registration.email.as_str(), "wes.bos+food@gmail.com");
    }

    #[test]
    fn test_short_password_is_accepted() {
        assert!(validate_registration("Wes", "wes@example.com", "a", "a").is_ok());
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name(r#"O'Neil & "Co" `x` \"#), "O&#x27;Neil &amp; &quot;Co&quot; &#96;x&#96; &#x5C;");
    }
}
