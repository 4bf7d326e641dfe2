//! Structural check performed once, at the boundary, before an item may
//! reach the store.

use crate::error::ValidationError;
use crate::types::{ContentItem, RawContentItem, Slug};

/// Turn a raw item into a [`ContentItem`].
///
/// Checks presence of `title`, `slug` and `body` in that order and reports the
/// first one missing. `title` and `slug` must also be non-empty; `body` may be
/// an empty string.
pub fn validate(raw: &RawContentItem) -> Result<ContentItem, ValidationError> {
    let title = required(raw.title.as_deref(), "title", true)?;
    let slug = required(raw.slug.as_deref(), "slug", true)?;
    let body = required(raw.body.as_deref(), "body", false)?;

    Ok(ContentItem {
        title: title.to_string(),
        slug: Slug::from(slug),
        body: body.to_string(),
        assets: raw.assets.clone(),
        status: raw.status,
        format: raw.format.clone(),
    })
}

/// Boolean form of [`validate`].
pub fn is_valid(raw: &RawContentItem) -> bool {
    validate(raw).is_ok()
}

fn required<'a>(
    value: Option<&'a str>,
    field: &'static str,
    non_empty: bool,
) -> Result<&'a str, ValidationError> {
    match value {
        None => Err(ValidationError::MissingField { field }),
        Some(v) if non_empty && v.trim().is_empty() => Err(ValidationError::EmptyField { field }),
        Some(v) => Ok(v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(title: Option<&str>, slug: Option<&str>, body: Option<&str>) -> RawContentItem {
        RawContentItem {
            title: title.map(str::to_string),
            slug: slug.map(str::to_string),
            body: body.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn complete_item_validates() {
        let item = validate(&raw(Some("A"), Some("a"), Some("x"))).expect("valid");
        assert_eq!(item.slug, Slug::from("a"));
        assert_eq!(item.body, "x");
    }

    #[test]
    fn empty_body_is_allowed() {
        assert!(is_valid(&raw(Some("A"), Some("a"), Some(""))));
    }

    #[test]
    fn reports_first_missing_field() {
        let err = validate(&raw(None, None, None)).unwrap_err();
        assert_eq!(err, ValidationError::MissingField { field: "title" });
    }

    #[test]
    fn blank_slug_is_rejected() {
        let err = validate(&raw(Some("A"), Some("  "), Some("x"))).unwrap_err();
        assert_eq!(err, ValidationError::EmptyField { field: "slug" });
    }
}
