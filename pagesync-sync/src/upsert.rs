//! Upsert engine: create or update a page, chosen by whether its slug
//! already exists in the store.

use chrono::{DateTime, Local};

use pagesync_core::{ContentItem, PageId, UpdatePolicy};
use pagesync_store::{ContentStore, NewPage, PageUpdate};

use crate::error::UpsertError;

/// A committed write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created(PageId),
    Updated(PageId),
}

impl UpsertOutcome {
    pub fn id(&self) -> PageId {
        match self {
            UpsertOutcome::Created(id) | UpsertOutcome::Updated(id) => *id,
        }
    }
}

/// Separator placed between a page's previous content and the new content.
pub fn change_note(now: DateTime<Local>) -> String {
    format!(
        "\n<hr>\n<p><em>Last updated: {} - Content synchronized from the knowledge base</em></p>\n",
        now.format("%Y-%m-%d %H:%M:%S")
    )
}

/// Body sent on update under `policy`.
pub fn merged_body(existing: &str, new: &str, policy: UpdatePolicy, now: DateTime<Local>) -> String {
    match policy {
        UpdatePolicy::Append => format!("{existing}{}{new}", change_note(now)),
        UpdatePolicy::Replace => new.to_string(),
    }
}

/// Commit `item` to the store.
///
/// If the slug matches one or more pages the first one is updated; otherwise
/// a new page is created. No retries.
pub fn upsert<S: ContentStore + ?Sized>(
    store: &S,
    item: &ContentItem,
    policy: UpdatePolicy,
    now: DateTime<Local>,
) -> Result<UpsertOutcome, UpsertError> {
    let slug = item.slug.as_str();
    let existing = store
        .lookup_by_slug(slug)
        .map_err(|source| UpsertError::Lookup {
            slug: slug.to_string(),
            source,
        })?;

    match existing.first() {
        Some(page) => {
            let id = page.id;
            let current = store
                .get_page(id)
                .map_err(|source| UpsertError::Fetch { id, source })?;
            let update = PageUpdate {
                title: item.title.clone(),
                body: merged_body(&current.rendered_content, &item.body, policy, now),
            };
            store
                .update_page(id, &update)
                .map_err(|source| UpsertError::Write {
                    slug: slug.to_string(),
                    source,
                })?;
            tracing::info!("updated page '{}' (id {id})", item.title);
            Ok(UpsertOutcome::Updated(id))
        }
        None => {
            let page = NewPage {
                title: item.title.clone(),
                slug: slug.to_string(),
                body: item.body.clone(),
                status: item.status,
            };
            let created = store
                .create_page(&page)
                .map_err(|source| UpsertError::Write {
                    slug: slug.to_string(),
                    source,
                })?;
            tracing::info!("created page '{}' (id {})", item.title, created.id);
            Ok(UpsertOutcome::Created(created.id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pagesync_core::{PublishStatus, Slug};
    use pagesync_store::{FailOn, MemoryStore, StoreCall};

    fn now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap()
    }

    fn item(body: &str) -> ContentItem {
        ContentItem {
            title: "A".into(),
            slug: Slug::from("a"),
            body: body.into(),
            assets: vec![],
            status: PublishStatus::Draft,
            format: None,
        }
    }

    #[test]
    fn change_note_format() {
        assert_eq!(
            change_note(now()),
            "\n<hr>\n<p><em>Last updated: 2024-05-06 07:08:09 - Content synchronized from the knowledge base</em></p>\n"
        );
    }

    #[test]
    fn absent_slug_creates() {
        let store = MemoryStore::new();
        let out = upsert(&store, &item("x"), UpdatePolicy::Append, now()).unwrap();
        assert!(matches!(out, UpsertOutcome::Created(_)));
        let page = store.page(out.id()).unwrap();
        assert_eq!(page.status, PublishStatus::Draft);
        assert_eq!(page.content, "x");
    }

    #[test]
    fn existing_slug_updates_first_page_and_keeps_old_content() {
        let store = MemoryStore::new();
        let first = store.seed_page("a", "A", "old body");
        let second = store.seed_page("a", "A", "other");

        let out = upsert(&store, &item("new body"), UpdatePolicy::Append, now()).unwrap();
        assert_eq!(out, UpsertOutcome::Updated(first));

        let content = store.page(first).unwrap().content;
        assert!(content.starts_with("old body"));
        assert!(content.ends_with("new body"));
        assert!(content.contains("Last updated: 2024-05-06 07:08:09"));
        assert_eq!(store.page(second).unwrap().content, "other");
    }

    #[test]
    fn replace_policy_sends_new_body_only() {
        let store = MemoryStore::new();
        let id = store.seed_page("a", "A", "old body");
        upsert(&store, &item("new body"), UpdatePolicy::Replace, now()).unwrap();
        assert_eq!(store.page(id).unwrap().content, "new body");
    }

    #[test]
    fn lookup_failure_makes_no_write() {
        let store = MemoryStore::new();
        store.fail_on(FailOn::Lookup);
        let err = upsert(&store, &item("x"), UpdatePolicy::Append, now()).unwrap_err();
        assert!(matches!(err, UpsertError::Lookup { .. }));
        assert_eq!(store.calls(), vec![StoreCall::Lookup { slug: "a".into() }]);
    }

    #[test]
    fn fetch_failure_skips_update() {
        let store = MemoryStore::new();
        store.seed_page("a", "A", "old");
        store.fail_on(FailOn::Get);
        let err = upsert(&store, &item("x"), UpdatePolicy::Append, now()).unwrap_err();
        assert!(matches!(err, UpsertError::Fetch { .. }));
        assert_eq!(store.write_calls(), 0);
    }
}
