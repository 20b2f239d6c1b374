//! View models shared by templates.
//!
//! Templates only read plain fields and call simple methods; anything that
//! needs the viewer, the session or a join is computed here.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use crate::middleware::take_flashes;
use crate::models::{CurrentUser, Flash, Store, TAG_CHOICES, TagCount, User, session_keys};
use crate::validation::{StoreInput, ValidationErrors};

/// Layout data every page needs.
#[derive(Debug, Clone)]
pub struct Page {
    pub title: String,
    pub current_user: Option<CurrentUser>,
    pub flashes: Vec<Flash>,
}

/// The viewer and their pending flashes, taken from the session.
///
/// Extracting this consumes the flashes, so only handlers that render a page
/// should use it. Handlers that redirect use `Session` directly.
pub struct PageContext {
    pub user: Option<CurrentUser>,
    flashes: Vec<Flash>,
}

impl PageContext {
    /// Read the viewer and take pending flashes from `session`.
    pub async fn load(session: &Session) -> Self {
        let user = session
            .get::<CurrentUser>(session_keys::CURRENT_USER)
            .await
            .ok()
            .flatten();
        let flashes = take_flashes(session).await;
        Self { user, flashes }
    }

    /// Build the layout data for a page titled `title`.
    #[must_use]
    pub fn page(self, title: impl Into<String>) -> Page {
        Page {
            title: title.into(),
            current_user: self.user,
            flashes: self.flashes,
        }
    }
}

impl<S> FromRequestParts<S> for PageContext
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(match parts.extensions.get::<Session>() {
            Some(session) => Self::load(session).await,
            None => Self {
                user: None,
                flashes: Vec::new(),
            },
        })
    }
}

/// A store as listed on index pages.
#[derive(Debug, Clone)]
pub struct StoreCard {
    pub store: Store,
    /// Whether anyone is logged in (shows the heart button).
    pub viewer_present: bool,
    pub hearted: bool,
    pub editable: bool,
}

impl StoreCard {
    /// Annotate `stores` for `viewer`.
    #[must_use]
    pub fn list(stores: Vec<Store>, viewer: Option<&User>) -> Vec<Self> {
        stores
            .into_iter()
            .map(|store| Self {
                viewer_present: viewer.is_some(),
                hearted: viewer.is_some_and(|u| u.has_hearted(store.id)),
                editable: viewer.is_some_and(|u| store.is_author(u.id)),
                store,
            })
            .collect()
    }

    /// Number of reviews, for the card footer.
    #[must_use]
    pub fn review_count(&self) -> usize {
        self.store.reviews.len()
    }
}

/// One entry of a tag list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagLink {
    pub tag: String,
    pub count: Option<i64>,
    pub active: bool,
}

impl TagLink {
    /// Tag list entries with counts, marking `active`.
    #[must_use]
    pub fn from_counts(counts: Vec<TagCount>, active: Option<&str>) -> Vec<Self> {
        counts
            .into_iter()
            .map(|c| Self {
                active: active == Some(c.tag.as_str()),
                count: Some(c.count),
                tag: c.tag,
            })
            .collect()
    }

    /// Plain links for a store's own tags.
    #[must_use]
    pub fn from_tags(tags: &[String]) -> Vec<Self> {
        tags.iter()
            .map(|t| Self {
                tag: t.clone(),
                count: None,
                active: false,
            })
            .collect()
    }

    /// Link to the tag page.
    #[must_use]
    pub fn href(&self) -> String {
        format!("/tags/{}", urlencoding::encode(&self.tag))
    }
}

/// A tag checkbox on the store form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagChoice {
    pub name: String,
    pub checked: bool,
}

/// Values and messages for the add/edit store form.
#[derive(Debug, Clone, Default)]
pub struct StoreFormView {
    pub action: String,
    pub name: String,
    pub description: String,
    pub address: String,
    pub lng: String,
    pub lat: String,
    pub tag_choices: Vec<TagChoice>,
    pub photo_url: Option<String>,
    pub errors: Vec<String>,
}

impl StoreFormView {
    /// An empty add form.
    #[must_use]
    pub fn blank() -> Self {
        Self {
            action: "/add".to_owned(),
            tag_choices: tag_choices(&[]),
            ..Self::default()
        }
    }

    /// The edit form for an existing store.
    #[must_use]
    pub fn for_store(store: &Store) -> Self {
        Self {
            action: format!("/add/{}", store.id),
            name: store.name.clone(),
            description: store.description.clone(),
            address: store.location.address.clone(),
            lng: store.location.coordinates.longitude().to_string(),
            lat: store.location.coordinates.latitude().to_string(),
            tag_choices: tag_choices(&store.tags),
            photo_url: store.photo.as_ref().map(|_| store.photo_url()),
            errors: Vec::new(),
        }
    }

    /// Re-render submitted values with their validation messages.
    #[must_use]
    pub fn resubmitted(action: String, input: &StoreInput, errors: &ValidationErrors) -> Self {
        Self {
            action,
            name: input.name.clone(),
            description: input.description.clone(),
            address: input.address.clone(),
            lng: input.longitude.clone(),
            lat: input.latitude.clone(),
            tag_choices: tag_choices(&input.tags),
            photo_url: None,
            errors: errors.messages(),
        }
    }
}

/// The standard tags plus any custom ones already on the store.
fn tag_choices(selected: &[String]) -> Vec<TagChoice> {
    let mut names: Vec<&str> = TAG_CHOICES.to_vec();
    names.extend(
        selected
            .iter()
            .map(String::as_str)
            .filter(|t| !TAG_CHOICES.contains(t)),
    );

    names
        .into_iter()
        .map(|name| TagChoice {
            name: name.to_owned(),
            checked: selected.iter().any(|s| s == name),
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use delicious_core::{Coordinates, Email, Location, Slug, StoreId, UserId};

    use super::*;

    fn store(id: i32, author: i32, tags: &[&str]) -> Store {
        Store {
            id: StoreId::new(id),
            name: "Cafe".to_owned(),
            slug: Slug::from_name("Cafe"),
            description: String::new(),
            tags: tags.iter().map(|t| (*t).to_owned()).collect(),
            created_at: Utc::now(),
            location: Location::point(Coordinates::new(1.5, 2.25).unwrap(), "Here").unwrap(),
            photo: None,
            author: UserId::new(author),
            reviews: Vec::new(),
        }
    }

    fn viewer(id: i32, hearts: &[i32]) -> User {
        User {
            id: UserId::new(id),
            name: "Wes".to_owned(),
            email: Email::parse("wes@example.com").unwrap(),
            hearts: hearts.iter().copied().map(StoreId::new).collect(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_cards_for_anonymous_viewer() {
        let cards = StoreCard::list(vec![store(1, 7, &[])], None);
        assert!(!cards[0].viewer_present && !cards[0].hearted && !cards[0].editable);
    }

    #[test]
    fn test_cards_mark_hearts_and_ownership() {
        let me = viewer(7, &[2]);
        let cards = StoreCard::list(vec![store(1, 7, &[]), store(2, 8, &[])], Some(&me));

        assert!(cards[0].editable && !cards[0].hearted);
        assert!(!cards[1].editable && cards[1].hearted);
    }

    #[test]
    fn test_tag_href_is_encoded() {
        let links = TagLink::from_tags(&["Open Late".to_owned()]);
        assert_eq!(links[0].href(), "/tags/Open%20Late");
    }

    #[test]
    fn test_active_tag() {
        let counts = vec![
            TagCount { tag: "Wifi".to_owned(), count: 2 },
            TagCount { tag: "Licensed".to_owned(), count: 1 },
        ];
        let links = TagLink::from_counts(counts, Some("Licensed"));
        assert!(!links[0].active);
        assert!(links[1].active);
    }

    #[test]
    fn test_edit_form_keeps_custom_tags() {
        let form = StoreFormView::for_store(&store(3, 1, &["Wifi", "Dog Friendly"]));

        assert_eq!(form.action, "/add/3");
        assert_eq!(form.lng, "1.5");
        let checked: Vec<&str> = form
            .tag_choices
            .iter()
            .filter(|c| c.checked)
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(checked, ["Wifi", "Dog Friendly"]);
        assert_eq!(form.tag_choices.len(), TAG_CHOICES.len() + 1);
    }
}
