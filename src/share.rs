//! Share Links
//!
//! A list is addressed purely by its identifier, appended as a single
//! path segment to the application origin. Identifiers are checked
//! before anything is asked of the datastore.

use uuid::Uuid;

/// Length of the canonical hyphenated form
const HYPHENATED_LEN: usize = 36;

/// Parse a list identifier, accepting only the hyphenated UUID form
pub fn parse_list_id(raw: &str) -> Option<Uuid> {
    if raw.len() != HYPHENATED_LEN {
        return None;
    }
    Uuid::try_parse(raw).ok()
}

pub fn is_valid_list_id(raw: &str) -> bool {
    parse_list_id(raw).is_some()
}

/// Link that opens the list for anyone who has it
pub fn share_url(base_origin: &str, list_id: Uuid) -> String {
    format!("{}/{}", base_origin.trim_end_matches('/'), list_id)
}

/// Where a request path leads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Landing view, where new lists are created
    Landing,
    List(Uuid),
}

impl Route {
    /// Resolve a path. Missing or malformed ids fall back to the landing view.
    pub fn resolve(path: &str) -> Self {
        let segment = path.trim_matches('/');
        if segment.is_empty() {
            return Route::Landing;
        }
        match parse_list_id(segment) {
            Some(id) => Route::List(id),
            None => {
                log::debug!("Redirecting malformed list path {:?} to landing", path);
                Route::Landing
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "6f1c2a9e-3b7d-4e5f-9a0b-1c2d3e4f5a6b";

    #[test]
    fn test_valid_ids() {
        assert!(is_valid_list_id(ID));
        assert!(is_valid_list_id(&ID.to_uppercase()));
    }

    #[test]
    fn test_invalid_ids() {
        assert!(!is_valid_list_id(""));
        assert!(!is_valid_list_id("not-a-uuid"));
        // Other UUID spellings are not share ids
        assert!(!is_valid_list_id(&ID.replace('-', "")));
        assert!(!is_valid_list_id(&format!("{{{}}}", ID)));
        assert!(!is_valid_list_id("6f1c2a9e-3b7d-4e5f-9a0b-1c2d3e4f5a6z"));
    }

    #[test]
    fn test_share_url() {
        let id = Uuid::parse_str(ID).unwrap();
        assert_eq!(share_url("https://noto.app", id), format!("https://noto.app/{}", ID));
        assert_eq!(share_url("https://noto.app/", id), format!("https://noto.app/{}", ID));
    }

    #[test]
    fn test_route_resolution() {
        let id = Uuid::parse_str(ID).unwrap();
        assert_eq!(Route::resolve("/"), Route::Landing);
        assert_eq!(Route::resolve(""), Route::Landing);
        assert_eq!(Route::resolve(&format!("/{}", ID)), Route::List(id));
        assert_eq!(Route::resolve("/garbage"), Route::Landing);
        assert_eq!(Route::resolve(&format!("/{}/extra", ID)), Route::Landing);
    }
}
