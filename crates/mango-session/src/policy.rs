//! The usability rule applied on every authenticated request and before
//! every refresh.

use crate::Session;

/// Returns `true` if the session carries an upstream credential.
///
/// A presence check only: `expires_at` is not compared
/// against the clock here. Stores stop serving a session once its window
/// closes, so an expired record never reaches this function through a
/// lookup, but a caller holding a stale clone will still see it as usable.
pub fn is_usable(session: &Session) -> bool {
    !session.access_token.is_empty()
}
