//! Utilities used by the event filter tests.

use sieve_event::{Event, Request};

/// Creates an Event with the specified user agent.
pub fn get_event_with_user_agent(user_agent: &str) -> Event {
    let mut request = Request::default();
    request
        .headers
        .insert("UsEr-AgeNT".to_owned(), user_agent.to_owned());

    Event {
        request: Some(request),
        ..Event::default()
    }
}
