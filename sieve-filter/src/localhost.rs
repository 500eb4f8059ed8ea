//! Detects events originating from the local host.
use sieve_event::Event;
use url::Url;

const LOCAL_IPS: &[&str] = &["127.0.0.1", "::1"];
const LOCAL_DOMAINS: &[&str] = &["127.0.0.1", "localhost"];

/// Checks if the event originates from the local host.
///
/// This is the case if the user's IP address is a loopback address, or if the request URL points
/// to a local domain or a `file://` resource.
pub fn matches(event: &Event) -> bool {
    if let Some(ip_addr) = event.ip_address() {
        if LOCAL_IPS.contains(&ip_addr) {
            return true;
        }
    }

    if let Some(url) = get_url(event) {
        if let Some(host) = url.host_str() {
            if LOCAL_DOMAINS.contains(&host) {
                return true;
            }
        }
        if url.scheme() == "file" {
            return true;
        }
    }

    false
}

fn get_url(event: &Event) -> Option<Url> {
    Url::parse(event.url()?).ok()
}
