//! Matches the client IP of an event against configured addresses and networks.

use std::net::IpAddr;

use ipnetwork::IpNetwork;

/// Checks if the client IP is contained in any of the given addresses or CIDR networks.
///
/// Entries that are neither a valid address nor a valid network are skipped. An event without a
/// client IP never matches.
pub fn matches<It, S>(client_ip: Option<IpAddr>, networks: It) -> bool
where
    It: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let Some(client_ip) = client_ip else {
        return false;
    };

    networks.into_iter().any(|network| {
        network
            .as_ref()
            .parse::<IpNetwork>()
            .is_ok_and(|network| network.contains(client_ip))
    })
}

/// Returns `true` if the value parses as an IP address or a CIDR network.
pub fn is_valid_network(value: &str) -> bool {
    value.parse::<IpNetwork>().is_ok()
}
