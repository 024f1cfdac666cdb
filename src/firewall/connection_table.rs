//! Parsing of the firewall connection listing.
//!
//! The listing starts with a header line, followed by one row per tracked
//! connection: `client_ip server_ip client_port server_port`, separated by any
//! amount of whitespace. Newer firewall builds append a state column, which is
//! ignored.

use log::trace;
use std::net::Ipv4Addr;

use super::types::{Endpoint, FirewallRecord};

/// Parses every well-formed row of `listing`, skipping the header line.
pub fn parse_connection_table(listing: &str) -> Vec<FirewallRecord> {
    listing
        .lines()
        .skip(1)
        .filter_map(|line| {
            let record = parse_row(line);
            if record.is_none() && !line.trim().is_empty() {
                trace!("skipping malformed connection row: {:?}", line);
            }
            record
        })
        .collect()
}

fn parse_row(line: &str) -> Option<FirewallRecord> {
    let mut fields = line.split_whitespace();
    let client_ip: Ipv4Addr = fields.next()?.parse().ok()?;
    let server_ip: Ipv4Addr = fields.next()?.parse().ok()?;
    let client_port: u16 = fields.next()?.parse().ok()?;
    let server_port: u16 = fields.next()?.parse().ok()?;

    Some(FirewallRecord {
        client: Endpoint::new(client_ip, client_port),
        server: Endpoint::new(server_ip, server_port),
    })
}

/// Server endpoint of the first record whose client side is `client`.
pub fn find_destination(records: &[FirewallRecord], client: Endpoint) -> Option<Endpoint> {
    records
        .iter()
        .find(|record| record.client == client)
        .map(|record| record.server)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "\
in_ip            out_ip           in_port   out_port  state
10.1.1.1         10.1.2.2         40000     21        ONGOING
10.1.1.5         93.0.0.1         5000      80        PROXY
10.1.1.5         93.0.0.2         5000      80        PROXY
";

    #[test]
    fn test_header_is_skipped_and_state_column_ignored() {
        let records = parse_connection_table(LISTING);
        assert_eq!(records.len(), 3);
        assert_eq!(
            records[0],
            FirewallRecord {
                client: "10.1.1.1:40000".parse().unwrap(),
                server: "10.1.2.2:21".parse().unwrap(),
            }
        );
    }

    #[test]
    fn test_first_match_wins() {
        let records = parse_connection_table(LISTING);
        let server = find_destination(&records, "10.1.1.5:5000".parse().unwrap());
        assert_eq!(server, Some("93.0.0.1:80".parse().unwrap()));
    }

    #[test]
    fn test_port_must_match_too() {
        let records = parse_connection_table(LISTING);
        assert_eq!(
            find_destination(&records, "10.1.1.5:5001".parse().unwrap()),
            None
        );
    }

    #[test]
    fn test_malformed_rows_are_skipped() {
        let listing = "header\n\n10.1.1.1 10.1.2.2 notaport 80\n10.1.1.1 10.1.2.2\n1.2.3.4 5.6.7.8 1 2\n";
        let records = parse_connection_table(listing);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].server, "5.6.7.8:2".parse().unwrap());
    }

    #[test]
    fn test_only_header() {
        assert!(parse_connection_table("in_ip out_ip in_port out_port\n").is_empty());
        assert!(parse_connection_table("").is_empty());
    }
}
