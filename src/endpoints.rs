use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;

use crate::types::Endpoint;

/// Parse an endpoints file content into a deduplicated list of endpoints.
///
/// Supported formats per line:
/// - bare host: `db-prod-7.example.internal`
/// - host with port: `db-prod-7.example.internal:5433`
/// - comments: everything after `#` is ignored
/// - whitespace and blank lines are ignored
///
/// Hosts are DNS names; IPv6 address literals (and anything else with more
/// than one colon) are rejected. Duplicate hosts keep their first appearance.
pub fn parse_endpoints_str(s: &str) -> Result<Vec<Endpoint>> {
    let mut out: Vec<Endpoint> = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for (idx, raw_line) in s.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw_line.split('#').next().map(str::trim).unwrap_or("");
        if line.is_empty() {
            continue;
        }

        let (host, port) = match line.rsplit_once(':') {
            Some((h, p)) => {
                let port = parse_port_str(p.trim())
                    .with_context(|| format!("line {line_no}: invalid port: {p}"))?;
                (h.trim(), Some(port))
            }
            None => (line, None),
        };
        if host.is_empty() {
            bail!("line {line_no}: empty host");
        }
        if host.contains(':') {
            bail!("line {line_no}: expected host or host:port, got: {line}");
        }

        if seen.insert(host.to_string()) {
            out.push(Endpoint {
                host: host.to_string(),
                port,
                region: None,
            });
        }
    }

    Ok(out)
}

/// Load an endpoint list from a file path. Errors if the file cannot be read
/// or parsed.
pub fn load_endpoints_from_path(path: impl AsRef<Path>) -> Result<Vec<Endpoint>> {
    let content = fs::read_to_string(path.as_ref())
        .with_context(|| format!("failed to read endpoints file: {}", path.as_ref().display()))?;
    parse_endpoints_str(&content)
}

fn parse_port_str(s: &str) -> Result<u16> {
    let val: u32 = s.parse::<u32>().map_err(|e| anyhow::anyhow!(e))?;
    if val == 0 || val > 65535 {
        bail!("port out of range: {val}");
    }
    Ok(val as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bare_hosts() {
        let input = "db-a\ndb-b\n   db-c  \n";
        let eps = parse_endpoints_str(input).unwrap();
        let hosts: Vec<_> = eps.iter().map(|e| e.host.as_str()).collect();
        assert_eq!(hosts, vec!["db-a", "db-b", "db-c"]);
        assert!(eps.iter().all(|e| e.port.is_none()));
    }

    #[test]
    fn parse_host_with_port_and_dedup() {
        let input = "db-a:5433\ndb-b\ndb-a\n";
        let eps = parse_endpoints_str(input).unwrap();
        assert_eq!(eps.len(), 2);
        assert_eq!(eps[0].host, "db-a");
        assert_eq!(eps[0].port, Some(5433));
    }

    #[test]
    fn parse_with_comments_and_whitespace() {
        let input = r#"
            # production fleet
            db-prod-1   # primary
            db-prod-2:5433

            # blank lines and spaces should be fine
        "#;
        let eps = parse_endpoints_str(input).unwrap();
        let hosts: Vec<_> = eps.iter().map(|e| e.host.as_str()).collect();
        assert_eq!(hosts, vec!["db-prod-1", "db-prod-2"]);
    }

    #[test]
    fn invalid_port_errors() {
        assert!(parse_endpoints_str("db-a:70000\n").is_err());
        assert!(parse_endpoints_str("db-a:0\n").is_err());
    }

    #[test]
    fn empty_host_errors() {
        assert!(parse_endpoints_str(":5432\n").is_err());
    }

    #[test]
    fn ipv6_literals_rejected() {
        assert!(parse_endpoints_str("::1\n").is_err());
        assert!(parse_endpoints_str("[::1]:5432\n").is_err());
        assert!(parse_endpoints_str("fe80::1:5432\n").is_err());
    }
}
