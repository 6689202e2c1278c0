use schema_scan_rs::endpoints::parse_endpoints_str;

#[test]
fn parse_hosts_ports_comments_and_dedup() {
    let input = r#"
        # production fleet
        db-prod-1
        db-prod-2:5433  # replica port
        db-prod-1       # duplicate
        # blank line follows

    "#;

    let eps = parse_endpoints_str(input).expect("parse ok");
    let hosts: Vec<_> = eps.iter().map(|e| e.host.as_str()).collect();
    assert_eq!(hosts, vec!["db-prod-1", "db-prod-2"]);
    assert_eq!(eps[0].port, None);
    assert_eq!(eps[1].port, Some(5433));
}

#[test]
fn invalid_port_rejected() {
    let input = "db-a:0\n"; // invalid: out of range
    assert!(parse_endpoints_str(input).is_err());
}
