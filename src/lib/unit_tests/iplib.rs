// SPDX-License-Identifier: Apache-2.0

use crate::{
    canonicalize_ip_addr, is_ip_in_net, is_subnet_of, parse_ip_net,
    sanitize_ip_network, ErrorKind,
};

#[test]
fn test_canonicalize_ip_addr() {
    assert_eq!(canonicalize_ip_addr("2001:0db8::1").unwrap(), "2001:db8::1");
    assert_eq!(
        canonicalize_ip_addr("2001:db8:0:0:0:0:0:1").unwrap(),
        "2001:db8::1"
    );
    assert_eq!(
        canonicalize_ip_addr("::ffff:c000:0201").unwrap(),
        "::ffff:192.0.2.1"
    );
    assert_eq!(canonicalize_ip_addr(" 192.0.2.1 ").unwrap(), "192.0.2.1");
    let result = canonicalize_ip_addr("192.0.2.256");
    assert!(result.is_err());
    if let Err(e) = result {
        assert_eq!(e.kind(), ErrorKind::InvalidArgument);
    }
}

#[test]
fn test_sanitize_ip_network() {
    assert_eq!(sanitize_ip_network("192.0.2.1/24").unwrap(), "192.0.2.0/24");
    assert_eq!(sanitize_ip_network("192.0.2.1").unwrap(), "192.0.2.1/32");
    assert_eq!(sanitize_ip_network("0.0.0.0/0").unwrap(), "0.0.0.0/0");
    assert_eq!(
        sanitize_ip_network("2001:db8:1:0::1/64").unwrap(),
        "2001:db8:1::/64"
    );
    assert_eq!(sanitize_ip_network("2001:db8::1").unwrap(), "2001:db8::1/128");
}

#[test]
fn test_parse_ip_net_invalid() {
    for ip_net in ["192.0.2.1/33", "2001:db8::/129", "192.0.2.0/abc", "/24"]
    {
        let result = parse_ip_net(ip_net);
        assert!(result.is_err(), "{ip_net} should be invalid");
        if let Err(e) = result {
            assert_eq!(e.kind(), ErrorKind::InvalidArgument);
        }
    }
}

#[test]
fn test_is_subnet_of() {
    assert!(is_subnet_of("192.0.2.128/25", "192.0.2.0/24").unwrap());
    assert!(is_subnet_of("192.0.2.0/24", "192.0.2.0/24").unwrap());
    assert!(!is_subnet_of("192.0.2.0/23", "192.0.2.0/24").unwrap());
    assert!(!is_subnet_of("198.51.100.0/25", "192.0.2.0/24").unwrap());
    assert!(is_subnet_of("2001:db8:1::/64", "2001:db8::/32").unwrap());
    assert!(!is_subnet_of("::/0", "0.0.0.0/0").unwrap());
}

#[test]
fn test_is_ip_in_net() {
    assert!(is_ip_in_net("192.0.2.1", "192.0.2.0/24").unwrap());
    assert!(!is_ip_in_net("192.0.3.1", "192.0.2.0/24").unwrap());
    assert!(is_ip_in_net("192.0.3.1", "0.0.0.0/0").unwrap());
    assert!(is_ip_in_net("2001:db8::1", "2001:db8::/64").unwrap());
    assert!(!is_ip_in_net("2001:db8::1", "192.0.2.0/24").unwrap());
}
