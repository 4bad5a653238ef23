//! Private-address classification for resolved egress targets.
use std::net::{ IpAddr, Ipv4Addr };

/// True when `addr` must not be contacted. Anything other than IPv4 is refused.
pub fn is_private_address(addr: &IpAddr) -> bool {
    match addr {
        IpAddr::V4(v4) => is_private_ipv4(*v4),
        IpAddr::V6(_) => true,
    }
}

/// True if any address in the set is private; one bad record poisons the lookup.
pub fn has_private_address<'a, I>(addrs: I) -> bool where I: IntoIterator<Item = &'a IpAddr> {
    addrs.into_iter().any(is_private_address)
}

pub fn is_private_ipv4(addr: Ipv4Addr) -> bool {
    let [first, second, third, fourth] = addr.octets();

    if reads_as(first, |v| v == 127) {
        // Only the exact tail is caught here; other 127/8 forms hit the loopback check below.
        if (second, third, fourth) == (0, 0, 1) {
            return true;
        }
    } else if reads_as(first, |v| v == 10) {
        return true;
    } else if reads_as(first, |v| v == 172) {
        return reads_as(second, |v| (16..=31).contains(&v));
    } else if reads_as(first, |v| v == 192) {
        return reads_as(second, |v| v == 168);
    }

    addr.is_private() || addr.is_loopback() || addr.is_unspecified() || addr.is_link_local()
}

/// Tests an octet's decimal digits read as octal (decimal when they are not
/// valid octal) and as hexadecimal; either reading may match.
fn reads_as(octet: u8, matches: impl Fn(u32) -> bool) -> bool {
    let digits = octet.to_string();
    let as_octal = u32::from_str_radix(&digits, 8).unwrap_or(u32::from(octet));
    let as_hex = u32::from_str_radix(&digits, 16).unwrap_or(u32::from(octet));
    matches(as_octal) || matches(as_hex)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn private(addr: &str) -> bool {
        is_private_address(&addr.parse().unwrap())
    }

    #[test]
    fn test_loopback() {
        assert!(private("127.0.0.1"));
        // Not matched by the exact-tail branch, caught by the generic loopback check.
        assert!(private("127.1.2.3"));
        assert!(private("127.255.255.254"));
    }

    #[test]
    fn test_ten_block() {
        assert!(private("10.0.0.5"));
        assert!(private("10.255.255.255"));
    }

    #[test]
    fn test_172_block() {
        assert!(private("172.16.0.1"));
        assert!(private("172.20.1.1"));
        assert!(private("172.31.255.255"));
        assert!(!private("172.15.0.1"));
        assert!(!private("172.32.0.1"));
        assert!(!private("172.33.1.1"));
    }

    #[test]
    fn test_192_block() {
        assert!(private("192.168.1.1"));
        assert!(!private("192.169.1.1"));
        assert!(!private("192.0.2.1"));
    }

    #[test]
    fn test_unspecified_and_link_local() {
        assert!(private("0.0.0.0"));
        assert!(private("169.254.169.254"));
    }

    #[test]
    fn test_public_addresses() {
        assert!(!private("8.8.8.8"));
        assert!(!private("93.184.216.34"));
        assert!(!private("1.1.1.1"));
    }

    #[test]
    fn test_alternate_radix_readings() {
        // "12" read as octal is 10.
        assert!(private("12.0.0.1"));
        // "177" read as octal is 127; the exact tail is required.
        assert!(private("177.0.0.1"));
        assert!(!private("177.0.0.2"));
        // "254" as octal is 172, "20" as octal is 16.
        assert!(private("254.20.0.1"));
        // "14" as hex is 20.
        assert!(private("254.14.0.1"));
        // "40" as octal is 32, outside 16..=31.
        assert!(!private("254.40.0.1"));
    }

    #[test]
    fn test_ipv6_always_refused() {
        assert!(private("::1"));
        assert!(private("2606:4700:4700::1111"));
    }

    #[test]
    fn test_any_private_poisons_set() {
        let addrs: Vec<IpAddr> = vec!["8.8.8.8".parse().unwrap(), "10.1.1.1".parse().unwrap()];
        assert!(has_private_address(&addrs));
        let public: Vec<IpAddr> = vec!["8.8.8.8".parse().unwrap(), "1.1.1.1".parse().unwrap()];
        assert!(!has_private_address(&public));
    }
}
