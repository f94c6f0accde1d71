//! Host normalization and address classification for SSRF checks.
//!
//! Nothing here touches the network: hosts are classified purely from their
//! literal text.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// Why an address must not be fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressClass {
    CloudMetadata,
    Loopback,
    Unspecified,
    Private,
    LinkLocal,
    Multicast,
    Reserved,
}

impl fmt::Display for AddressClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AddressClass::CloudMetadata => "Cloud metadata endpoint",
            AddressClass::Loopback => "Loopback address",
            AddressClass::Unspecified => "Unspecified address",
            AddressClass::Private => "Private network address",
            AddressClass::LinkLocal => "Link-local address",
            AddressClass::Multicast => "Multicast address",
            AddressClass::Reserved => "Reserved address",
        };
        f.write_str(name)
    }
}

const METADATA_V4: Ipv4Addr = Ipv4Addr::new(169, 254, 169, 254);
const METADATA_V6: Ipv6Addr = Ipv6Addr::new(0xfd00, 0x0ec2, 0, 0, 0, 0, 0, 0x0254);

/// Extract the host exactly as written in the URL's authority.
///
/// Userinfo and port are dropped; IPv6 brackets are kept.
pub fn raw_host(url: &str) -> Option<&str> {
    let (_, rest) = url.split_once("://")?;
    let end = rest
        .find(|c| matches!(c, '/' | '?' | '#' | '\\'))
        .unwrap_or(rest.len());
    let authority = &rest[..end];
    let host_port = authority
        .rfind('@')
        .map_or(authority, |at| &authority[at + 1..]);

    let host = if host_port.starts_with('[') {
        match host_port.find(']') {
            Some(close) => &host_port[..=close],
            None => host_port,
        }
    } else {
        host_port.split(':').next().unwrap_or(host_port)
    };

    (!host.is_empty()).then_some(host)
}

/// Canonicalize an IP literal in any form a resolver would accept.
///
/// Accepts dotted IPv4 with 1 to 4 parts in decimal, octal (`0177`) or hex
/// (`0x7f`), bracketed or bare IPv6, and folds IPv4-mapped and
/// IPv4-compatible IPv6 to IPv4.
/// Returns `None` for hostnames.
pub fn normalize_host(text: &str) -> Option<IpAddr> {
    let text = text.trim();
    let unbracketed = text
        .strip_prefix('[')
        .and_then(|t| t.strip_suffix(']'))
        .unwrap_or(text);

    if let Ok(v6) = unbracketed.parse::<Ipv6Addr>() {
        return Some(fold_v6(v6));
    }

    if let Some(v4) = parse_inet_aton(unbracketed) {
        return Some(IpAddr::V4(v4));
    }

    let parsed = url::Url::parse(&format!("http://{}/", text)).ok()?;
    match parsed.host()? {
        url::Host::Ipv4(v4) => Some(IpAddr::V4(v4)),
        url::Host::Ipv6(v6) => Some(fold_v6(v6)),
        url::Host::Domain(_) => None,
    }
}

/// `::ffff:a.b.c.d` and `::a.b.c.d` become IPv4; `::` and `::1` stay IPv6.
fn fold_v6(v6: Ipv6Addr) -> IpAddr {
    if let Some(v4) = v6.to_ipv4_mapped() {
        return IpAddr::V4(v4);
    }
    let compatible = v6.segments()[..6].iter().all(|&s| s == 0);
    if compatible && !v6.is_loopback() && !v6.is_unspecified() {
        let [.., a, b, c, d] = v6.octets();
        return IpAddr::V4(Ipv4Addr::new(a, b, c, d));
    }
    IpAddr::V6(v6)
}

/// BSD `inet_aton` semantics: the last part fills the remaining bytes.
fn parse_inet_aton(text: &str) -> Option<Ipv4Addr> {
    let text = text.strip_suffix('.').unwrap_or(text);
    let parts = text
        .split('.')
        .map(parse_part)
        .collect::<Option<Vec<u32>>>()?;

    let value = match parts.as_slice() {
        [a] => *a,
        [a, b] if *a <= 0xff && *b <= 0x00ff_ffff => (a << 24) | b,
        [a, b, c] if *a <= 0xff && *b <= 0xff && *c <= 0xffff => (a << 24) | (b << 16) | c,
        [a, b, c, d] if [a, b, c, d].iter().all(|p| **p <= 0xff) => {
            (a << 24) | (b << 16) | (c << 8) | d
        }
        _ => return None,
    };
    Some(Ipv4Addr::from(value))
}

fn parse_part(part: &str) -> Option<u32> {
    if part.is_empty() {
        return None;
    }
    let (digits, radix) = if let Some(hex) = part
        .strip_prefix("0x")
        .or_else(|| part.strip_prefix("0X"))
    {
        (hex, 16)
    } else if part.len() > 1 && part.starts_with('0') {
        (&part[1..], 8)
    } else {
        (part, 10)
    };
    if digits.is_empty() {
        // "0x" alone is zero
        return (radix == 16).then_some(0);
    }
    if !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    u32::from_str_radix(digits, radix).ok()
}

/// Classify an address that must never be fetched. `None` means public.
pub fn classify(ip: IpAddr) -> Option<AddressClass> {
    match ip {
        IpAddr::V4(v4) => classify_v4(v4),
        IpAddr::V6(v6) => classify_v6(v6),
    }
}

fn classify_v4(ip: Ipv4Addr) -> Option<AddressClass> {
    let [a, b, c, _] = ip.octets();
    let class = if ip == METADATA_V4 {
        AddressClass::CloudMetadata
    } else if ip.is_loopback() {
        AddressClass::Loopback
    } else if ip.is_unspecified() {
        AddressClass::Unspecified
    } else if ip.is_private()
        || a == 0
        // carrier-grade NAT 100.64.0.0/10
        || (a == 100 && (b & 0xc0) == 64)
        || (a == 192 && b == 0 && c == 0)
    {
        AddressClass::Private
    } else if ip.is_link_local() {
        AddressClass::LinkLocal
    } else if ip.is_multicast() {
        AddressClass::Multicast
    } else if a >= 240
        || ip.is_broadcast()
        || ip.is_documentation()
        // benchmarking 198.18.0.0/15
        || (a == 198 && (b & 0xfe) == 18)
    {
        AddressClass::Reserved
    } else {
        return None;
    };
    Some(class)
}

fn classify_v6(ip: Ipv6Addr) -> Option<AddressClass> {
    let [first, second, third, fourth, ..] = ip.segments();
    let class = if ip == METADATA_V6 {
        AddressClass::CloudMetadata
    } else if ip.is_loopback() {
        AddressClass::Loopback
    } else if ip.is_unspecified() {
        AddressClass::Unspecified
    } else if ip.is_unique_local() {
        AddressClass::Private
    } else if ip.is_unicast_link_local() {
        AddressClass::LinkLocal
    } else if ip.is_multicast() {
        AddressClass::Multicast
    } else if first <= 0x00ff
        // discard-only 100::/64
        || (first == 0x0100 && second == 0 && third == 0 && fourth == 0)
        // IETF protocol assignments 2001::/23
        || (first == 0x2001 && second < 0x0200)
        // documentation 2001:db8::/32
        || (first == 0x2001 && second == 0x0db8)
    {
        AddressClass::Reserved
    } else {
        return None;
    };
    Some(class)
}
