//! Utility functions that support certificate chain validation

use alloc::format;
use alloc::string::{String, ToString};
use core::fmt::Display;
use std::net::{Ipv4Addr, Ipv6Addr};

use lazy_static::lazy_static;
use log::{debug, error};
use regex::Regex;
use serde::Serializer;

use der::asn1::{Ia5String, PrintableString, Utf8StringRef};
use der::{Encode, Tagged};
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::ext::pkix::name::GeneralName;
use x509_cert::name::Name;
use x509_cert::Certificate;

use crate::util::error::*;

/// `is_self_issued` returns true if the subject field in the certificate is the same as the issuer
/// field.
pub fn is_self_issued(cert: &Certificate) -> bool {
    compare_names(&cert.tbs_certificate.issuer, &cert.tbs_certificate.subject)
}

/// `name_to_string` returns a string representation of given Name value.
pub fn name_to_string(name: &Name) -> String {
    name.to_string()
}

/// log a message with the given name appended
pub fn log_error_for_name(name: &Name, msg: &str) {
    error!(
        "Encountered error while processing certificate with subject {}: {}",
        name_to_string(name),
        msg
    );
}

/// `general_name_to_string` renders a GeneralName for use in log output and failure messages.
pub fn general_name_to_string(gn: &GeneralName) -> String {
    match gn {
        GeneralName::OtherName(on) => format!("otherName:{}", on.type_id),
        GeneralName::Rfc822Name(rfc822) => format!("email:{}", rfc822),
        GeneralName::DnsName(dns) => format!("DNS:{}", dns),
        GeneralName::DirectoryName(dn) => format!("DirName:{}", dn),
        GeneralName::EdiPartyName(_) => "ediPartyName".to_string(),
        GeneralName::UniformResourceIdentifier(uri) => format!("URI:{}", uri),
        GeneralName::IpAddress(ip) => format!("IP:{}", ip_bytes_to_string(ip.as_bytes())),
        GeneralName::RegisteredId(oid) => format!("RID:{}", oid),
    }
}

/// Renders a 4 or 16 byte host address, or an 8 or 32 byte address/mask pair, for display.
fn ip_bytes_to_string(b: &[u8]) -> String {
    match b.len() {
        4 => Ipv4Addr::new(b[0], b[1], b[2], b[3]).to_string(),
        8 => format!(
            "{}/{}",
            Ipv4Addr::new(b[0], b[1], b[2], b[3]),
            Ipv4Addr::new(b[4], b[5], b[6], b[7])
        ),
        16 | 32 => {
            let mut addr = [0u8; 16];
            addr.copy_from_slice(&b[0..16]);
            if b.len() == 16 {
                Ipv6Addr::from(addr).to_string()
            } else {
                let mut mask = [0u8; 16];
                mask.copy_from_slice(&b[16..32]);
                format!("{}/{}", Ipv6Addr::from(addr), Ipv6Addr::from(mask))
            }
        }
        _ => b.iter().map(|c| format!("{:02x}", c)).collect(),
    }
}

/// get_value_from_rdn returns the value from AttributeTypeAndValue as a string for use in comparing
/// values where leading whitespace may be a factor
pub fn get_value_from_rdn(atav: &AttributeTypeAndValue) -> Result<String> {
    let val = match atav.value.tag() {
        der::Tag::PrintableString => atav
            .value
            .decode_as()
            .ok()
            .map(|s: PrintableString| s.to_string()),
        der::Tag::Utf8String => atav
            .value
            .decode_as()
            .ok()
            .map(|s: Utf8StringRef<'_>| s.to_string()),
        der::Tag::Ia5String => atav
            .value
            .decode_as()
            .ok()
            .map(|s: Ia5String| s.to_string()),
        _ => None,
    };

    let mut s = "".to_string();
    if let Some(val) = val {
        let mut iter = val.char_indices().peekable();
        while let Some((i, c)) = iter.next() {
            match c {
                '#' if i == 0 => s.push_str("\\#"),
                ' ' if i == 0 || iter.peek().is_none() => s.push_str("\\ "),
                '"' | '+' | ',' | ';' | '<' | '>' | '\\' => s.push_str(format!("\\{}", c).as_str()),
                '\x00'..='\x1f' | '\x7f' => s.push_str(format!("\\{:02x}", c as u8).as_str()),
                _ => s.push(c),
            }
        }
    } else {
        let val = atav.value.to_der()?;
        s.push_str(format!("{}=#", atav.oid).as_str());
        for c in val {
            s.push_str(format!("{:02x}", c).as_str());
        }
    }
    Ok(s)
}

/// Compares two attribute values ignoring case, surrounding whitespace and runs of internal
/// whitespace.
fn attribute_values_match(l: &AttributeTypeAndValue, r: &AttributeTypeAndValue) -> bool {
    lazy_static! {
        static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
    }

    if l.oid != r.oid {
        return false;
    }
    if l.value == r.value {
        return true;
    }

    let (l_str_val, r_str_val) = match (get_value_from_rdn(l), get_value_from_rdn(r)) {
        (Ok(l), Ok(r)) => (l.replace("\\ ", " "), r.replace("\\ ", " ")),
        _ => return false,
    };

    let l_val = l_str_val.trim().to_lowercase();
    let r_val = r_str_val.trim().to_lowercase();
    if l_val == r_val {
        return true;
    }

    //collapse multiple whitespace instances into one
    WHITESPACE.replace_all(l_val.as_str(), " ") == WHITESPACE.replace_all(r_val.as_str(), " ")
}

/// [`compare_names`] compares two Name values returning true if they match and false otherwise.
///
/// Attribute values that differ only by capitalization, leading or trailing whitespace or runs of
/// internal whitespace are treated as equal.
pub fn compare_names(left: &Name, right: &Name) -> bool {
    // no match if not the same number of RDNs
    if left.0.len() != right.0.len() {
        return false;
    }

    for (lrdn, rrdn) in left.0.iter().zip(right.0.iter()) {
        if lrdn.0.len() != rrdn.0.len() {
            return false;
        }

        if lrdn != rrdn
            && !lrdn
                .0
                .iter()
                .zip(rrdn.0.iter())
                .all(|(l, r)| attribute_values_match(l, r))
        {
            return false;
        }
    }
    true
}

/// `descended_from_dn` returns true if name is equal to or descended from subtree and false
/// otherwise, i.e., if the RDNs of subtree are an RDN-ordered prefix of the RDNs of name.
///
/// The minimum and maximum values bound the number of RDNs name may add beneath subtree.
pub fn descended_from_dn(subtree: &Name, name: &Name, min: u32, max: Option<u32>) -> bool {
    //if descendant fewer rdns then it is not a descendant
    if subtree.0.len() > name.0.len() {
        return false;
    }

    let diff = (name.0.len() - subtree.0.len()) as u32;
    if diff < min {
        return false;
    }
    if let Some(max) = max {
        if diff > max {
            return false;
        }
    }

    for (l, r) in subtree.0.iter().zip(name.0.iter()) {
        if l == r {
            continue;
        }

        if l.0.len() != r.0.len() {
            // diff number of attributes
            return false;
        }

        for (la, ra) in l.0.iter().zip(r.0.iter()) {
            if la.oid != ra.oid {
                // if the type of attribute, i.e., c, cn, o, is different, return false
                return false;
            }
            if la.value.value() == ra.value.value() {
                //not checking tag on the any since that is where the issue is most likely
                if la.value.tag() != ra.value.tag() {
                    debug!("Permitting a DN name constraint match despite different character sets");
                }
            } else if attribute_values_match(la, ra) {
                debug!("Permitting a DN name constraint match despite different capitalization");
            } else {
                return false;
            }
        }
    }

    true
}

/// `serialize_display` serializes any [`Display`] value as a string.
pub fn serialize_display<T, S>(value: &T, serializer: S) -> core::result::Result<S::Ok, S::Error>
where
    T: Display,
    S: Serializer,
{
    serializer.collect_str(value)
}
