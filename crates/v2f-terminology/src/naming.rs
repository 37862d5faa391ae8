#![deny(unsafe_code)]

//! Naming-system registry: normalizes code-system identifiers given as an
//! HL7 alias, a bare OID, a `urn:oid:` form, or a URI to their canonical
//! system URI, keeping the original text on the side.

use std::sync::LazyLock;

#[derive(Debug)]
struct NamingSystem {
    uri: &'static str,
    oid: &'static str,
    aliases: &'static [&'static str],
}

static NAMING_SYSTEMS: LazyLock<Vec<NamingSystem>> = LazyLock::new(|| {
    vec![
        NamingSystem {
            uri: "http://loinc.org",
            oid: "2.16.840.1.113883.6.1",
            aliases: &["LN", "LOINC"],
        },
        NamingSystem {
            uri: "http://snomed.info/sct",
            oid: "2.16.840.1.113883.6.96",
            aliases: &["SCT", "SNM", "SNOMEDCT"],
        },
        NamingSystem {
            uri: "http://hl7.org/fhir/sid/icd-10-cm",
            oid: "2.16.840.1.113883.6.90",
            aliases: &["I10", "ICD10CM", "ICD-10-CM"],
        },
        NamingSystem {
            uri: "http://hl7.org/fhir/sid/icd-9-cm",
            oid: "2.16.840.1.113883.6.103",
            aliases: &["I9", "ICD9CM", "ICD-9-CM"],
        },
        NamingSystem {
            uri: "http://www.ama-assn.org/go/cpt",
            oid: "2.16.840.1.113883.6.12",
            aliases: &["C4", "CPT"],
        },
        NamingSystem {
            uri: "http://www.nlm.nih.gov/research/umls/rxnorm",
            oid: "2.16.840.1.113883.6.88",
            aliases: &["RXNORM"],
        },
        NamingSystem {
            uri: "http://hl7.org/fhir/sid/ndc",
            oid: "2.16.840.1.113883.6.69",
            aliases: &["NDC"],
        },
        NamingSystem {
            uri: "http://hl7.org/fhir/sid/cvx",
            oid: "2.16.840.1.113883.12.292",
            aliases: &["CVX"],
        },
        NamingSystem {
            uri: "http://hl7.org/fhir/sid/us-ssn",
            oid: "2.16.840.1.113883.4.1",
            aliases: &["SS", "SSN", "USSSA"],
        },
        NamingSystem {
            uri: "urn:oid:2.16.840.1.113883.4.3",
            oid: "2.16.840.1.113883.4.3",
            aliases: &["DL", "DLN"],
        },
        NamingSystem {
            uri: "http://unitsofmeasure.org",
            oid: "2.16.840.1.113883.6.8",
            aliases: &["UCUM"],
        },
    ]
});

/// A normalized code-system identifier, with the text it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemLookup {
    pub system: String,
    pub original: String,
}

fn looks_like_oid(value: &str) -> bool {
    !value.is_empty()
        && value.chars().all(|c| c.is_ascii_digit() || c == '.')
        && value.contains('.')
        && !value.starts_with('.')
        && !value.ends_with('.')
}

/// Normalize a raw system identifier.
///
/// Returns `None` only for input that matches no known system and is not
/// OID-shaped; an unknown OID still normalizes to its `urn:oid:` form so
/// the identifier survives verbatim.
pub fn normalize_system(raw: &str) -> Option<SystemLookup> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let found = |system: &str| {
        Some(SystemLookup {
            system: system.to_string(),
            original: trimmed.to_string(),
        })
    };

    let oid_candidate = trimmed.strip_prefix("urn:oid:").unwrap_or(trimmed);
    for entry in NAMING_SYSTEMS.iter() {
        if entry.uri.eq_ignore_ascii_case(trimmed) || entry.oid == oid_candidate {
            return found(entry.uri);
        }
        if entry
            .aliases
            .iter()
            .any(|alias| alias.eq_ignore_ascii_case(trimmed))
        {
            return found(entry.uri);
        }
    }
    if looks_like_oid(oid_candidate) {
        return found(&format!("urn:oid:{oid_candidate}"));
    }
    None
}
