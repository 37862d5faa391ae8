#![deny(unsafe_code)]

//! Static HL7 code tables (table number, code, display).
//!
//! Built once on first use and read-only thereafter; safe to share across
//! threads without locking. Lookup tolerates the `HL7nnnn` prefix form and
//! differing code case.

use std::collections::HashMap;
use std::sync::LazyLock;

/// One HL7 user/HL7-defined table.
#[derive(Debug)]
pub struct CodeTable {
    /// Four-digit table id, e.g. `0001`.
    pub id: &'static str,
    pub name: &'static str,
    /// Code system URI carried on codings built from this table.
    pub system: &'static str,
    entries: HashMap<&'static str, &'static str>,
}

impl CodeTable {
    /// Display text for `code`, exact match first, then case-insensitive.
    pub fn display_for(&self, code: &str) -> Option<&'static str> {
        let trimmed = code.trim();
        if let Some(display) = self.entries.get(trimmed) {
            return Some(display);
        }
        let upper = trimmed.to_uppercase();
        self.entries
            .iter()
            .find(|(key, _)| key.to_uppercase() == upper)
            .map(|(_, display)| *display)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.display_for(code).is_some()
    }
}

macro_rules! code_table {
    ($id:literal, $name:literal, $system:literal, { $($code:literal => $display:literal),+ $(,)? }) => {
        CodeTable {
            id: $id,
            name: $name,
            system: $system,
            entries: HashMap::from([$(($code, $display)),+]),
        }
    };
}

static TABLES: LazyLock<Vec<CodeTable>> = LazyLock::new(|| {
    vec![
        code_table!("0001", "Administrative Sex",
            "http://terminology.hl7.org/CodeSystem/v2-0001", {
            "A" => "Ambiguous",
            "F" => "Female",
            "M" => "Male",
            "N" => "Not applicable",
            "O" => "Other",
            "U" => "Unknown",
        }),
        code_table!("0002", "Marital Status",
            "http://terminology.hl7.org/CodeSystem/v2-0002", {
            "A" => "Separated",
            "C" => "Common law",
            "D" => "Divorced",
            "E" => "Legally Separated",
            "G" => "Living together",
            "M" => "Married",
            "P" => "Domestic partner",
            "S" => "Single",
            "T" => "Unreported",
            "U" => "Unknown",
            "W" => "Widowed",
        }),
        code_table!("0004", "Patient Class",
            "http://terminology.hl7.org/CodeSystem/v2-0004", {
            "B" => "Obstetrics",
            "C" => "Commercial Account",
            "E" => "Emergency",
            "I" => "Inpatient",
            "N" => "Not Applicable",
            "O" => "Outpatient",
            "P" => "Preadmit",
            "R" => "Recurring patient",
            "U" => "Unknown",
        }),
        code_table!("0063", "Relationship",
            "http://terminology.hl7.org/CodeSystem/v2-0063", {
            "ASC" => "Associate",
            "BRO" => "Brother",
            "CGV" => "Care giver",
            "CHD" => "Child",
            "DOM" => "Life partner",
            "EMC" => "Emergency contact",
            "EME" => "Employee",
            "EMR" => "Employer",
            "EXF" => "Extended family",
            "FCH" => "Foster child",
            "FND" => "Friend",
            "FTH" => "Father",
            "GCH" => "Grandchild",
            "GRD" => "Guardian",
            "GRP" => "Grandparent",
            "MGR" => "Manager",
            "MTH" => "Mother",
            "NCH" => "Natural child",
            "OAD" => "Other adult",
            "OTH" => "Other",
            "OWN" => "Owner",
            "PAR" => "Parent",
            "SCH" => "Stepchild",
            "SEL" => "Self",
            "SIB" => "Sibling",
            "SIS" => "Sister",
            "SPO" => "Spouse",
            "TRA" => "Trainer",
            "UNK" => "Unknown",
            "WRD" => "Ward of court",
        }),
        code_table!("0078", "Interpretation Codes",
            "http://terminology.hl7.org/CodeSystem/v3-ObservationInterpretation", {
            "A" => "Abnormal",
            "AA" => "Critical abnormal",
            "H" => "High",
            "HH" => "Critical high",
            "L" => "Low",
            "LL" => "Critical low",
            "N" => "Normal",
            "S" => "Susceptible",
            "R" => "Resistant",
            "I" => "Intermediate",
        }),
        code_table!("0127", "Allergen Type",
            "http://terminology.hl7.org/CodeSystem/v2-0127", {
            "AA" => "Animal Allergy",
            "DA" => "Drug allergy",
            "EA" => "Environmental Allergy",
            "FA" => "Food allergy",
            "LA" => "Pollen Allergy",
            "MA" => "Miscellaneous allergy",
            "MC" => "Miscellaneous contraindication",
            "PA" => "Plant Allergy",
        }),
        code_table!("0128", "Allergy Severity",
            "http://terminology.hl7.org/CodeSystem/v2-0128", {
            "MI" => "Mild",
            "MO" => "Moderate",
            "SV" => "Severe",
            "U" => "Unknown",
        }),
        code_table!("0131", "Contact Role",
            "http://terminology.hl7.org/CodeSystem/v2-0131", {
            "C" => "Emergency Contact",
            "E" => "Employer",
            "F" => "Federal Agency",
            "I" => "Insurance Company",
            "N" => "Next-of-Kin",
            "O" => "Other",
            "S" => "State Agency",
            "U" => "Unknown",
        }),
        code_table!("0201", "Telecommunication Use Code",
            "http://terminology.hl7.org/CodeSystem/v2-0201", {
            "ASN" => "Answering Service Number",
            "BPN" => "Beeper Number",
            "EMR" => "Emergency Number",
            "NET" => "Network (email) Address",
            "ORN" => "Other Residence Number",
            "PRN" => "Primary Residence Number",
            "VHN" => "Vacation Home Number",
            "WPN" => "Work Number",
        }),
        code_table!("0202", "Telecommunication Equipment Type",
            "http://terminology.hl7.org/CodeSystem/v2-0202", {
            "BP" => "Beeper",
            "CP" => "Cellular or Mobile Phone",
            "FX" => "Fax",
            "Internet" => "Internet Address",
            "MD" => "Modem",
            "PH" => "Telephone",
            "SAT" => "Satellite Phone",
            "TDD" => "Telecommunications Device for the Deaf",
            "TTY" => "Teletypewriter",
            "X.400" => "X.400 email address",
        }),
    ]
});

/// Look up a table by id: `0001` and `HL70001` both resolve.
pub fn table(name: &str) -> Option<&'static CodeTable> {
    let trimmed = name.trim();
    let id = trimmed
        .strip_prefix("HL7")
        .or_else(|| trimmed.strip_prefix("hl7"))
        .unwrap_or(trimmed);
    TABLES.iter().find(|t| t.id == id)
}
