//! End-to-end conversion of complete messages.

use std::sync::Arc;

use serde_json::json;

use v2f_core::{ConverterOptions, MessageConverter};
use v2f_model::{Message, SequentialIdGenerator};

const ADT_A01: &str = concat!(
    "MSH|^~\\&|RegSys|General Hospital|EHR|General Hospital|20240601120000||ADT^A01|MSG0001|P|2.6\r",
    "PID|1||12345^^^Hosp&1.2.3.4&ISO^MR||Doe^Jane^Q||19700215|F|||123 Main St^^Springfield^IL^62701||^PRN^PH^^^555^8675309\r",
    "NK1|1|Doe^John|SPO^Spouse|||\r",
    "PV1|1|I|ICU^2^A^General Hospital||||1234^Welby^Marcus||||||||||||V001\r",
    "AL1|1|DA|70618^Penicillin^RxNorm|SV|Anaphylaxis\r",
    "DG1|1||I10^Essential hypertension^I10||20180201|F\r",
    "OBX|1|NM|8480-6^Systolic^LN||120|mm Hg|||||F\r",
    "IN1|1|HMO^Health maintenance organization|ACME01|Acme Health",
);

fn deterministic_converter() -> MessageConverter {
    MessageConverter::new(
        ConverterOptions::default()
            .with_id_generator(Arc::new(SequentialIdGenerator::new("res")))
            .with_recorded("2024-06-01T12:00:00Z".parse().unwrap()),
    )
}

#[test]
fn admission_message_produces_the_expected_resources() {
    let message = Message::parse_er7(ADT_A01).unwrap();
    let bundle = deterministic_converter().convert(&message);

    let patient = bundle.first_of_type("Patient").unwrap();
    assert_eq!(patient.get_str("name[0].family"), Some("Doe"));
    assert_eq!(patient.get_str("identifier[0].value"), Some("12345"));
    assert_eq!(patient.get_str("gender"), Some("female"));
    assert_eq!(patient.get_str("birthDate"), Some("1970-02-15"));

    let encounter = bundle.first_of_type("Encounter").unwrap();
    assert_eq!(encounter.get_str("class.code"), Some("I"));
    assert_eq!(
        encounter.get_str("subject.reference"),
        Some(patient.local_reference().as_str())
    );

    let observation = bundle.first_of_type("Observation").unwrap();
    assert_eq!(observation.get("valueQuantity.value"), Some(&json!(120)));
    assert_eq!(
        observation.get_str("subject.reference"),
        Some(patient.local_reference().as_str())
    );

    assert!(bundle.first_of_type("RelatedPerson").is_some());
    assert!(bundle.first_of_type("AllergyIntolerance").is_some());
    assert!(bundle.first_of_type("Condition").is_some());
    assert!(bundle.first_of_type("Coverage").is_some());
    assert_eq!(
        bundle
            .first_of_type("Organization")
            .unwrap()
            .get_str("name"),
        Some("Acme Health")
    );
}

#[test]
fn every_synthesized_resource_gets_provenance_pointing_at_the_raw_message() {
    let message = Message::parse_er7(ADT_A01).unwrap();
    let bundle = deterministic_converter().convert(&message);

    let binary = bundle.first_of_type("Binary").unwrap();
    assert_eq!(binary.get_str("contentType"), Some("application/hl7-v2+er7"));
    assert!(binary.get_str("data").is_some_and(|d| !d.is_empty()));
    let binary_ref = binary.local_reference();

    let provenance_targets: Vec<&str> = bundle
        .resources_of_type("Provenance")
        .filter_map(|p| p.get_str("target[0].reference"))
        .collect();
    for resource in bundle.entries() {
        if resource.resource_type == "Provenance" || resource.resource_type == "Binary" {
            continue;
        }
        let reference = resource.local_reference();
        assert!(
            provenance_targets.contains(&reference.as_str()),
            "missing provenance for {reference}"
        );
    }
    for provenance in bundle.resources_of_type("Provenance") {
        assert_eq!(
            provenance.get_str("entity[0].what.reference"),
            Some(binary_ref.as_str())
        );
        assert_eq!(
            provenance.get_str("recorded"),
            Some("2024-06-01T12:00:00Z")
        );
    }
}

#[test]
fn conversion_is_deterministic_with_injected_ids_and_clock() {
    let message = Message::parse_er7(ADT_A01).unwrap();
    let first = deterministic_converter().convert(&message).to_json();
    let second = deterministic_converter().convert(&message).to_json();
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn malformed_fields_never_abort_the_conversion() {
    let message = Message::parse_er7(concat!(
        "MSH|^~\\&|App|Fac|||not-a-date||ADT^A01|M1|P|2.6\r",
        "PID|1||ID1||Doe^J||99999999|Q\r",
        "OBX|1|NM|1234-5^^LN||not numeric|kg\r",
        "ZZZ|completely|custom|segment",
    ))
    .unwrap();
    let bundle = deterministic_converter().convert(&message);

    let patient = bundle.first_of_type("Patient").unwrap();
    assert_eq!(patient.get_str("name[0].family"), Some("Doe"));
    assert!(patient.get("birthDate").is_none(), "invalid date dropped");
    assert_eq!(patient.get_str("gender"), Some("unknown"));

    let observation = bundle.first_of_type("Observation").unwrap();
    assert!(observation.get("valueQuantity").is_none());
    assert_eq!(observation.get_str("code.coding[0].code"), Some("1234-5"));
}

#[test]
fn repeated_conversions_with_one_converter_stay_independent() {
    let mut converter = deterministic_converter();
    let message = Message::parse_er7(ADT_A01).unwrap();
    let first = converter.convert(&message);
    let second = converter.convert(&message);
    assert_eq!(
        first.resources_of_type("Patient").count(),
        second.resources_of_type("Patient").count(),
        "state does not leak across conversions"
    );
    assert_ne!(first.id, second.id, "each conversion gets its own bundle");
}
