pub mod bundle;
pub mod error;
pub mod extensions;
pub mod ids;
pub mod message;
pub mod resource;

pub use bundle::Bundle;
pub use error::{ModelError, Result};
pub use extensions::{deleted_value, is_deleted_value, DELETED_FIELD_EXTENSION_URL};
pub use ids::{IdGenerator, SequentialIdGenerator, UuidGenerator};
pub use message::{Message, MessageElement, Segment, SourceValue, Unit, UnitId, UnitKind};
pub use resource::Resource;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_round_trips_through_bundle() {
        let mut bundle = Bundle::new("bundle-1");
        let mut patient = Resource::new("Patient", "p1");
        patient.set("gender", serde_json::json!("female"));
        bundle.push(patient);

        let found = bundle.first_of_type("Patient").expect("patient present");
        assert_eq!(found.id, "p1");
        assert_eq!(found.get("gender"), Some(&serde_json::json!("female")));
    }
}
