use schemars::schema_for;

use crate::json::types;

pub fn generate_json_schema() -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&schema_for!(types::JsonDataset))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_names_dataset_sections() {
        let schema = generate_json_schema().unwrap();

        assert!(schema.contains("\"Dataset\""));
        for section in ["shifts", "employees", "shuttles", "templates"] {
            assert!(schema.contains(section), "missing {section}");
        }
    }
}
