//! Family registry documents and the two seed families

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Family {
    pub id: String,
    pub last_name: String,
    pub parents: Vec<Parent>,
    pub children: Vec<Child>,
    pub address: Address,
    pub is_registered: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parent {
    pub first_name: String,
    /// Set only when it differs from the family's last name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    pub gender: Gender,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Child {
    pub first_name: String,
    pub gender: Gender,
    pub grade: i64,
    #[serde(default)]
    pub pets: Vec<Pet>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pet {
    pub given_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub county: String,
    pub city: String,
}

impl Parent {
    fn new(first_name: &str, gender: Gender) -> Self {
        Self {
            first_name: first_name.to_string(),
            family_name: None,
            gender,
        }
    }
}

impl Child {
    fn new(first_name: &str, gender: Gender, grade: i64, pets: &[&str]) -> Self {
        Self {
            first_name: first_name.to_string(),
            gender,
            grade,
            pets: pets
                .iter()
                .map(|name| Pet {
                    given_name: name.to_string(),
                })
                .collect(),
        }
    }
}

impl Address {
    fn new(county: &str, city: &str) -> Self {
        Self {
            county: county.to_string(),
            city: city.to_string(),
        }
    }
}

pub const PETKOVI_ID: &str = "FamilyPetkovi";
pub const IVANOVI_ID: &str = "FamilyIvanovi";

pub fn petkovi() -> Family {
    Family {
        id: PETKOVI_ID.to_string(),
        last_name: "Petkov".to_string(),
        parents: vec![
            Parent::new("Stamo", Gender::Male),
            Parent::new("Inga", Gender::Female),
        ],
        children: vec![
            Child::new("George", Gender::Male, 6, &[]),
            Child::new("Antonia", Gender::Female, 3, &["Rio"]),
        ],
        address: Address::new("Bulgaria", "Sofia"),
        is_registered: true,
    }
}

pub fn ivanovi() -> Family {
    Family {
        id: IVANOVI_ID.to_string(),
        last_name: "Ivanov".to_string(),
        parents: vec![
            Parent::new("Krum", Gender::Male),
            Parent {
                family_name: Some("Mineva".to_string()),
                ..Parent::new("Milena", Gender::Female)
            },
        ],
        children: vec![
            Child::new("Alexandra", Gender::Female, 9, &["Kenai"]),
            Child::new("George", Gender::Male, 5, &[]),
        ],
        // sic
        address: Address::new("Englnd", "Coventry"),
        is_registered: true,
    }
}

/// Both seed families, in insertion order
pub fn seed() -> [Family; 2] {
    [petkovi(), ivanovi()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_format() {
        let value = serde_json::to_value(ivanovi()).unwrap();
        assert_eq!(value["lastName"], "Ivanov");
        assert_eq!(value["isRegistered"], true);
        assert_eq!(value["parents"][0], json!({ "firstName": "Krum", "gender": "male" }));
        assert_eq!(value["parents"][1]["familyName"], "Mineva");
        assert_eq!(value["children"][0]["pets"], json!([{ "givenName": "Kenai" }]));
        assert_eq!(value["children"][1]["pets"], json!([]));
        assert_eq!(value["address"], json!({ "county": "Englnd", "city": "Coventry" }));
    }

    #[test]
    fn test_missing_pets_default_to_empty() {
        let child: Child = serde_json::from_value(json!({
            "firstName": "George",
            "gender": "male",
            "grade": 6
        }))
        .unwrap();
        assert!(child.pets.is_empty());
    }

    #[test]
    fn test_read_back_ignores_system_properties() {
        let mut value = serde_json::to_value(petkovi()).unwrap();
        value["_rid"] = json!("abc");
        value["_ts"] = json!(1760779800);
        let family: Family = serde_json::from_value(value).unwrap();
        assert_eq!(family, petkovi());
    }

    #[test]
    fn test_seed_ids_are_unique() {
        let [a, b] = seed();
        assert_ne!(a.id, b.id);
    }
}
