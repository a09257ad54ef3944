use serde::{Deserialize, Serialize};

/// shields.io endpoint badge payload
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
    pub schema_version: u8,
    pub label: String,
    pub message: String,
    pub color: String,
}

impl Badge {
    pub fn downloads(count: u64) -> Self {
        Self {
            schema_version: 1,
            label: "ghcr pulls".to_string(),
            message: count.to_string(),
            color: "blue".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_badge_schema() {
        let json = serde_json::to_string(&Badge::downloads(2880)).unwrap();
        assert_eq!(
            json,
            r#"{"schemaVersion":1,"label":"ghcr pulls","message":"2880","color":"blue"}"#
        );
    }
}
