use serde::{Deserialize, Serialize};

/// Body of `POST /calls`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DapnetCall {
    pub text: String,
    pub call_sign_names: Vec<String>,
    pub transmitter_group_names: Vec<String>,
    pub emergency: bool,
}

impl DapnetCall {
    pub fn new(
        text: impl Into<String>,
        call_sign_names: Vec<String>,
        transmitter_group_names: Vec<String>,
        emergency: bool,
    ) -> Self {
        Self {
            text: text.into(),
            call_sign_names,
            transmitter_group_names,
            emergency,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_field_names() {
        let call = DapnetCall::new(
            "ISS visible 21:07 - Azimuth 232 Elevation 5",
            vec!["f4abc".to_string()],
            vec!["f-53".to_string()],
            false,
        );

        let json = serde_json::to_value(&call).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "text": "ISS visible 21:07 - Azimuth 232 Elevation 5",
                "callSignNames": ["f4abc"],
                "transmitterGroupNames": ["f-53"],
                "emergency": false
            })
        );
    }
}
