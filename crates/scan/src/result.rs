use serde::{Serialize, Serializer};
use std::path::PathBuf;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use uuid::Uuid;

/// Describes the file a successful scan produced.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResult {
    pub scan_id: Uuid,
    pub filename: String,
    pub path: PathBuf,
    #[serde(serialize_with = "rfc3339")]
    pub timestamp: OffsetDateTime,
}

fn rfc3339<S: Serializer>(timestamp: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error> {
    let formatted = timestamp.format(&Rfc3339).map_err(serde::ser::Error::custom)?;
    serializer.serialize_str(&formatted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_serialize() {
        let result = ScanResult {
            scan_id: Uuid::nil(),
            filename: "00000000-0000-0000-0000-000000000000.pdf".to_string(),
            path: PathBuf::from("scans/00000000-0000-0000-0000-000000000000.pdf"),
            timestamp: datetime!(2024-03-01 09:30:00 UTC),
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["scanId"], "00000000-0000-0000-0000-000000000000");
        assert_eq!(value["timestamp"], "2024-03-01T09:30:00Z");
        assert_eq!(value["path"], "scans/00000000-0000-0000-0000-000000000000.pdf");
    }
}
