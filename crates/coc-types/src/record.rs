use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Custody status of an evidence item at the time of a record.
///
/// Known statuses map to named variants; anything else is carried verbatim
/// so records written by other clients still decode.
///
/// Equality and hashing go through the wire label, so
/// `Custom("stored".into())` equals `Stored`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CustodyStatus {
    Stored,
    Transferred,
    Uploaded,
    Disposed,
    Custom(String),
}

impl CustodyStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Stored => "stored",
            Self::Transferred => "transferred",
            Self::Uploaded => "uploaded",
            Self::Disposed => "disposed",
            Self::Custom(s) => s,
        }
    }

    fn is_blank(&self) -> bool {
        self.as_str().trim().is_empty()
    }
}

impl PartialEq for CustodyStatus {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for CustodyStatus {}

impl Hash for CustodyStatus {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl From<String> for CustodyStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "stored" => Self::Stored,
            "transferred" => Self::Transferred,
            "uploaded" => Self::Uploaded,
            "disposed" => Self::Disposed,
            _ => Self::Custom(value),
        }
    }
}

impl From<&str> for CustodyStatus {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<CustodyStatus> for String {
    fn from(value: CustodyStatus) -> Self {
        match value {
            CustodyStatus::Custom(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for CustodyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of storage medium the evidence image was taken from.
///
/// Compares by label like [`CustodyStatus`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DeviceType {
    Pc,
    HddSsd,
    Usb,
    ExternalHdd,
    Mobile,
    Other,
    Custom(String),
}

impl DeviceType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pc => "PC",
            Self::HddSsd => "HDD/SSD",
            Self::Usb => "USB",
            Self::ExternalHdd => "ExternalHDD",
            Self::Mobile => "Mobile",
            Self::Other => "Other",
            Self::Custom(s) => s,
        }
    }

    fn is_blank(&self) -> bool {
        self.as_str().trim().is_empty()
    }
}

impl PartialEq for DeviceType {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for DeviceType {}

impl Hash for DeviceType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_str().hash(state);
    }
}

impl From<String> for DeviceType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "PC" => Self::Pc,
            "HDD/SSD" => Self::HddSsd,
            "USB" => Self::Usb,
            "ExternalHDD" => Self::ExternalHdd,
            "Mobile" => Self::Mobile,
            "Other" => Self::Other,
            _ => Self::Custom(value),
        }
    }
}

impl From<&str> for DeviceType {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<DeviceType> for String {
    fn from(value: DeviceType) -> Self {
        match value {
            DeviceType::Custom(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One custody event as it travels in a transaction payload and as it is
/// stored in ledger state.
///
/// Every field is nullable: decoding a payload or a stored entry never fails
/// because a field is missing, it yields `None` instead. Use
/// [`CustodyRecord::validate`] to enforce presence at the boundary.
///
/// `owner` is assigned by the ledger handler from the verified signer key.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustodyRecord {
    #[serde(default)]
    pub registration_time: Option<String>,
    #[serde(default)]
    pub status: Option<CustodyStatus>,
    #[serde(default)]
    pub case_num: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub checker_name: Option<String>,
    #[serde(default)]
    pub device_type: Option<DeviceType>,
    #[serde(default)]
    pub image_type: Option<String>,
    #[serde(default)]
    pub image_file_name: Option<String>,
    #[serde(default)]
    pub image_hash: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub owner: Option<String>,
}

fn blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |s| s.trim().is_empty())
}

impl CustodyRecord {
    /// Names of required fields that are absent or blank.
    ///
    /// `imageType` is only required when `require_image_type` is set, which
    /// the handler does for every record after the first at an address.
    pub fn missing_fields(&self, require_image_type: bool) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if blank(&self.registration_time) {
            missing.push("registrationTime");
        }
        if self.status.as_ref().map_or(true, CustodyStatus::is_blank) {
            missing.push("status");
        }
        if blank(&self.case_num) {
            missing.push("caseNum");
        }
        if blank(&self.location) {
            missing.push("location");
        }
        if blank(&self.checker_name) {
            missing.push("checkerName");
        }
        if self.device_type.as_ref().map_or(true, DeviceType::is_blank) {
            missing.push("deviceType");
        }
        if require_image_type && blank(&self.image_type) {
            missing.push("imageType");
        }
        if blank(&self.image_file_name) {
            missing.push("imageFileName");
        }
        if blank(&self.image_hash) {
            missing.push("imageHash");
        }
        if blank(&self.user_id) {
            missing.push("userId");
        }
        missing
    }

    /// Fail with [`TypeError::MissingFields`] if any required field is absent.
    pub fn validate(&self, require_image_type: bool) -> Result<(), TypeError> {
        let missing = self.missing_fields(require_image_type);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(TypeError::MissingFields(missing))
        }
    }

    /// Replace the owner with the given signer key.
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = Some(owner.into());
        self
    }

    /// Parsed registration time, if present and well formed.
    pub fn registration_instant(&self) -> Option<NaiveDateTime> {
        self.registration_time
            .as_deref()
            .and_then(parse_registration_time)
    }
}

/// Parse an ISO local timestamp (`YYYY-MM-DDTHH:mm`, seconds optional).
/// RFC 3339 values with an offset are accepted and read as their local time.
pub fn parse_registration_time(s: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S%.f"];
    let s = s.trim();
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_local()))
}

/// A custody event as entered by a caller, before it is bound to a user and
/// signed. Required fields are plain values; only `image_type` is optional.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CustodyEvent {
    pub registration_time: String,
    pub status: CustodyStatus,
    pub case_num: String,
    pub location: String,
    pub checker_name: String,
    pub device_type: DeviceType,
    pub image_type: Option<String>,
    pub image_file_name: String,
    pub image_hash: String,
}

impl CustodyEvent {
    /// Build the transaction payload for `user_id`. The owner stays empty;
    /// the handler fills it in.
    pub fn into_payload(self, user_id: impl Into<String>) -> CustodyRecord {
        CustodyRecord {
            registration_time: Some(self.registration_time),
            status: Some(self.status),
            case_num: Some(self.case_num),
            location: Some(self.location),
            checker_name: Some(self.checker_name),
            device_type: Some(self.device_type),
            image_type: self.image_type,
            image_file_name: Some(self.image_file_name),
            image_hash: Some(self.image_hash),
            user_id: Some(user_id.into()),
            owner: None,
        }
    }

    /// Pre-fill a follow-up event from the latest stored entry, keeping the
    /// evidence identity and taking a new status and timestamp.
    pub fn follow_up(
        latest: &CustodyRecord,
        status: CustodyStatus,
        registration_time: impl Into<String>,
    ) -> Self {
        Self {
            registration_time: registration_time.into(),
            status,
            case_num: latest.case_num.clone().unwrap_or_default(),
            location: latest.location.clone().unwrap_or_default(),
            checker_name: latest.checker_name.clone().unwrap_or_default(),
            device_type: latest
                .device_type
                .clone()
                .unwrap_or_else(|| DeviceType::Custom(String::new())),
            image_type: latest.image_type.clone(),
            image_file_name: latest.image_file_name.clone().unwrap_or_default(),
            image_hash: latest.image_hash.clone().unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> CustodyEvent {
        CustodyEvent {
            registration_time: "2024-03-01T09:30".into(),
            status: CustodyStatus::Stored,
            case_num: "2024-001".into(),
            location: "Evidence Room B".into(),
            checker_name: "Kim".into(),
            device_type: DeviceType::Usb,
            image_type: None,
            image_file_name: "usb01.E01".into(),
            image_hash: "abc123".into(),
        }
    }

    #[test]
    fn status_known_values_map_to_variants() {
        assert_eq!(CustodyStatus::from("stored"), CustodyStatus::Stored);
        assert_eq!(CustodyStatus::from("disposed"), CustodyStatus::Disposed);
        assert_eq!(
            CustodyStatus::from("sealed"),
            CustodyStatus::Custom("sealed".into())
        );
    }

    #[test]
    fn status_serializes_as_plain_string() {
        let json = serde_json::to_string(&CustodyStatus::Transferred).unwrap();
        assert_eq!(json, "\"transferred\"");
        let custom: CustodyStatus = serde_json::from_str("\"보관\"").unwrap();
        assert_eq!(custom.as_str(), "보관");
    }

    #[test]
    fn custom_spelling_of_known_label_is_equal() {
        use std::collections::HashSet;

        let custom = CustodyStatus::Custom("stored".into());
        assert_eq!(custom, CustodyStatus::Stored);
        let back: CustodyStatus =
            serde_json::from_str(&serde_json::to_string(&custom).unwrap()).unwrap();
        assert_eq!(back, custom);
        assert_ne!(CustodyStatus::Custom("Stored".into()), CustodyStatus::Stored);

        let devices: HashSet<DeviceType> =
            [DeviceType::Usb, DeviceType::Custom("USB".into())].into_iter().collect();
        assert_eq!(devices.len(), 1);
    }

    #[test]
    fn device_type_labels() {
        assert_eq!(DeviceType::HddSsd.as_str(), "HDD/SSD");
        assert_eq!(DeviceType::from("ExternalHDD"), DeviceType::ExternalHdd);
        assert_eq!(format!("{}", DeviceType::Pc), "PC");
    }

    #[test]
    fn payload_uses_camel_case_and_explicit_nulls() {
        let record = event().into_payload("officer-7");
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["caseNum"], "2024-001");
        assert_eq!(value["imageHash"], "abc123");
        assert_eq!(value["userId"], "officer-7");
        assert!(value["imageType"].is_null());
        assert!(value["owner"].is_null());
    }

    #[test]
    fn decoding_tolerates_missing_fields() {
        let record: CustodyRecord =
            serde_json::from_str(r#"{"caseNum":"2024-001","unknownField":1}"#).unwrap();
        assert_eq!(record.case_num.as_deref(), Some("2024-001"));
        assert!(record.location.is_none());
        assert!(record.owner.is_none());
    }

    #[test]
    fn complete_payload_validates_without_image_type() {
        let record = event().into_payload("officer-7");
        assert!(record.validate(false).is_ok());
        assert_eq!(
            record.validate(true).unwrap_err(),
            TypeError::MissingFields(vec!["imageType"])
        );
    }

    #[test]
    fn blank_fields_count_as_missing() {
        let mut record = event().into_payload("  ");
        record.location = Some(String::new());
        record.status = Some(CustodyStatus::Custom(" ".into()));
        let missing = record.missing_fields(false);
        assert_eq!(missing, vec!["status", "location", "userId"]);
    }

    #[test]
    fn empty_record_reports_every_field() {
        let missing = CustodyRecord::default().missing_fields(true);
        assert_eq!(missing.len(), 10);
        assert!(!missing.contains(&"owner"));
    }

    #[test]
    fn with_owner_overwrites() {
        let mut record = event().into_payload("u");
        record.owner = Some("forged".into());
        let record = record.with_owner("signer-key");
        assert_eq!(record.owner.as_deref(), Some("signer-key"));
    }

    #[test]
    fn registration_time_formats() {
        assert!(parse_registration_time("2024-03-01T09:30").is_some());
        assert!(parse_registration_time("2024-03-01T09:30:15").is_some());
        assert!(parse_registration_time("2024-03-01T09:30:15+09:00").is_some());
        assert!(parse_registration_time("yesterday").is_none());

        let a = parse_registration_time("2024-03-01T09:30").unwrap();
        let b = parse_registration_time("2024-03-01T09:31").unwrap();
        assert!(a < b);
    }

    #[test]
    fn follow_up_keeps_evidence_identity() {
        let latest = event().into_payload("u").with_owner("k");
        let next = CustodyEvent::follow_up(&latest, CustodyStatus::Transferred, "2024-03-02T10:00");
        assert_eq!(next.case_num, "2024-001");
        assert_eq!(next.image_hash, "abc123");
        assert_eq!(next.status, CustodyStatus::Transferred);
        assert_eq!(next.registration_time, "2024-03-02T10:00");
    }
}
