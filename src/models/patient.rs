use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};

/// File hosted by the asset store (profile photos, QR codes).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct HostedAsset {
    pub url: String,
    // Older records stored only the URL
    #[serde(default)]
    pub public_id: String,
}

/// Patient document (`patients` collection), owned by the registering user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub registered_by: ObjectId,
    pub aadhar_number: String,
    pub name: String,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub village: Option<String>,
    pub district: Option<String>,
    pub blood_group: Option<String>,
    #[serde(default)]
    pub health_issues: Vec<String>,
    pub medical_history: Option<String>,
    pub is_pregnant: Option<bool>,
    pub emergency_contact: Option<String>,
    pub profile_image: Option<HostedAsset>,
    pub qr_code: Option<HostedAsset>,
    pub created_at: BsonDateTime,
    pub updated_at: BsonDateTime,
}

/// Strips spaces and hyphens; `None` unless exactly 12 digits remain.
pub fn normalize_aadhar(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| !c.is_whitespace() && *c != '-').collect();
    if digits.len() == 12 && digits.chars().all(|c| c.is_ascii_digit()) {
        Some(digits)
    } else {
        None
    }
}

pub fn mask_aadhar(aadhar: &str) -> String {
    let visible = aadhar.len().saturating_sub(4);
    format!("XXXX-XXXX-{}", &aadhar[visible..])
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct CreatePatientRequest {
    pub name: String,
    pub aadhar_number: String,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub village: Option<String>,
    pub district: Option<String>,
    pub blood_group: Option<String>,
    #[serde(default)]
    pub health_issues: Vec<String>,
    pub medical_history: Option<String>,
    pub is_pregnant: Option<bool>,
    pub emergency_contact: Option<String>,
    /// Data URI (`data:image/...;base64,...`) or a remote URL.
    pub profile_image: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::ToSchema)]
pub struct UpdatePatientRequest {
    pub name: Option<String>,
    pub aadhar_number: Option<String>,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub village: Option<String>,
    pub district: Option<String>,
    pub blood_group: Option<String>,
    pub health_issues: Option<Vec<String>>,
    pub medical_history: Option<String>,
    pub is_pregnant: Option<bool>,
    pub emergency_contact: Option<String>,
    pub profile_image: Option<String>,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct PatientResponse {
    pub id: String,
    pub registered_by: String,
    pub aadhar_number: String,
    pub name: String,
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub village: Option<String>,
    pub district: Option<String>,
    pub blood_group: Option<String>,
    pub health_issues: Vec<String>,
    pub medical_history: Option<String>,
    pub is_pregnant: Option<bool>,
    pub emergency_contact: Option<String>,
    pub profile_image: Option<String>,
    pub qr_code: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<Patient> for PatientResponse {
    fn from(p: Patient) -> Self {
        PatientResponse {
            id: p.id.map(|id| id.to_hex()).unwrap_or_default(),
            registered_by: p.registered_by.to_hex(),
            aadhar_number: p.aadhar_number,
            name: p.name,
            age: p.age,
            gender: p.gender,
            phone: p.phone,
            address: p.address,
            village: p.village,
            district: p.district,
            blood_group: p.blood_group,
            health_issues: p.health_issues,
            medical_history: p.medical_history,
            is_pregnant: p.is_pregnant,
            emergency_contact: p.emergency_contact,
            profile_image: p.profile_image.map(|a| a.url),
            qr_code: p.qr_code.map(|a| a.url),
            created_at: p.created_at.timestamp_millis(),
            updated_at: p.updated_at.timestamp_millis(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PatientListQuery {
    /// 1-based page number
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Case-insensitive match on name or village, substring match on Aadhar
    pub search: Option<String>,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct PatientListResponse {
    pub patients: Vec<PatientResponse>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aadhar_accepts_grouped_digits() {
        assert_eq!(normalize_aadhar("1234 5678 9012").as_deref(), Some("123456789012"));
        assert_eq!(normalize_aadhar("1234-5678-9012").as_deref(), Some("123456789012"));
    }

    #[test]
    fn aadhar_rejects_wrong_length_or_letters() {
        assert!(normalize_aadhar("12345678901").is_none());
        assert!(normalize_aadhar("1234567890123").is_none());
        assert!(normalize_aadhar("12345678901a").is_none());
        assert!(normalize_aadhar("").is_none());
    }

    #[test]
    fn mask_keeps_last_four_digits() {
        assert_eq!(mask_aadhar("123456789012"), "XXXX-XXXX-9012");
    }
}
