use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, utoipa::ToSchema)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }
}

/// ASHA worker profile (`ashaworkers` collection), one per user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AshaWorker {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user_id: ObjectId,
    pub asha_id: String,
    pub location: GeoPoint,
    pub address: Option<String>,
    pub district: Option<String>,
    pub state: Option<String>,
    #[serde(default)]
    pub qualifications: Vec<String>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub experience_years: u32,
    pub phone: Option<String>,
    pub created_at: BsonDateTime,
}

#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct CompleteAshaRequest {
    pub asha_id: String,
    pub location: GeoPoint,
    pub address: Option<String>,
    pub district: Option<String>,
    pub state: Option<String>,
    #[serde(default)]
    pub qualifications: Vec<String>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub experience_years: u32,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct AshaWorkerInfo {
    pub id: String,
    pub asha_id: String,
    pub location: GeoPoint,
    pub address: Option<String>,
    pub district: Option<String>,
    pub state: Option<String>,
    pub qualifications: Vec<String>,
    pub languages: Vec<String>,
    pub experience_years: u32,
    pub phone: Option<String>,
}

impl From<AshaWorker> for AshaWorkerInfo {
    fn from(w: AshaWorker) -> Self {
        AshaWorkerInfo {
            id: w.id.map(|id| id.to_hex()).unwrap_or_default(),
            asha_id: w.asha_id,
            location: w.location,
            address: w.address,
            district: w.district,
            state: w.state,
            qualifications: w.qualifications,
            languages: w.languages,
            experience_years: w.experience_years,
            phone: w.phone,
        }
    }
}
