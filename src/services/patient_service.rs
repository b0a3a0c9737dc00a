use mongodb::bson::{oid::ObjectId, DateTime as BsonDateTime};

use crate::models::{
    normalize_aadhar, CreatePatientRequest, HostedAsset, Patient, PatientListQuery,
    PatientListResponse, PatientResponse, Role, UpdatePatientRequest,
};
use crate::services::auth_service::Claims;
use crate::services::cloudinary_service::public_id_from_url;
use crate::services::qr_service;
use crate::state::AppState;
use crate::utils::{AppError, AppResult};

const DEFAULT_PAGE_SIZE: u64 = 20;
const MAX_PAGE_SIZE: u64 = 100;

fn image_folder(state: &AppState) -> String {
    format!("{}/patients", state.config.cloudinary.folder)
}

fn qr_folder(state: &AppState) -> String {
    format!("{}/qrcodes", state.config.cloudinary.folder)
}

/// Patients belong to the ASHA worker who registered them.
fn require_asha(claims: &Claims) -> AppResult<ObjectId> {
    if claims.role != Role::AshaWorker {
        return Err(AppError::forbidden("Only ASHA workers can manage patients"));
    }
    claims.user_id()
}

fn parse_aadhar(raw: &str) -> AppResult<String> {
    normalize_aadhar(raw).ok_or_else(|| AppError::bad_request("Aadhar number must be 12 digits"))
}

fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

/// Best-effort removal; a leftover asset never fails the request.
async fn discard(state: &AppState, asset: &HostedAsset) {
    let public_id = if asset.public_id.is_empty() {
        match public_id_from_url(&asset.url) {
            Some(id) => id,
            None => {
                log::warn!("⚠️  Cannot resolve asset id for {}", asset.url);
                return;
            }
        }
    } else {
        asset.public_id.clone()
    };

    if let Err(e) = state.assets.destroy(&public_id).await {
        log::warn!("⚠️  Failed to delete asset {}: {}", public_id, e);
    }
}

async fn upload_qr(state: &AppState, patient: &Patient) -> AppResult<HostedAsset> {
    let data_uri = qr_service::patient_qr_data_uri(patient)?;
    state.assets.upload(&data_uri, &qr_folder(state)).await
}

async fn load_owned(state: &AppState, id: &str, owner: &ObjectId) -> AppResult<Patient> {
    let id = ObjectId::parse_str(id)?;
    state
        .patients
        .find_owned(&id, owner)
        .await?
        .ok_or_else(|| AppError::not_found("Patient not found"))
}

pub async fn create_patient(
    state: &AppState,
    claims: &Claims,
    request: &CreatePatientRequest,
) -> AppResult<PatientResponse> {
    let owner = require_asha(claims)?;

    let name = request.name.trim();
    if name.is_empty() {
        return Err(AppError::bad_request("Patient name is required"));
    }
    let aadhar = parse_aadhar(&request.aadhar_number)?;

    if state.patients.find_by_aadhar(&aadhar).await?.is_some() {
        return Err(AppError::bad_request("A patient with this Aadhar number already exists"));
    }

    let profile_image = match non_empty(request.profile_image.as_ref()) {
        Some(file) => Some(state.assets.upload(file, &image_folder(state)).await?),
        None => None,
    };

    let now = BsonDateTime::now();
    let mut patient = Patient {
        id: None,
        registered_by: owner,
        aadhar_number: aadhar,
        name: name.to_string(),
        age: request.age,
        gender: request.gender.clone(),
        phone: request.phone.clone(),
        address: request.address.clone(),
        village: request.village.clone(),
        district: request.district.clone(),
        blood_group: request.blood_group.clone(),
        health_issues: request.health_issues.clone(),
        medical_history: request.medical_history.clone(),
        is_pregnant: request.is_pregnant,
        emergency_contact: request.emergency_contact.clone(),
        profile_image,
        qr_code: None,
        created_at: now,
        updated_at: now,
    };

    let id = match state.patients.insert(&patient).await {
        Ok(id) => id,
        Err(e) => {
            if let Some(image) = &patient.profile_image {
                discard(state, image).await;
            }
            return Err(e);
        }
    };
    patient.id = Some(id);

    // The card encodes the new _id, so it can only be rendered after insert
    match upload_qr(state, &patient).await {
        Ok(qr) => {
            patient.qr_code = Some(qr);
            if let Err(e) = state.patients.replace(&patient).await {
                log::warn!("⚠️  Could not store QR code for patient {}: {}", id, e);
                if let Some(qr) = patient.qr_code.take() {
                    discard(state, &qr).await;
                }
            }
        }
        Err(e) => log::warn!("⚠️  QR code generation failed for patient {}: {}", id, e),
    }

    log::info!("✅ Patient {} registered by {}", id, claims.email);

    Ok(PatientResponse::from(patient))
}

pub async fn list_patients(
    state: &AppState,
    claims: &Claims,
    query: &PatientListQuery,
) -> AppResult<PatientListResponse> {
    let owner = require_asha(claims)?;

    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let skip = (page - 1)
        .checked_mul(limit)
        .filter(|skip| *skip <= i64::MAX as u64)
        .ok_or_else(|| AppError::bad_request("Page number is out of range"))?;
    let search = query.search.as_deref();

    let patients = state
        .patients
        .list_owned(&owner, search, skip, limit as i64)
        .await?;
    let total = state.patients.count_owned(&owner, search).await?;

    Ok(PatientListResponse {
        patients: patients.into_iter().map(PatientResponse::from).collect(),
        total,
        page,
        limit,
    })
}

pub async fn get_patient(state: &AppState, claims: &Claims, id: &str) -> AppResult<PatientResponse> {
    let owner = require_asha(claims)?;
    let patient = load_owned(state, id, &owner).await?;
    Ok(PatientResponse::from(patient))
}

/// Applies a partial update. A new photo replaces the old one, and the QR
/// card is re-issued when the name or Aadhar number changes.
pub async fn update_patient(
    state: &AppState,
    claims: &Claims,
    id: &str,
    request: &UpdatePatientRequest,
) -> AppResult<PatientResponse> {
    let owner = require_asha(claims)?;
    let mut patient = load_owned(state, id, &owner).await?;
    let mut identity_changed = false;

    if let Some(raw) = &request.aadhar_number {
        let aadhar = parse_aadhar(raw)?;
        if aadhar != patient.aadhar_number {
            if state.patients.find_by_aadhar(&aadhar).await?.is_some() {
                return Err(AppError::bad_request("A patient with this Aadhar number already exists"));
            }
            patient.aadhar_number = aadhar;
            identity_changed = true;
        }
    }

    if let Some(name) = &request.name {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::bad_request("Patient name cannot be empty"));
        }
        if name != patient.name {
            patient.name = name.to_string();
            identity_changed = true;
        }
    }

    if let Some(age) = request.age {
        patient.age = Some(age);
    }
    if let Some(gender) = &request.gender {
        patient.gender = Some(gender.clone());
    }
    if let Some(phone) = &request.phone {
        patient.phone = Some(phone.clone());
    }
    if let Some(address) = &request.address {
        patient.address = Some(address.clone());
    }
    if let Some(village) = &request.village {
        patient.village = Some(village.clone());
    }
    if let Some(district) = &request.district {
        patient.district = Some(district.clone());
    }
    if let Some(blood_group) = &request.blood_group {
        patient.blood_group = Some(blood_group.clone());
    }
    if let Some(issues) = &request.health_issues {
        patient.health_issues = issues.clone();
    }
    if let Some(history) = &request.medical_history {
        patient.medical_history = Some(history.clone());
    }
    if let Some(pregnant) = request.is_pregnant {
        patient.is_pregnant = Some(pregnant);
    }
    if let Some(contact) = &request.emergency_contact {
        patient.emergency_contact = Some(contact.clone());
    }

    let mut fresh: Vec<HostedAsset> = Vec::new();
    let mut stale: Vec<HostedAsset> = Vec::new();

    if let Some(file) = non_empty(request.profile_image.as_ref()) {
        let image = state.assets.upload(file, &image_folder(state)).await?;
        fresh.push(image.clone());
        stale.extend(patient.profile_image.replace(image));
    }

    if identity_changed {
        match upload_qr(state, &patient).await {
            Ok(qr) => {
                fresh.push(qr.clone());
                stale.extend(patient.qr_code.replace(qr));
            }
            Err(e) => log::warn!("⚠️  QR code regeneration failed for patient {}: {}", id, e),
        }
    }

    patient.updated_at = BsonDateTime::now();

    if let Err(e) = state.patients.replace(&patient).await {
        for asset in &fresh {
            discard(state, asset).await;
        }
        return Err(e);
    }
    for asset in &stale {
        discard(state, asset).await;
    }

    log::info!("✏️  Patient {} updated", id);

    Ok(PatientResponse::from(patient))
}

pub async fn delete_patient(state: &AppState, claims: &Claims, id: &str) -> AppResult<()> {
    let owner = require_asha(claims)?;
    let patient = load_owned(state, id, &owner).await?;
    let patient_id = patient
        .id
        .ok_or_else(|| AppError::Internal("stored patient has no _id".into()))?;

    for asset in patient.profile_image.iter().chain(patient.qr_code.iter()) {
        discard(state, asset).await;
    }

    if !state.patients.delete_owned(&patient_id, &owner).await? {
        return Err(AppError::not_found("Patient not found"));
    }

    log::info!("🗑️ Patient {} deleted by {}", patient_id, claims.email);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::auth_service::testing::{asha_worker, verified_user};
    use crate::state::testing::TestContext;

    const PHOTO: &str = "data:image/png;base64,iVBORw0KGgo=";

    fn new_patient(name: &str, aadhar: &str) -> CreatePatientRequest {
        CreatePatientRequest {
            name: name.into(),
            aadhar_number: aadhar.into(),
            age: Some(28),
            gender: Some("female".into()),
            phone: None,
            address: None,
            village: Some("Rampur".into()),
            district: Some("Patna".into()),
            blood_group: Some("B+".into()),
            health_issues: vec!["anaemia".into()],
            medical_history: None,
            is_pregnant: Some(true),
            emergency_contact: None,
            profile_image: Some(PHOTO.into()),
        }
    }

    #[tokio::test]
    async fn create_uploads_photo_and_qr_card() {
        let ctx = TestContext::new();
        let claims = asha_worker(&ctx, "asha@x.in", "BH-1").await;

        let created = create_patient(&ctx.state, &claims, &new_patient("Lakshmi", "1234 5678 9012"))
            .await
            .unwrap();
        assert_eq!(created.aadhar_number, "123456789012");
        assert_eq!(created.registered_by, claims.sub);
        assert!(created.profile_image.unwrap().contains("asha/patients/"));
        assert!(created.qr_code.unwrap().contains("asha/qrcodes/"));
        assert_eq!(ctx.assets.upload_count(), 2);
    }

    #[tokio::test]
    async fn plain_users_cannot_register_patients() {
        let ctx = TestContext::new();
        let claims = verified_user(&ctx, "user@x.in").await;

        let result = create_patient(&ctx.state, &claims, &new_patient("Lakshmi", "123456789012")).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
        assert_eq!(ctx.store.patient_count(), 0);
    }

    #[tokio::test]
    async fn duplicate_aadhar_creates_nothing() {
        let ctx = TestContext::new();
        let first = asha_worker(&ctx, "a@x.in", "BH-1").await;
        let second = asha_worker(&ctx, "b@x.in", "BH-2").await;
        create_patient(&ctx.state, &first, &new_patient("Lakshmi", "123456789012"))
            .await
            .unwrap();
        let uploads = ctx.assets.upload_count();

        let result = create_patient(&ctx.state, &second, &new_patient("Radha", "1234-5678-9012")).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
        assert_eq!(ctx.store.patient_count(), 1);
        assert_eq!(ctx.assets.upload_count(), uploads);
    }

    #[tokio::test]
    async fn invalid_aadhar_is_rejected() {
        let ctx = TestContext::new();
        let claims = asha_worker(&ctx, "a@x.in", "BH-1").await;
        let result = create_patient(&ctx.state, &claims, &new_patient("Lakshmi", "1234")).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn qr_upload_failure_still_creates_patient() {
        let ctx = TestContext::new();
        let claims = asha_worker(&ctx, "a@x.in", "BH-1").await;
        ctx.assets.fail_uploads_to("asha/qrcodes");

        let created = create_patient(&ctx.state, &claims, &new_patient("Lakshmi", "123456789012"))
            .await
            .unwrap();
        assert!(created.qr_code.is_none());
        assert!(created.profile_image.is_some());
        assert_eq!(ctx.store.patient_count(), 1);
    }

    #[tokio::test]
    async fn photo_upload_failure_aborts_creation() {
        let ctx = TestContext::new();
        let claims = asha_worker(&ctx, "a@x.in", "BH-1").await;
        ctx.assets.fail_uploads_to("asha/patients");

        let result = create_patient(&ctx.state, &claims, &new_patient("Lakshmi", "123456789012")).await;
        assert!(matches!(result, Err(AppError::Upstream(_))));
        assert_eq!(ctx.store.patient_count(), 0);
    }

    #[tokio::test]
    async fn workers_only_see_their_own_patients() {
        let ctx = TestContext::new();
        let a = asha_worker(&ctx, "a@x.in", "BH-1").await;
        let b = asha_worker(&ctx, "b@x.in", "BH-2").await;
        let mine = create_patient(&ctx.state, &a, &new_patient("Lakshmi", "111111111111"))
            .await
            .unwrap();
        create_patient(&ctx.state, &b, &new_patient("Radha", "222222222222"))
            .await
            .unwrap();

        let listed = list_patients(&ctx.state, &a, &PatientListQuery::default()).await.unwrap();
        assert_eq!(listed.total, 1);
        assert_eq!(listed.patients[0].id, mine.id);

        let foreign = get_patient(&ctx.state, &b, &mine.id).await;
        assert!(matches!(foreign, Err(AppError::NotFound(_))));

        let foreign_delete = delete_patient(&ctx.state, &b, &mine.id).await;
        assert!(matches!(foreign_delete, Err(AppError::NotFound(_))));
        assert_eq!(ctx.store.patient_count(), 2);
    }

    #[tokio::test]
    async fn list_is_newest_first_and_paginated() {
        let ctx = TestContext::new();
        let claims = asha_worker(&ctx, "a@x.in", "BH-1").await;
        for (i, aadhar) in ["111111111111", "222222222222", "333333333333"].iter().enumerate() {
            create_patient(&ctx.state, &claims, &new_patient(&format!("Patient {}", i), aadhar))
                .await
                .unwrap();
        }

        let query = PatientListQuery { page: Some(1), limit: Some(2), search: None };
        let first = list_patients(&ctx.state, &claims, &query).await.unwrap();
        assert_eq!(first.total, 3);
        assert_eq!(first.patients.len(), 2);
        assert_eq!(first.patients[0].name, "Patient 2");

        let query = PatientListQuery { page: Some(2), limit: Some(2), search: None };
        let second = list_patients(&ctx.state, &claims, &query).await.unwrap();
        assert_eq!(second.patients.len(), 1);
        assert_eq!(second.patients[0].name, "Patient 0");
    }

    #[tokio::test]
    async fn huge_page_number_is_rejected() {
        let ctx = TestContext::new();
        let claims = asha_worker(&ctx, "a@x.in", "BH-1").await;

        let query = PatientListQuery { page: Some(u64::MAX), limit: Some(100), search: None };
        let result = list_patients(&ctx.state, &claims, &query).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));

        let query = PatientListQuery { page: Some(50), limit: Some(100), search: None };
        let empty = list_patients(&ctx.state, &claims, &query).await.unwrap();
        assert!(empty.patients.is_empty());
        assert_eq!(empty.page, 50);
    }

    #[tokio::test]
    async fn list_filters_by_search_term() {
        let ctx = TestContext::new();
        let claims = asha_worker(&ctx, "a@x.in", "BH-1").await;
        create_patient(&ctx.state, &claims, &new_patient("Lakshmi Devi", "111111111111"))
            .await
            .unwrap();
        create_patient(&ctx.state, &claims, &new_patient("Radha", "222222222222"))
            .await
            .unwrap();

        let query = PatientListQuery { page: None, limit: None, search: Some("lakshmi".into()) };
        let found = list_patients(&ctx.state, &claims, &query).await.unwrap();
        assert_eq!(found.total, 1);
        assert_eq!(found.patients[0].name, "Lakshmi Devi");
    }

    #[tokio::test]
    async fn update_reissues_qr_when_name_changes() {
        let ctx = TestContext::new();
        let claims = asha_worker(&ctx, "a@x.in", "BH-1").await;
        let created = create_patient(&ctx.state, &claims, &new_patient("Lakshmi", "111111111111"))
            .await
            .unwrap();
        let old_qr = created.qr_code.clone().unwrap();

        let request = UpdatePatientRequest {
            name: Some("Lakshmi Devi".into()),
            ..Default::default()
        };
        let updated = update_patient(&ctx.state, &claims, &created.id, &request).await.unwrap();

        assert_eq!(updated.name, "Lakshmi Devi");
        assert_ne!(updated.qr_code.unwrap(), old_qr);
        assert_eq!(ctx.assets.destroyed(), vec!["asha/qrcodes/asset2".to_string()]);
    }

    #[tokio::test]
    async fn update_without_identity_change_keeps_qr() {
        let ctx = TestContext::new();
        let claims = asha_worker(&ctx, "a@x.in", "BH-1").await;
        let created = create_patient(&ctx.state, &claims, &new_patient("Lakshmi", "111111111111"))
            .await
            .unwrap();

        let request = UpdatePatientRequest {
            age: Some(29),
            village: Some("Sonpur".into()),
            ..Default::default()
        };
        let updated = update_patient(&ctx.state, &claims, &created.id, &request).await.unwrap();
        assert_eq!(updated.age, Some(29));
        assert_eq!(updated.qr_code, created.qr_code);
        assert!(ctx.assets.destroyed().is_empty());
    }

    #[tokio::test]
    async fn update_replaces_photo_and_removes_old_one() {
        let ctx = TestContext::new();
        let claims = asha_worker(&ctx, "a@x.in", "BH-1").await;
        let created = create_patient(&ctx.state, &claims, &new_patient("Lakshmi", "111111111111"))
            .await
            .unwrap();

        let request = UpdatePatientRequest {
            profile_image: Some(PHOTO.into()),
            ..Default::default()
        };
        let updated = update_patient(&ctx.state, &claims, &created.id, &request).await.unwrap();
        assert_ne!(updated.profile_image, created.profile_image);
        assert_eq!(ctx.assets.destroyed(), vec!["asha/patients/asset1".to_string()]);
    }

    #[tokio::test]
    async fn update_to_taken_aadhar_is_rejected() {
        let ctx = TestContext::new();
        let claims = asha_worker(&ctx, "a@x.in", "BH-1").await;
        create_patient(&ctx.state, &claims, &new_patient("Lakshmi", "111111111111"))
            .await
            .unwrap();
        let other = create_patient(&ctx.state, &claims, &new_patient("Radha", "222222222222"))
            .await
            .unwrap();

        let request = UpdatePatientRequest {
            aadhar_number: Some("1111 1111 1111".into()),
            ..Default::default()
        };
        let result = update_patient(&ctx.state, &claims, &other.id, &request).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));

        let unchanged = get_patient(&ctx.state, &claims, &other.id).await.unwrap();
        assert_eq!(unchanged.aadhar_number, "222222222222");
    }

    #[tokio::test]
    async fn delete_removes_record_and_hosted_assets() {
        let ctx = TestContext::new();
        let claims = asha_worker(&ctx, "a@x.in", "BH-1").await;
        let created = create_patient(&ctx.state, &claims, &new_patient("Lakshmi", "111111111111"))
            .await
            .unwrap();

        delete_patient(&ctx.state, &claims, &created.id).await.unwrap();

        assert_eq!(ctx.store.patient_count(), 0);
        let destroyed = ctx.assets.destroyed();
        assert!(destroyed.contains(&"asha/patients/asset1".to_string()));
        assert!(destroyed.contains(&"asha/qrcodes/asset2".to_string()));

        let again = get_patient(&ctx.state, &claims, &created.id).await;
        assert!(matches!(again, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn legacy_assets_are_deleted_by_url() {
        let ctx = TestContext::new();
        let claims = asha_worker(&ctx, "a@x.in", "BH-1").await;
        let created = create_patient(&ctx.state, &claims, &new_patient("Lakshmi", "111111111111"))
            .await
            .unwrap();

        let owner = claims.user_id().unwrap();
        let id = ObjectId::parse_str(&created.id).unwrap();
        let mut stored = ctx.state.patients.find_owned(&id, &owner).await.unwrap().unwrap();
        stored.profile_image = Some(HostedAsset {
            url: "https://res.cloudinary.com/demo/image/upload/v17/asha/patients/legacy.jpg".into(),
            public_id: String::new(),
        });
        ctx.state.patients.replace(&stored).await.unwrap();

        delete_patient(&ctx.state, &claims, &created.id).await.unwrap();
        assert!(ctx.assets.destroyed().contains(&"asha/patients/legacy".to_string()));
    }

    #[tokio::test]
    async fn malformed_id_is_bad_request() {
        let ctx = TestContext::new();
        let claims = asha_worker(&ctx, "a@x.in", "BH-1").await;
        let result = get_patient(&ctx.state, &claims, "not-an-id").await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }
}
