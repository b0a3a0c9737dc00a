use base64::Engine;
use qrcode::render::svg;
use qrcode::QrCode;
use serde::Serialize;

use crate::models::{mask_aadhar, Patient};
use crate::utils::{AppError, AppResult};

/// What a scanned patient card reveals. The Aadhar number is masked.
#[derive(Debug, Serialize)]
pub struct QrPayload {
    pub patient_id: String,
    pub name: String,
    pub aadhar: String,
    pub registered_by: String,
    pub issued_at: i64,
}

impl QrPayload {
    pub fn for_patient(patient: &Patient) -> Self {
        QrPayload {
            patient_id: patient.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: patient.name.clone(),
            aadhar: mask_aadhar(&patient.aadhar_number),
            registered_by: patient.registered_by.to_hex(),
            issued_at: chrono::Utc::now().timestamp(),
        }
    }
}

pub fn render_svg(payload: &QrPayload) -> AppResult<String> {
    let json = serde_json::to_string(payload)
        .map_err(|e| AppError::Internal(format!("Failed to encode QR payload: {}", e)))?;

    let code = QrCode::new(json.as_bytes())
        .map_err(|e| AppError::Internal(format!("Failed to build QR code: {}", e)))?;

    Ok(code
        .render::<svg::Color>()
        .min_dimensions(256, 256)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#ffffff"))
        .build())
}

/// Renders the card in memory as an SVG data URI ready for upload.
pub fn patient_qr_data_uri(patient: &Patient) -> AppResult<String> {
    let svg = render_svg(&QrPayload::for_patient(patient))?;
    let encoded = base64::engine::general_purpose::STANDARD.encode(svg.as_bytes());
    Ok(format!("data:image/svg+xml;base64,{}", encoded))
}
