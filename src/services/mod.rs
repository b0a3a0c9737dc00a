pub mod ai_service;
pub mod auth_service;
pub mod chat_service;
pub mod cloudinary_service;
pub mod email_service;
pub mod google_service;
pub mod patient_service;
pub mod qr_service;
