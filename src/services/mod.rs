/// Read-only record store administration.
pub mod admin_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Constrained random draw over the outcome set.
pub mod draw_engine;
/// Health check service.
pub mod health_service;
/// Session lifecycle and draw flow orchestration.
pub mod session_service;
/// Record store connection supervisor with health polling.
pub mod storage_supervisor;
